//! PlanForge Core - Domain types shared by every PlanForge crate
//!
//! This crate provides:
//! - Project snapshots (resources, tasks) consumed by the engine
//! - Optimization request/result types
//! - Forecast request/response types and historical series
//! - The error taxonomy

pub mod domain;
pub mod error;
pub mod forecast;
pub mod history;
pub mod request;
pub mod result;

pub use domain::{dependency_order, AvailabilityWindow, Priority, Resource, Task};
pub use error::{PlanForgeError, Result};
pub use forecast::{
    ConfidenceLevel, Forecast, ForecastConfig, ForecastResponse, ForecastType, ModelSource,
    RiskLevel,
};
pub use history::HistoricalSeries;
pub use request::{
    Constraints, GoalWeights, OptimizationGoal, OptimizationRequest, Preferences, WorkingHours,
};
pub use result::{
    Allocation, AllocationPlan, BottleneckKind, BottleneckWarning, OptimizationResult,
    Recommendation, RecommendationKind, ResourceUtilization, ResultId, RiskFlag,
    TerminationReason,
};
