//! PlanForge - resource allocation optimization and project forecasting.
//!
//! A genetic search assigns tasks to resources under skill, availability
//! and dependency constraints, priced by learned duration and suitability
//! models. Historical cost, progress and incident series feed LSTM
//! forecasters and a risk classifier, each falling back to a baseline
//! when no model has been trained yet.
//!
//! # Example
//!
//! ```
//! use planforge::prelude::*;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let engine = PlanForge::in_memory(EngineConfig::default()).unwrap();
//!
//! let request = OptimizationRequest::new(
//!     "site-rollout",
//!     vec![Task::new("survey", 8.0).with_skills(["field"])],
//!     vec![Resource::new("ana", "technician").with_skills(["field"])],
//!     30,
//! )
//! .with_goal(OptimizationGoal::MinimizeCost)
//! .with_seed(1);
//!
//! let result = runtime.block_on(engine.request_optimization(request)).unwrap();
//! assert_eq!(result.best.allocations[0].resource_id, "ana");
//! assert!(engine.get_recommendations(&result.id).is_ok());
//! ```
//!
//! Enable the `console` feature for colored progress output.

pub mod engine;
pub mod forecast;
pub mod history;
pub mod orchestrator;
pub mod registry;

pub use engine::{PlanForge, PlanForgeBuilder};
pub use forecast::{risk_from_variance, ForecastService};
pub use history::{HistoryProvider, InMemoryHistoryProvider};
pub use orchestrator::Orchestrator;
pub use registry::ResultRegistry;

pub use planforge_config::{ConfigError, EngineConfig, GeneticConfig, TrainingConfig};
pub use planforge_core::{
    Allocation, AllocationPlan, AvailabilityWindow, BottleneckKind, BottleneckWarning,
    ConfidenceLevel, Constraints, Forecast, ForecastConfig, ForecastResponse, ForecastType,
    GoalWeights, HistoricalSeries, ModelSource, OptimizationGoal, OptimizationRequest,
    OptimizationResult, PlanForgeError, Preferences, Priority, Recommendation,
    RecommendationKind, Resource, ResourceUtilization, Result, ResultId, RiskFlag, RiskLevel,
    Task, TerminationReason,
};
pub use planforge_ga::CancellationToken;
pub use planforge_ml::{Dataset, LoadedModel, ModelArtifact, ModelType};
pub use planforge_store::{FileModelStore, InMemoryModelStore, ModelMetadata, ModelStore};

pub mod prelude {
    pub use super::{
        EngineConfig, ForecastConfig, ForecastType, HistoricalSeries, InMemoryHistoryProvider,
        OptimizationGoal, OptimizationRequest, PlanForge, PlanForgeError, Resource, RiskLevel,
        Task,
    };
}
