//! Optimization output types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::forecast::RiskLevel;
use crate::request::OptimizationGoal;

/// Identifier of a stored optimization result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultId(pub String);

impl ResultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Improvement stayed below epsilon for the configured window.
    Converged,
    /// Generation limit reached.
    MaxGenerations,
    /// Caller deadline exceeded; best-so-far returned.
    Deadline,
    /// Caller cancelled; best-so-far returned.
    Cancelled,
}

impl TerminationReason {
    /// Returns true when the run stopped before the search policy finished.
    pub fn is_partial(self) -> bool {
        matches!(self, TerminationReason::Deadline | TerminationReason::Cancelled)
    }
}

/// One task assigned to one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub task_id: String,
    pub resource_id: String,
    pub start_day: u32,
    /// Exclusive end day.
    pub end_day: u32,
    /// Planned hours from the task estimate.
    pub planned_hours: f64,
    pub cost: f64,
    /// Hours predicted by the duration model (or heuristic fallback).
    pub predicted_hours: f64,
    /// One standard deviation of the prediction, in hours.
    pub prediction_std: f64,
    /// Allocation suitability in [0, 1].
    pub suitability: f64,
}

impl Allocation {
    pub fn predicted_cost(&self, cost_rate: f64) -> f64 {
        self.predicted_hours * cost_rate
    }
}

/// A complete candidate plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    pub fitness: f64,
    pub total_cost: f64,
    /// Exclusive day on which the last task finishes.
    pub completion_day: u32,
    pub violations: u32,
}

impl AllocationPlan {
    pub fn allocation_for(&self, task_id: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.task_id == task_id)
    }

    pub fn predicted_cost(&self) -> f64 {
        self.allocations
            .iter()
            .map(|a| {
                if a.planned_hours > 0.0 {
                    a.cost * a.predicted_hours / a.planned_hours
                } else {
                    a.cost
                }
            })
            .sum()
    }
}

/// Load placed on a resource by a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub resource_id: String,
    pub assigned_hours: f64,
    pub available_hours: f64,
    /// `assigned_hours / available_hours`, may exceed 1.
    pub utilization: f64,
}

/// Risk attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    BudgetOverrun,
    DeadlineMiss,
    HighUncertainty,
    OverAllocation,
    SkillGap,
    LowSuitability,
}

/// Category of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Adopt the best plan found.
    AdoptPlan,
    /// Consider a structurally different plan.
    Alternative,
    /// Move a task to a better-suited resource.
    Reassign,
    /// Add capacity for an overloaded resource or scarce skill.
    AddCapacity,
}

/// An actionable suggestion with predicted impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub task_ids: Vec<String>,
    pub resource_ids: Vec<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Predicted change in cost versus the best plan (negative is cheaper).
    pub cost_delta: f64,
    /// Predicted change in completion (days).
    pub time_delta_days: f64,
    /// Predicted change in quality score.
    pub quality_delta: f64,
    pub risk_flags: Vec<RiskFlag>,
}

/// What is constrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BottleneckKind {
    ResourceOverload {
        resource_id: String,
        utilization: f64,
    },
    SkillShortage {
        skill: String,
        demand: usize,
        supply: usize,
    },
}

/// A capacity warning raised for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckWarning {
    pub kind: BottleneckKind,
    pub severity: RiskLevel,
    pub message: String,
}

/// Full output of an optimization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub id: ResultId,
    pub project_id: String,
    pub goal: OptimizationGoal,
    pub best: AllocationPlan,
    pub alternatives: Vec<AllocationPlan>,
    pub projected_cost: f64,
    pub projected_completion_day: u32,
    pub average_utilization: f64,
    pub utilization: Vec<ResourceUtilization>,
    pub recommendations: Vec<Recommendation>,
    pub bottlenecks: Vec<BottleneckWarning>,
    pub generations: u32,
    pub termination: TerminationReason,
    /// True when the search stopped on a deadline or cancellation.
    pub partial: bool,
}
