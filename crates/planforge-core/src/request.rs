//! Optimization request types and validation.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{dependency_order, Resource, Task};
use crate::error::{PlanForgeError, Result};

/// What the optimizer should favour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationGoal {
    MinimizeCost,
    MinimizeDuration,
    MaximizeQuality,
    #[default]
    BalanceCostTime,
    MaximizeUtilization,
    MinimizeIdleTime,
}

impl OptimizationGoal {
    pub const ALL: [OptimizationGoal; 6] = [
        OptimizationGoal::MinimizeCost,
        OptimizationGoal::MinimizeDuration,
        OptimizationGoal::MaximizeQuality,
        OptimizationGoal::BalanceCostTime,
        OptimizationGoal::MaximizeUtilization,
        OptimizationGoal::MinimizeIdleTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationGoal::MinimizeCost => "minimize_cost",
            OptimizationGoal::MinimizeDuration => "minimize_duration",
            OptimizationGoal::MaximizeQuality => "maximize_quality",
            OptimizationGoal::BalanceCostTime => "balance_cost_time",
            OptimizationGoal::MaximizeUtilization => "maximize_utilization",
            OptimizationGoal::MinimizeIdleTime => "minimize_idle_time",
        }
    }
}

impl fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights applied to normalized fitness sub-scores.
///
/// Fitness is `baseline + Σ weight·score − penalties`, clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GoalWeights {
    pub cost: f64,
    pub utilization: f64,
    pub duration: f64,
    pub quality: f64,
    pub idle: f64,
    pub baseline: f64,
}

impl GoalWeights {
    /// Sum of all weights including the baseline.
    pub fn total(&self) -> f64 {
        self.cost + self.utilization + self.duration + self.quality + self.idle + self.baseline
    }

    /// Validates that every weight is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.cost,
            self.utilization,
            self.duration,
            self.quality,
            self.idle,
            self.baseline,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PlanForgeError::validation(
                "goal weights must be finite and non-negative",
            ));
        }
        if self.total() <= 0.0 {
            return Err(PlanForgeError::validation("goal weights must not all be zero"));
        }
        Ok(())
    }
}

/// Daily working-hours window, in hours of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_hour: f64,
    pub end_hour: f64,
}

impl WorkingHours {
    pub fn new(start_hour: f64, end_hour: f64) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn length(&self) -> f64 {
        (self.end_hour - self.start_hour).max(0.0)
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::new(9.0, 17.0)
    }
}

/// Hard and soft limits the allocation must respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub budget: Option<f64>,
    /// Day by which the whole project must finish.
    pub deadline_day: Option<u32>,
    /// Skills that must be present in the resource pool.
    pub required_skills: Vec<String>,
    pub working_hours: WorkingHours,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            budget: None,
            deadline_day: None,
            required_skills: Vec::new(),
            working_hours: WorkingHours::default(),
        }
    }
}

/// Caller preferences that shape the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Overrides the configured weight vector for the goal.
    pub weights: Option<GoalWeights>,
    /// Number of alternative plans to return besides the best.
    pub alternatives: usize,
    /// Minimum normalized gene distance between returned plans.
    pub diversity_threshold: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            weights: None,
            alternatives: 3,
            diversity_threshold: 0.2,
        }
    }
}

/// A request to allocate a project's tasks to resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub project_id: String,
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub goal: OptimizationGoal,
    /// Planning horizon in days.
    pub horizon_days: u32,
    /// Wall-clock budget for the search.
    #[serde(default)]
    pub timeout: Option<Duration>,
    /// Seed for reproducible runs; falls back to the engine seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl OptimizationRequest {
    pub fn new(
        project_id: impl Into<String>,
        tasks: Vec<Task>,
        resources: Vec<Resource>,
        horizon_days: u32,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            tasks,
            resources,
            constraints: Constraints::default(),
            preferences: Preferences::default(),
            goal: OptimizationGoal::default(),
            horizon_days,
            timeout: None,
            seed: None,
        }
    }

    pub fn with_goal(mut self, goal: OptimizationGoal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the request for malformed input.
    ///
    /// Skill coverage is *not* checked here: a task whose skills nobody
    /// holds is a feasibility problem, reported by the search as
    /// `ConstraintInfeasible`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(PlanForgeError::validation("project_id must not be empty"));
        }
        if self.tasks.is_empty() {
            return Err(PlanForgeError::validation("request has no tasks"));
        }
        if self.resources.is_empty() {
            return Err(PlanForgeError::validation("request has no resources"));
        }
        if self.horizon_days == 0 {
            return Err(PlanForgeError::validation("horizon_days must be positive"));
        }
        if self.resources.len() > u16::MAX as usize {
            return Err(PlanForgeError::validation("resource pool too large"));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(PlanForgeError::validation("task id must not be empty"));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(PlanForgeError::Validation(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
            if !task.estimated_hours.is_finite() || task.estimated_hours <= 0.0 {
                return Err(PlanForgeError::Validation(format!(
                    "task '{}' has non-positive estimated_hours",
                    task.id
                )));
            }
            if !task.complexity.is_finite() {
                return Err(PlanForgeError::Validation(format!(
                    "task '{}' has non-finite complexity",
                    task.id
                )));
            }
            if task.effort_history.iter().any(|h| !h.is_finite()) {
                return Err(PlanForgeError::Validation(format!(
                    "task '{}' has non-finite effort history",
                    task.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.id.trim().is_empty() {
                return Err(PlanForgeError::validation("resource id must not be empty"));
            }
            if !seen.insert(resource.id.as_str()) {
                return Err(PlanForgeError::Validation(format!(
                    "duplicate resource id '{}'",
                    resource.id
                )));
            }
            let numeric = [
                resource.cost_rate,
                resource.capacity_hours_per_day,
                resource.skill_level,
                resource.current_utilization,
            ];
            if numeric.iter().any(|v| !v.is_finite()) {
                return Err(PlanForgeError::Validation(format!(
                    "resource '{}' has non-finite attributes",
                    resource.id
                )));
            }
            if resource.cost_rate < 0.0 || resource.capacity_hours_per_day <= 0.0 {
                return Err(PlanForgeError::Validation(format!(
                    "resource '{}' needs a non-negative cost rate and positive capacity",
                    resource.id
                )));
            }
        }

        dependency_order(&self.tasks)?;
        self.validate_constraints()?;

        if let Some(weights) = &self.preferences.weights {
            weights.validate()?;
        }
        let threshold = self.preferences.diversity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PlanForgeError::validation(
                "diversity_threshold must be within [0, 1]",
            ));
        }

        Ok(())
    }

    fn validate_constraints(&self) -> Result<()> {
        let c = &self.constraints;
        if let Some(budget) = c.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(PlanForgeError::validation("budget must be positive"));
            }
        }
        if c.deadline_day == Some(0) {
            return Err(PlanForgeError::validation("deadline_day must be positive"));
        }
        let wh = c.working_hours;
        if !(wh.start_hour.is_finite() && wh.end_hour.is_finite())
            || wh.start_hour < 0.0
            || wh.end_hour > 24.0
            || wh.start_hour >= wh.end_hour
        {
            return Err(PlanForgeError::validation(
                "working_hours must satisfy 0 <= start < end <= 24",
            ));
        }
        Ok(())
    }
}
