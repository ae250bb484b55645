//! Goal weight table.
//!
//! Fitness weight vectors are data: the defaults below can be replaced
//! per goal from configuration.

use planforge_core::{GoalWeights, OptimizationGoal};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Weight vector for every optimization goal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GoalWeightTable {
    pub minimize_cost: GoalWeights,
    pub minimize_duration: GoalWeights,
    pub maximize_quality: GoalWeights,
    pub balance_cost_time: GoalWeights,
    pub maximize_utilization: GoalWeights,
    pub minimize_idle_time: GoalWeights,
}

const fn weights(
    cost: f64,
    utilization: f64,
    duration: f64,
    quality: f64,
    idle: f64,
    baseline: f64,
) -> GoalWeights {
    GoalWeights {
        cost,
        utilization,
        duration,
        quality,
        idle,
        baseline,
    }
}

impl Default for GoalWeightTable {
    fn default() -> Self {
        Self {
            minimize_cost: weights(0.6, 0.2, 0.0, 0.0, 0.0, 0.2),
            minimize_duration: weights(0.0, 0.2, 0.6, 0.0, 0.0, 0.2),
            maximize_quality: weights(0.1, 0.0, 0.1, 0.6, 0.0, 0.2),
            balance_cost_time: weights(0.4, 0.4, 0.0, 0.0, 0.0, 0.2),
            maximize_utilization: weights(0.2, 0.6, 0.0, 0.0, 0.0, 0.2),
            minimize_idle_time: weights(0.0, 0.2, 0.0, 0.0, 0.6, 0.2),
        }
    }
}

impl GoalWeightTable {
    /// Returns the weight vector for `goal`.
    pub fn get(&self, goal: OptimizationGoal) -> GoalWeights {
        match goal {
            OptimizationGoal::MinimizeCost => self.minimize_cost,
            OptimizationGoal::MinimizeDuration => self.minimize_duration,
            OptimizationGoal::MaximizeQuality => self.maximize_quality,
            OptimizationGoal::BalanceCostTime => self.balance_cost_time,
            OptimizationGoal::MaximizeUtilization => self.maximize_utilization,
            OptimizationGoal::MinimizeIdleTime => self.minimize_idle_time,
        }
    }

    /// Replaces the weight vector for `goal`.
    pub fn set(&mut self, goal: OptimizationGoal, w: GoalWeights) {
        let slot = match goal {
            OptimizationGoal::MinimizeCost => &mut self.minimize_cost,
            OptimizationGoal::MinimizeDuration => &mut self.minimize_duration,
            OptimizationGoal::MaximizeQuality => &mut self.maximize_quality,
            OptimizationGoal::BalanceCostTime => &mut self.balance_cost_time,
            OptimizationGoal::MaximizeUtilization => &mut self.maximize_utilization,
            OptimizationGoal::MinimizeIdleTime => &mut self.minimize_idle_time,
        };
        *slot = w;
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for goal in OptimizationGoal::ALL {
            self.get(goal)
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("goal_weights.{goal}: {e}")))?;
        }
        Ok(())
    }
}
