//! Historical project time series.

use serde::{Deserialize, Serialize};

use crate::error::{PlanForgeError, Result};

/// Daily history of one project, oldest first.
///
/// `daily_cost`, `schedule_progress` and `incident_counts` are aligned by
/// day. Shorter series are padded by the consumer with their last value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalSeries {
    pub project_id: String,
    /// Spend per day.
    pub daily_cost: Vec<f64>,
    /// Cumulative completion in percent (0..=100).
    pub schedule_progress: Vec<f64>,
    /// Incidents or risk events per day.
    pub incident_counts: Vec<f64>,
    pub planned_budget: f64,
    pub planned_duration_days: f64,
}

impl HistoricalSeries {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn with_costs(mut self, costs: Vec<f64>) -> Self {
        self.daily_cost = costs;
        self
    }

    pub fn with_progress(mut self, progress: Vec<f64>) -> Self {
        self.schedule_progress = progress;
        self
    }

    pub fn with_incidents(mut self, incidents: Vec<f64>) -> Self {
        self.incident_counts = incidents;
        self
    }

    pub fn with_plan(mut self, budget: f64, duration_days: f64) -> Self {
        self.planned_budget = budget;
        self.planned_duration_days = duration_days;
        self
    }

    /// Number of days covered by the longest series.
    pub fn len(&self) -> usize {
        self.daily_cost
            .len()
            .max(self.schedule_progress.len())
            .max(self.incident_counts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_cost(&self) -> f64 {
        self.daily_cost.iter().sum()
    }

    /// Rejects non-finite values and negative plans.
    pub fn validate(&self) -> Result<()> {
        let series = [
            ("daily_cost", &self.daily_cost),
            ("schedule_progress", &self.schedule_progress),
            ("incident_counts", &self.incident_counts),
        ];
        for (name, values) in series {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(PlanForgeError::Validation(format!(
                    "{name} contains non-finite values"
                )));
            }
        }
        if !self.planned_budget.is_finite() || self.planned_budget < 0.0 {
            return Err(PlanForgeError::validation("planned_budget must be >= 0"));
        }
        if !self.planned_duration_days.is_finite() || self.planned_duration_days < 0.0 {
            return Err(PlanForgeError::validation(
                "planned_duration_days must be >= 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_is_longest_series() {
        let s = HistoricalSeries::new("p")
            .with_costs(vec![1.0; 4])
            .with_progress(vec![10.0; 6]);
        assert_eq!(s.len(), 6);
        assert!(!s.is_empty());
        assert_eq!(s.total_cost(), 4.0);
    }

    #[test]
    fn test_rejects_nan() {
        let s = HistoricalSeries::new("p").with_costs(vec![1.0, f64::NAN]);
        assert!(s.validate().is_err());
    }
}
