//! Feature extraction.
//!
//! Every extractor produces fixed-width rows of raw (unnormalized) values.
//! Models fit their own [`Normalizer`] at training time and replay it at
//! inference, so callers never normalize by hand.

mod normalize;
mod series;

use planforge_core::{PlanForgeError, Resource, Result, Task};
use planforge_store::ModelType;

pub use normalize::Normalizer;
pub(crate) use series::linear_fit;
pub use series::{
    cost_rows, cost_training_set, cost_window, extend_series, risk_features, schedule_rows,
    schedule_training_set, schedule_window, SeriesView,
};

/// Task × resource × context features scored by the allocation classifier.
pub const ALLOCATION_FEATURES: usize = 25;
/// Features per effort-history step for the duration predictor.
pub const DURATION_FEATURES: usize = 15;
/// Features per day for the cost forecaster.
pub const COST_FEATURES: usize = 10;
/// Features per day for the schedule forecaster.
pub const SCHEDULE_FEATURES: usize = 8;
/// Project-level features for the risk classifier.
pub const RISK_FEATURES: usize = 15;

/// Suitability bands of the allocation classifier.
pub const SUITABILITY_BANDS: usize = 10;
/// Severity classes of the risk classifier.
pub const RISK_CLASSES: usize = 5;

/// Width of one input row for `model_type`.
pub fn input_width(model_type: ModelType) -> usize {
    match model_type {
        ModelType::ResourceAllocation => ALLOCATION_FEATURES,
        ModelType::RiskAnalysis => RISK_FEATURES,
        ModelType::DurationPredictor => DURATION_FEATURES,
        ModelType::CostForecaster => COST_FEATURES,
        ModelType::ScheduleForecaster => SCHEDULE_FEATURES,
    }
}

/// Output classes for classifier types, `None` for regressors.
pub fn class_count(model_type: ModelType) -> Option<usize> {
    match model_type {
        ModelType::ResourceAllocation => Some(SUITABILITY_BANDS),
        ModelType::RiskAnalysis => Some(RISK_CLASSES),
        _ => None,
    }
}

/// Plan context of an allocation being scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationContext {
    pub start_day: u32,
    /// Hours already planned on the resource by the same plan.
    pub resource_load_hours: f64,
    pub horizon_days: u32,
    /// Length of the working-hours window.
    pub window_hours: f64,
}

impl AllocationContext {
    pub fn new(horizon_days: u32, window_hours: f64) -> Self {
        Self {
            start_day: 0,
            resource_load_hours: 0.0,
            horizon_days,
            window_hours,
        }
    }

    pub fn at(mut self, start_day: u32, resource_load_hours: f64) -> Self {
        self.start_day = start_day;
        self.resource_load_hours = resource_load_hours;
        self
    }
}

/// Fraction of `task`'s required skills held by `resource`.
pub fn skill_coverage(task: &Task, resource: &Resource) -> f64 {
    if task.required_skills.is_empty() {
        return 1.0;
    }
    let held = task
        .required_skills
        .iter()
        .filter(|s| resource.has_skill(s))
        .count();
    held as f64 / task.required_skills.len() as f64
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Builds the 25 allocation features.
pub fn allocation_features(
    task: &Task,
    resource: &Resource,
    ctx: &AllocationContext,
) -> Result<Vec<f64>> {
    let daily = resource.effective_daily_hours(ctx.window_hours);
    let horizon = f64::from(ctx.horizon_days.max(1));
    let predicted_days = if daily > 0.0 {
        task.estimated_hours / daily
    } else {
        horizon
    };
    let slack = task
        .deadline_day
        .map_or(horizon, |d| f64::from(d) - f64::from(ctx.start_day));
    let window_days = f64::from(
        resource
            .availability
            .end_within(ctx.horizon_days)
            .saturating_sub(resource.availability.start_day),
    );
    let capacity_hours = (daily * window_days).max(f64::EPSILON);
    let (hist_mean, hist_std) = mean_std(&task.effort_history);
    let hist_ratio = if task.estimated_hours > 0.0 && !task.effort_history.is_empty() {
        task.effort_history.iter().sum::<f64>() / task.estimated_hours
    } else {
        1.0
    };

    let row = vec![
        task.estimated_hours,
        task.complexity / 10.0,
        task.priority.weight(),
        task.required_skills.len() as f64,
        skill_coverage(task, resource),
        resource.skill_level,
        resource.cost_rate,
        resource.capacity_hours_per_day,
        resource.current_utilization,
        daily,
        predicted_days,
        task.estimated_hours * resource.cost_rate,
        task.dependencies.len() as f64,
        if task.deadline_day.is_some() { 1.0 } else { 0.0 },
        slack,
        f64::from(ctx.start_day),
        ctx.resource_load_hours,
        ctx.resource_load_hours / capacity_hours,
        f64::from(resource.availability.start_day),
        f64::from(resource.availability.end_within(ctx.horizon_days)),
        horizon,
        hist_mean,
        hist_std,
        task.effort_history.len() as f64,
        hist_ratio,
    ];
    ensure_finite("allocation features", &row)?;
    Ok(row)
}

/// Builds one 15-feature row per effort-history step of `task`.
///
/// Without a resource the row uses neutral resource values.
pub fn duration_sequence(
    task: &Task,
    resource: Option<&Resource>,
    window_hours: f64,
) -> Result<Vec<Vec<f64>>> {
    if task.effort_history.is_empty() {
        return Err(PlanForgeError::Validation(format!(
            "task '{}' has no effort history",
            task.id
        )));
    }
    let (level, rate, daily, util) = match resource {
        Some(r) => (
            r.skill_level,
            r.cost_rate,
            r.effective_daily_hours(window_hours),
            r.current_utilization,
        ),
        None => (0.5, 0.0, window_hours, 0.0),
    };
    let estimate = task.estimated_hours.max(f64::EPSILON);
    let len = task.effort_history.len() as f64;

    let mut rows = Vec::with_capacity(task.effort_history.len());
    let mut cumulative = 0.0;
    let mut prev = 0.0;
    for (k, &hours) in task.effort_history.iter().enumerate() {
        cumulative += hours;
        let lo = k.saturating_sub(2);
        let recent = &task.effort_history[lo..=k];
        let rolling = recent.iter().sum::<f64>() / recent.len() as f64;
        let row = vec![
            hours,
            cumulative,
            cumulative / estimate,
            (k + 1) as f64 / len,
            hours - prev,
            rolling,
            task.estimated_hours,
            task.complexity / 10.0,
            task.priority.weight(),
            task.required_skills.len() as f64,
            task.dependencies.len() as f64,
            level,
            rate,
            daily,
            util,
        ];
        ensure_finite("duration features", &row)?;
        rows.push(row);
        prev = hours;
    }
    Ok(rows)
}

pub(crate) fn ensure_finite(what: &str, row: &[f64]) -> Result<()> {
    match row.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(PlanForgeError::Validation(format!(
            "{what}: column {i} is not finite"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn ensure_width(what: &str, row: &[f64], width: usize) -> Result<()> {
    if row.len() != width {
        return Err(PlanForgeError::Validation(format!(
            "{what}: expected {width} features, got {}",
            row.len()
        )));
    }
    ensure_finite(what, row)
}
