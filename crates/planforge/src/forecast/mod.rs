//! Forecast service.
//!
//! Cost and schedule forecasts roll the selected forecaster forward one
//! day at a time, feeding each prediction back into a working copy of the
//! history. Intervals widen as `z · σ · √h` at step `h`. Risk forecasts
//! use the risk classifier when one is trained and a threshold rule over
//! projected overrun and delay otherwise.

use std::sync::Arc;
use std::time::{Duration, Instant};

use planforge_config::{ForecastSettings, RiskThresholds};
use planforge_core::{
    Forecast, ForecastConfig, ForecastResponse, ForecastType, HistoricalSeries, ModelSource,
    PlanForgeError, Result, RiskLevel,
};
use planforge_ga::CancellationToken;
use planforge_ml::features::{cost_window, extend_series, risk_features, schedule_window};
use planforge_ml::{ForecastModel, ModelInput, ModelManager, ModelType};
use tracing::info;

/// Positions of the projected overrun and delay among the risk features.
const EAC_OVERRUN_FEATURE: usize = 12;
const DELAY_FEATURE: usize = 13;
/// Cost volatility among the risk features.
const COST_CV_FEATURE: usize = 6;
/// Lowest spread of the rule-based risk score.
const MIN_RISK_STD: f64 = 0.05;

/// Maps a projected overrun or delay percentage onto a risk level.
///
/// Underruns are low risk.
pub fn risk_from_variance(variance_pct: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if variance_pct >= thresholds.critical {
        RiskLevel::Critical
    } else if variance_pct >= thresholds.high {
        RiskLevel::High
    } else if variance_pct >= thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn risk_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 0.0,
        RiskLevel::Medium => 1.0 / 3.0,
        RiskLevel::High => 2.0 / 3.0,
        RiskLevel::Critical => 1.0,
    }
}

fn source_label(source: &ModelSource) -> String {
    match source {
        ModelSource::Trained { model_id, version } => format!("{model_id} v{version}"),
        ModelSource::Baseline => "baseline".to_string(),
    }
}

/// Deadline and cancellation checked before every rollout step.
struct Budget<'a> {
    deadline: Option<Instant>,
    cancel: &'a CancellationToken,
}

impl Budget<'_> {
    fn exhausted(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Per-step points with their intervals.
#[derive(Default)]
struct Rollout {
    points: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    partial: bool,
}

impl Rollout {
    fn push(&mut self, point: f64, half_width: f64, bounds: (f64, f64)) {
        self.points.push(point);
        self.lower.push((point - half_width).clamp(bounds.0, bounds.1));
        self.upper.push((point + half_width).clamp(bounds.0, bounds.1));
    }
}

/// Produces cost, schedule and risk forecasts from historical series.
#[derive(Debug)]
pub struct ForecastService {
    settings: ForecastSettings,
    models: Arc<ModelManager>,
}

impl ForecastService {
    pub fn new(settings: ForecastSettings, models: Arc<ModelManager>) -> Self {
        Self { settings, models }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    fn window(&self, forecast_type: ForecastType, config: &ForecastConfig) -> usize {
        config.window.unwrap_or(match forecast_type {
            ForecastType::Cost => self.settings.cost_window,
            ForecastType::Schedule => self.settings.schedule_window,
            ForecastType::Risk => self.settings.risk_window,
        })
    }

    /// Forecasts every type in `types` over `config.horizon` days.
    ///
    /// Types are answered in request order; duplicates are answered once.
    ///
    /// # Errors
    ///
    /// `InsufficientHistory` when a series is shorter than its window plus
    /// one, `Validation` for an empty type list, a zero horizon or
    /// malformed history, and `Cancelled` when `cancel` is already set.
    pub fn forecast(
        &self,
        series: &HistoricalSeries,
        types: &[ForecastType],
        config: &ForecastConfig,
        cancel: &CancellationToken,
    ) -> Result<ForecastResponse> {
        if types.is_empty() {
            return Err(PlanForgeError::validation("no forecast types requested"));
        }
        if config.horizon == 0 {
            return Err(PlanForgeError::validation("forecast horizon must be positive"));
        }
        series.validate()?;
        if cancel.is_cancelled() {
            return Err(PlanForgeError::Cancelled);
        }

        let budget = Budget {
            deadline: config.timeout.map(|t| Instant::now() + t),
            cancel,
        };
        let mut forecasts: Vec<Forecast> = Vec::with_capacity(types.len());
        for &forecast_type in types {
            if forecasts.iter().any(|f| f.forecast_type == forecast_type) {
                continue;
            }
            let started = Instant::now();
            let forecast = match forecast_type {
                ForecastType::Cost | ForecastType::Schedule => {
                    self.series_forecast(series, forecast_type, config, &budget)?
                }
                ForecastType::Risk => self.risk_forecast(series, config, &budget)?,
            };
            log_forecast(&series.project_id, &forecast, started.elapsed());
            forecasts.push(forecast);
        }

        Ok(ForecastResponse {
            project_id: series.project_id.clone(),
            forecasts,
        })
    }

    fn series_forecast(
        &self,
        series: &HistoricalSeries,
        forecast_type: ForecastType,
        config: &ForecastConfig,
        budget: &Budget<'_>,
    ) -> Result<Forecast> {
        let window = self.window(forecast_type, config);
        let rows = |s: &HistoricalSeries| match forecast_type {
            ForecastType::Schedule => schedule_window(s, window),
            _ => cost_window(s, window),
        };
        let model_type = match forecast_type {
            ForecastType::Schedule => ModelType::ScheduleForecaster,
            _ => ModelType::CostForecaster,
        };
        // Fail on short history before touching the model store.
        rows(series)?;
        let forecaster = self.models.forecaster(model_type)?;
        let z = config.confidence.z_score();

        let mut working = series.clone();
        let mut rollout = Rollout::default();
        let mut last_progress = series
            .schedule_progress
            .last()
            .copied()
            .unwrap_or(0.0)
            .min(100.0);
        for h in 1..=config.horizon {
            if budget.exhausted() {
                rollout.partial = true;
                break;
            }
            let (value, std) = predict_scalar(&forecaster, rows(&working)?)?;
            let spread = z * std * (h as f64).sqrt();
            match forecast_type {
                ForecastType::Schedule => {
                    // Progress never runs backwards and tops out at 100%.
                    let point = (value * 100.0).clamp(last_progress, 100.0);
                    last_progress = point;
                    rollout.push(point, spread * 100.0, (0.0, 100.0));
                }
                _ => {
                    let point = value.max(0.0);
                    rollout.push(point, spread, (0.0, f64::INFINITY));
                }
            }
            extend_series(&mut working, forecast_type, value);
        }

        let variance_pct = match forecast_type {
            ForecastType::Schedule => schedule_delay_pct(series, &rollout.points),
            _ => cost_overrun_pct(series, &rollout.points, window),
        };
        Ok(Forecast {
            forecast_type,
            risk_level: risk_from_variance(variance_pct, &self.settings.risk_thresholds),
            horizon: rollout.points.len(),
            points: rollout.points,
            lower: rollout.lower,
            upper: rollout.upper,
            confidence: config.confidence,
            variance_pct,
            source: forecaster.source(),
            partial: rollout.partial,
        })
    }

    fn risk_forecast(
        &self,
        series: &HistoricalSeries,
        config: &ForecastConfig,
        budget: &Budget<'_>,
    ) -> Result<Forecast> {
        let window = self.window(ForecastType::Risk, config);
        let features = risk_features(series, window)?;
        let variance_pct = features[EAC_OVERRUN_FEATURE].max(features[DELAY_FEATURE]);

        let (level, std, source) = match self.models.classify_risk(&features)? {
            Some(estimate) => (
                estimate.level,
                (1.0 - estimate.confidence).max(0.0) * 0.5,
                estimate.source,
            ),
            None => (
                risk_from_variance(variance_pct, &self.settings.risk_thresholds),
                features[COST_CV_FEATURE].clamp(MIN_RISK_STD, 1.0),
                ModelSource::Baseline,
            ),
        };

        let z = config.confidence.z_score();
        let score = risk_score(level);
        let mut rollout = Rollout::default();
        for h in 1..=config.horizon {
            if budget.exhausted() {
                rollout.partial = true;
                break;
            }
            rollout.push(score, z * std * (h as f64).sqrt(), (0.0, 1.0));
        }

        Ok(Forecast {
            forecast_type: ForecastType::Risk,
            horizon: rollout.points.len(),
            points: rollout.points,
            lower: rollout.lower,
            upper: rollout.upper,
            confidence: config.confidence,
            risk_level: level,
            variance_pct,
            source,
            partial: rollout.partial,
        })
    }
}

fn predict_scalar(forecaster: &ForecastModel, rows: Vec<Vec<f64>>) -> Result<(f64, f64)> {
    forecaster
        .predict(&ModelInput::Sequence(rows))?
        .scalar()
        .filter(|(v, s)| v.is_finite() && s.is_finite())
        .ok_or_else(|| PlanForgeError::Internal("forecaster returned no finite value".into()))
}

/// Projected cumulative spend against the planned burn over the same
/// days; without a plan, the forecast level against the recent window.
fn cost_overrun_pct(series: &HistoricalSeries, points: &[f64], window: usize) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let days = series.daily_cost.len() + points.len();
    if series.planned_budget > 0.0 && series.planned_duration_days > 0.0 {
        let planned = series.planned_budget / series.planned_duration_days * days as f64;
        let projected = series.total_cost() + points.iter().sum::<f64>();
        return (projected - planned) / planned * 100.0;
    }
    let recent = &series.daily_cost[series.daily_cost.len().saturating_sub(window)..];
    let level = recent.iter().sum::<f64>() / recent.len().max(1) as f64;
    if level <= 0.0 {
        return 0.0;
    }
    let projected = points.iter().sum::<f64>() / points.len() as f64;
    (projected - level) / level * 100.0
}

/// Shortfall of projected progress against planned progress at the
/// forecast end, as a share of planned progress.
fn schedule_delay_pct(series: &HistoricalSeries, points: &[f64]) -> f64 {
    let Some(&projected) = points.last() else {
        return 0.0;
    };
    if series.planned_duration_days <= 0.0 {
        return 0.0;
    }
    let days = (series.schedule_progress.len() + points.len()) as f64;
    let planned = (days / series.planned_duration_days * 100.0).min(100.0);
    if planned <= 0.0 {
        return 0.0;
    }
    (planned - projected) / planned * 100.0
}

fn log_forecast(project_id: &str, forecast: &Forecast, elapsed: Duration) {
    info!(
        event = "forecast_end",
        project_id,
        forecast_type = %forecast.forecast_type,
        horizon = forecast.horizon,
        risk_level = %forecast.risk_level,
        variance_pct = forecast.variance_pct,
        source = %source_label(&forecast.source),
        partial = forecast.partial,
        duration_ms = elapsed.as_millis() as u64,
    );
}

#[cfg(test)]
mod tests;
