//! Windowed features over historical project series.

use planforge_core::{ForecastType, HistoricalSeries, PlanForgeError, Result};

use super::{ensure_finite, COST_FEATURES, RISK_FEATURES, SCHEDULE_FEATURES};
use crate::model::{Dataset, ModelInput, Sample, Target};

const ROLLING_DAYS: usize = 7;

/// Day-aligned view of a series; shorter columns repeat their last value.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    series: &'a HistoricalSeries,
    len: usize,
}

fn padded(values: &[f64], t: usize) -> f64 {
    match values.get(t) {
        Some(&v) => v,
        None => values.last().copied().unwrap_or(0.0),
    }
}

impl<'a> SeriesView<'a> {
    pub fn new(series: &'a HistoricalSeries) -> Self {
        Self {
            series,
            len: series.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cost(&self, t: usize) -> f64 {
        padded(&self.series.daily_cost, t)
    }

    /// Progress in percent.
    pub fn progress(&self, t: usize) -> f64 {
        padded(&self.series.schedule_progress, t)
    }

    pub fn incidents(&self, t: usize) -> f64 {
        padded(&self.series.incident_counts, t)
    }

    fn budget(&self) -> f64 {
        self.series.planned_budget
    }

    fn duration(&self) -> f64 {
        self.series.planned_duration_days
    }

    fn planned_burn(&self) -> f64 {
        if self.duration() > 0.0 {
            self.budget() / self.duration()
        } else {
            0.0
        }
    }

    fn elapsed_fraction(&self, t: usize) -> f64 {
        if self.duration() > 0.0 {
            (t + 1) as f64 / self.duration()
        } else {
            0.0
        }
    }

    fn recent(&self, t: usize, f: impl Fn(usize) -> f64) -> Vec<f64> {
        let lo = (t + 1).saturating_sub(ROLLING_DAYS);
        (lo..=t).map(f).collect()
    }
}

fn ratio(num: f64, den: f64, fallback: f64) -> f64 {
    if den.abs() > f64::EPSILON {
        num / den
    } else {
        fallback
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Least-squares line through `values` at x = 0..n.
///
/// Returns `(slope, intercept, residual_std)`.
pub(crate) fn linear_fit(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0, 0.0);
    }
    if n == 1 {
        return (0.0, values[0], 0.0);
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = ratio(sxy, sxx, 0.0);
    let intercept = y_mean - slope * x_mean;
    let sse: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &y)| (y - (intercept + slope * i as f64)).powi(2))
        .sum();
    let dof = if n > 2 { nf - 2.0 } else { nf };
    (slope, intercept, (sse / dof).sqrt())
}

fn cost_row(view: &SeriesView<'_>, t: usize, cumulative: f64) -> Vec<f64> {
    let recent = view.recent(t, |i| view.cost(i));
    let prev = if t > 0 { view.cost(t - 1) } else { view.cost(t) };
    vec![
        view.cost(t),
        ratio(cumulative, view.budget(), 0.0),
        mean(&recent),
        std_dev(&recent),
        view.cost(t) - prev,
        view.progress(t) / 100.0,
        view.elapsed_fraction(t),
        view.incidents(t),
        view.planned_burn(),
        (t % 7) as f64 / 6.0,
    ]
}

fn schedule_row(view: &SeriesView<'_>, t: usize) -> Vec<f64> {
    let delta = |i: usize| {
        let prev = if i > 0 { view.progress(i - 1) } else { 0.0 };
        (view.progress(i) - prev) / 100.0
    };
    let recent = view.recent(t, delta);
    let actual = view.progress(t) / 100.0;
    let planned = view.elapsed_fraction(t).min(1.0);
    vec![
        actual,
        delta(t),
        mean(&recent),
        view.elapsed_fraction(t),
        planned,
        planned - actual,
        view.incidents(t),
        ratio(view.cost(t), view.planned_burn(), 0.0),
    ]
}

/// One 10-feature cost row per day.
pub fn cost_rows(series: &HistoricalSeries) -> Result<Vec<Vec<f64>>> {
    series.validate()?;
    let view = SeriesView::new(series);
    let mut cumulative = 0.0;
    let mut rows = Vec::with_capacity(view.len());
    for t in 0..view.len() {
        cumulative += view.cost(t);
        let row = cost_row(&view, t, cumulative);
        debug_assert_eq!(row.len(), COST_FEATURES);
        ensure_finite("cost features", &row)?;
        rows.push(row);
    }
    Ok(rows)
}

/// One 8-feature schedule row per day.
pub fn schedule_rows(series: &HistoricalSeries) -> Result<Vec<Vec<f64>>> {
    series.validate()?;
    let view = SeriesView::new(series);
    let mut rows = Vec::with_capacity(view.len());
    for t in 0..view.len() {
        let row = schedule_row(&view, t);
        debug_assert_eq!(row.len(), SCHEDULE_FEATURES);
        ensure_finite("schedule features", &row)?;
        rows.push(row);
    }
    Ok(rows)
}

fn require_history(name: &str, actual: usize, window: usize) -> Result<()> {
    if window == 0 {
        return Err(PlanForgeError::validation("forecast window must be positive"));
    }
    let required = window + 1;
    if actual < required {
        return Err(PlanForgeError::InsufficientHistory {
            series: name.to_string(),
            required,
            actual,
        });
    }
    Ok(())
}

fn tail(mut rows: Vec<Vec<f64>>, window: usize) -> Vec<Vec<f64>> {
    let start = rows.len().saturating_sub(window);
    rows.drain(..start);
    rows
}

/// Last `window` cost rows; needs at least `window + 1` cost points.
pub fn cost_window(series: &HistoricalSeries, window: usize) -> Result<Vec<Vec<f64>>> {
    require_history("daily_cost", series.daily_cost.len(), window)?;
    Ok(tail(cost_rows(series)?, window))
}

/// Last `window` schedule rows; needs at least `window + 1` progress points.
pub fn schedule_window(series: &HistoricalSeries, window: usize) -> Result<Vec<Vec<f64>>> {
    require_history("schedule_progress", series.schedule_progress.len(), window)?;
    Ok(tail(schedule_rows(series)?, window))
}

fn windowed_dataset(
    rows: Vec<Vec<f64>>,
    window: usize,
    target: impl Fn(usize) -> f64,
) -> Dataset {
    let mut dataset = Dataset::new();
    for t in window..rows.len() {
        dataset.push(Sample::new(
            ModelInput::Sequence(rows[t - window..t].to_vec()),
            Target::Value(target(t)),
        ));
    }
    dataset
}

/// Sliding windows of cost rows, each labelled with the next day's cost.
pub fn cost_training_set(series: &HistoricalSeries, window: usize) -> Result<Dataset> {
    require_history("daily_cost", series.daily_cost.len(), window)?;
    let view = SeriesView::new(series);
    let rows = cost_rows(series)?;
    Ok(windowed_dataset(rows, window, |t| view.cost(t)))
}

/// Sliding windows of schedule rows, labelled with the next day's progress
/// fraction.
pub fn schedule_training_set(series: &HistoricalSeries, window: usize) -> Result<Dataset> {
    require_history("schedule_progress", series.schedule_progress.len(), window)?;
    let view = SeriesView::new(series);
    let rows = schedule_rows(series)?;
    Ok(windowed_dataset(rows, window, |t| view.progress(t) / 100.0))
}

/// Appends one predicted day to `series` for autoregressive rollout.
///
/// `value` is in model target units: cost per day, or progress fraction.
/// Columns not being forecast carry forward their recent level.
pub fn extend_series(series: &mut HistoricalSeries, forecast_type: ForecastType, value: f64) {
    let view = SeriesView::new(series);
    let len = view.len();
    let last = len.saturating_sub(1);
    let recent_cost = if len == 0 {
        0.0
    } else {
        mean(&view.recent(last, |i| view.cost(i)))
    };
    let last_progress = if len == 0 { 0.0 } else { view.progress(last) };

    let (cost, progress) = match forecast_type {
        ForecastType::Cost => (value.max(0.0), last_progress),
        ForecastType::Schedule => (recent_cost, (value * 100.0).max(last_progress).min(100.0)),
        ForecastType::Risk => (recent_cost, last_progress),
    };

    pad_to(&mut series.daily_cost, len);
    pad_to(&mut series.schedule_progress, len);
    pad_to(&mut series.incident_counts, len);
    series.daily_cost.push(cost);
    series.schedule_progress.push(progress);
    series.incident_counts.push(0.0);
}

fn pad_to(values: &mut Vec<f64>, len: usize) {
    let fill = values.last().copied().unwrap_or(0.0);
    values.resize(len, fill);
}

/// Builds the 15 risk features over the last `window` days.
pub fn risk_features(series: &HistoricalSeries, window: usize) -> Result<Vec<f64>> {
    series.validate()?;
    require_history("history", series.len(), window)?;
    let view = SeriesView::new(series);
    let n = view.len();
    let last = n - 1;
    let lo = n - window;

    let cumulative: f64 = (0..n).map(|t| view.cost(t)).sum();
    let costs: Vec<f64> = (lo..n).map(|t| view.cost(t)).collect();
    let progress: Vec<f64> = (lo..n).map(|t| view.progress(t) / 100.0).collect();
    let incidents: Vec<f64> = (lo..n).map(|t| view.incidents(t)).collect();

    let budget = view.budget();
    let duration = view.duration();
    let done = view.progress(last) / 100.0;
    let elapsed = view.elapsed_fraction(last);
    let planned = elapsed.min(1.0);
    let cost_mean = mean(&costs);
    let (cost_slope, _, _) = linear_fit(&costs);
    let (progress_slope, _, _) = linear_fit(&progress);

    let eac_overrun = if done > 0.0 && budget > 0.0 {
        (cumulative / done - budget) / budget * 100.0
    } else {
        0.0
    };
    let delay = if done > 0.0 && duration > 0.0 {
        (n as f64 / done - duration) / duration * 100.0
    } else {
        0.0
    };

    let row = vec![
        ratio(cumulative, budget, 0.0),
        elapsed,
        done,
        ratio(done * budget, cumulative, 1.0).clamp(0.0, 5.0),
        ratio(done, planned, 1.0).clamp(0.0, 5.0),
        ratio(cost_mean, view.planned_burn(), 1.0),
        ratio(std_dev(&costs), cost_mean, 0.0),
        ratio(cost_slope, cost_mean, 0.0),
        progress_slope,
        incidents.iter().sum(),
        mean(&incidents),
        incidents.iter().copied().fold(0.0, f64::max),
        eac_overrun,
        delay,
        (1.0 - elapsed).max(0.0),
    ];
    debug_assert_eq!(row.len(), RISK_FEATURES);
    ensure_finite("risk features", &row)?;
    Ok(row)
}
