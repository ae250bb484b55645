//! Historical project series.

use planforge_core::HistoricalSeries;

/// Planned length of generated projects, in days.
pub const PLANNED_DAYS: f64 = 100.0;

/// Planned daily spend of generated projects.
pub const PLANNED_DAILY_COST: f64 = 1_000.0;

/// A project tracking its plan: spend oscillates around the planned burn
/// and progress advances one percent per day.
pub fn steady_history(project_id: &str, days: usize) -> HistoricalSeries {
    HistoricalSeries::new(project_id)
        .with_costs(
            (0..days)
                .map(|d| PLANNED_DAILY_COST + 40.0 * ((d % 7) as f64 - 3.0))
                .collect(),
        )
        .with_progress((1..=days).map(|d| d as f64).collect())
        .with_incidents((0..days).map(|d| (d % 10 == 9) as u8 as f64).collect())
        .with_plan(PLANNED_DAILY_COST * PLANNED_DAYS, PLANNED_DAYS)
}

/// A project whose spend grows three percent per day while progress
/// runs at half the planned pace.
pub fn overrun_history(project_id: &str, days: usize) -> HistoricalSeries {
    HistoricalSeries::new(project_id)
        .with_costs(
            (0..days)
                .map(|d| PLANNED_DAILY_COST * (1.0 + 0.03 * d as f64))
                .collect(),
        )
        .with_progress((1..=days).map(|d| d as f64 * 0.5).collect())
        .with_incidents((0..days).map(|d| (d % 3 == 0) as u8 as f64).collect())
        .with_plan(PLANNED_DAILY_COST * PLANNED_DAYS, PLANNED_DAYS)
}
