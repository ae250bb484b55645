//! Historical series sources.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

use planforge_core::{HistoricalSeries, PlanForgeError, Result};

/// Supplies the recorded history of a project for forecasting.
pub trait HistoryProvider: Send + Sync + Debug {
    /// # Errors
    ///
    /// `InsufficientHistory` when nothing is recorded for `project_id`.
    fn history(&self, project_id: &str) -> Result<HistoricalSeries>;
}

/// History kept in memory, keyed by project id.
#[derive(Debug, Default)]
pub struct InMemoryHistoryProvider {
    series: RwLock<HashMap<String, HistoricalSeries>>,
}

impl InMemoryHistoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, series: HistoricalSeries) -> Self {
        if let Ok(mut map) = self.series.write() {
            map.insert(series.project_id.clone(), series);
        }
        self
    }

    /// Stores or replaces the series of `series.project_id`.
    pub fn insert(&self, series: HistoricalSeries) -> Result<()> {
        self.series
            .write()
            .map_err(|_| PlanForgeError::Internal("history lock poisoned".into()))?
            .insert(series.project_id.clone(), series);
        Ok(())
    }
}

impl HistoryProvider for InMemoryHistoryProvider {
    fn history(&self, project_id: &str) -> Result<HistoricalSeries> {
        self.series
            .read()
            .map_err(|_| PlanForgeError::Internal("history lock poisoned".into()))?
            .get(project_id)
            .cloned()
            .ok_or_else(|| PlanForgeError::InsufficientHistory {
                series: format!("history of '{project_id}'"),
                required: 1,
                actual: 0,
            })
    }
}
