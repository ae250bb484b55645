//! In-process registry of optimization results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use planforge_core::{OptimizationResult, PlanForgeError, Result, ResultId};

/// Append-only store of finished results, addressed by id.
#[derive(Debug, Default)]
pub struct ResultRegistry {
    next: AtomicU64,
    results: Mutex<HashMap<ResultId, Arc<OptimizationResult>>>,
}

fn lock_poisoned() -> PlanForgeError {
    PlanForgeError::Internal("result registry lock poisoned".into())
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next id: `opt-1`, `opt-2`, ...
    pub fn next_id(&self) -> ResultId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        ResultId::new(format!("opt-{n}"))
    }

    pub fn insert(&self, result: OptimizationResult) -> Result<Arc<OptimizationResult>> {
        let result = Arc::new(result);
        self.results
            .lock()
            .map_err(|_| lock_poisoned())?
            .insert(result.id.clone(), Arc::clone(&result));
        Ok(result)
    }

    pub fn get(&self, id: &ResultId) -> Result<Arc<OptimizationResult>> {
        self.results
            .lock()
            .map_err(|_| lock_poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| PlanForgeError::ResultNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
