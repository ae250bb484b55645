//! Listener hooks for search progress.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use planforge_ga::{GenerationListener, GenerationStatistics};
//!
//! #[derive(Debug)]
//! struct Printer;
//! impl GenerationListener for Printer {
//!     fn on_generation(&self, stats: &GenerationStatistics) {
//!         println!("generation {} best {:.3}", stats.generation, stats.best);
//!     }
//! }
//!
//! let listener: Arc<dyn GenerationListener> = Arc::new(Printer);
//! ```

use std::fmt::Debug;

use planforge_core::TerminationReason;

use crate::fitness::FitnessResult;
use crate::statistics::GenerationStatistics;

/// Receives per-generation notifications from a running search.
pub trait GenerationListener: Send + Sync + Debug {
    /// Called after every generation, including the initial population.
    fn on_generation(&self, stats: &GenerationStatistics);

    /// Called once when the search stops.
    fn on_search_ended(&self, _reason: TerminationReason, _best: &FitnessResult) {}
}
