//! Wall-clock termination.

use std::time::Duration;

use planforge_core::TerminationReason;

use super::Termination;
use crate::scope::SearchScope;

/// Terminates after a time limit; the best-so-far result is kept.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use planforge_ga::termination::TimeTermination;
///
/// let term = TimeTermination::new(Duration::from_secs(30));
/// let term = TimeTermination::millis(500);
/// ```
#[derive(Debug, Clone)]
pub struct TimeTermination {
    limit: Duration,
}

impl TimeTermination {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Termination for TimeTermination {
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
        (scope.elapsed() >= self.limit).then_some(TerminationReason::Deadline)
    }
}
