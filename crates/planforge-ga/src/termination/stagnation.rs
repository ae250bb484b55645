//! Convergence by lack of improvement.

use planforge_core::TerminationReason;

use super::Termination;
use crate::scope::SearchScope;

/// Terminates when the best fitness has not improved by more than the
/// scope's epsilon for `limit` consecutive generations.
#[derive(Debug, Clone)]
pub struct StagnationTermination {
    limit: u32,
}

impl StagnationTermination {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl Termination for StagnationTermination {
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
        (self.limit > 0 && scope.stale_generations() >= self.limit)
            .then_some(TerminationReason::Converged)
    }
}
