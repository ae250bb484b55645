//! Termination on caller cancellation.

use planforge_core::TerminationReason;

use super::Termination;
use crate::scope::SearchScope;

/// Terminates once the scope's cancellation token is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalTermination;

impl Termination for ExternalTermination {
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
        scope
            .is_cancelled()
            .then_some(TerminationReason::Cancelled)
    }
}
