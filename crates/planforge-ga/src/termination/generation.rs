//! Generation count termination.

use planforge_core::TerminationReason;

use super::Termination;
use crate::scope::SearchScope;

/// Terminates after a number of generations.
///
/// # Example
///
/// ```
/// use planforge_ga::termination::GenerationCountTermination;
///
/// let term = GenerationCountTermination::new(200);
/// ```
#[derive(Debug, Clone)]
pub struct GenerationCountTermination {
    limit: u32,
}

impl GenerationCountTermination {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl Termination for GenerationCountTermination {
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
        (scope.generation() >= self.limit).then_some(TerminationReason::MaxGenerations)
    }
}
