//! Termination conditions for the genetic search.

mod composite;
mod external;
mod generation;
mod stagnation;
mod time;

use std::fmt::Debug;

use planforge_core::TerminationReason;

use crate::scope::SearchScope;

pub use composite::OrTermination;
pub use external::ExternalTermination;
pub use generation::GenerationCountTermination;
pub use stagnation::StagnationTermination;
pub use time::TimeTermination;

/// Decides when a search stops, and why.
pub trait Termination: Send + Debug {
    /// Returns the reason to stop, or `None` to keep searching.
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason>;
}

/// An absent condition never terminates.
impl<T: Termination> Termination for Option<T> {
    fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
        self.as_ref().and_then(|t| t.check(scope))
    }
}
