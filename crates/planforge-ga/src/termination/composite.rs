//! Composite termination (OR).
//!
//! Uses macro-generated tuple implementations.

use planforge_core::TerminationReason;

use super::Termination;
use crate::scope::SearchScope;

/// Terminates when any child terminates; the first child that fires,
/// in tuple order, supplies the reason.
///
/// # Examples
///
/// ```
/// use planforge_ga::termination::{
///     ExternalTermination, GenerationCountTermination, OrTermination,
/// };
///
/// let termination = OrTermination((ExternalTermination, GenerationCountTermination::new(100)));
/// ```
#[derive(Debug)]
pub struct OrTermination<T>(pub T);

impl<T> OrTermination<T> {
    pub fn new(terminations: T) -> Self {
        Self(terminations)
    }
}

macro_rules! impl_or_termination {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T),+> Termination for OrTermination<($($T,)+)>
        where
            $($T: Termination,)+
        {
            fn check(&self, scope: &SearchScope) -> Option<TerminationReason> {
                None$(.or_else(|| (self.0).$idx.check(scope)))+
            }
        }
    };
}

impl_or_termination!(0: T0);
impl_or_termination!(0: T0, 1: T1);
impl_or_termination!(0: T0, 1: T1, 2: T2);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
