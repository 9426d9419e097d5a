//! Lock modes and two-phase-locking compliance.

pub mod phase;
pub mod two_phase;

use core::fmt::{Display, Formatter, Result};

pub use phase::{LockPhase, PhaseMachine, PhaseTrigger};
pub use two_phase::{
    analyze_two_phase_locking, Discipline, LockEventKind, LockPhaseEvent, TransactionCompliance,
    TwoPhaseLockingReport, Violation,
};

/// Lock modes for read/write access.
///
/// Ordered by strength: `Shared < Exclusive`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Shared lock for reads (multiple readers allowed).
    Shared,
    /// Exclusive lock for writes (single writer, no readers).
    Exclusive,
}

impl LockMode {
    /// Whether a lock in this mode held by one transaction can coexist with
    /// a lock in `other` mode held by a different transaction.
    #[must_use]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        matches!((self, other), (Self::Shared, Self::Shared))
    }

    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Shared => 'S',
            Self::Exclusive => 'X',
        }
    }
}

impl Display for LockMode {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.symbol())
    }
}
