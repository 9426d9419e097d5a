//! Per-transaction lock phase state machine.
//!
//! The schedule notation has no explicit unlock operations, so the point at
//! which a transaction stops acquiring locks has to be inferred. A phase
//! machine starts in [`LockPhase::Growing`] and moves to
//! [`LockPhase::Shrinking`] exactly once, on the first [`PhaseTrigger`] it
//! receives:
//!
//! - the transaction's own commit or abort, or
//! - another transaction accessing a variable this one holds a lock on in
//!   an incompatible mode. The access could only have happened if the lock
//!   had been released already, so the release is inferred at that step.
//!
//! The second trigger is a heuristic, not ground truth.

use alloc::string::String;
use core::fmt::{Display, Formatter, Result};

use crate::locking::LockMode;
use crate::schedule::types::TransactionId;

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    Growing,
    Shrinking,
}

impl Display for LockPhase {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::Growing => f.write_str("growing"),
            Self::Shrinking => f.write_str("shrinking"),
        }
    }
}

/// An event that ends the growing phase.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseTrigger {
    /// The transaction committed or aborted at `step`.
    Termination { step: usize },
    /// Transaction `by` accessed `variable` at `step` while this transaction
    /// held it in `held` mode, incompatibly.
    ConflictingAccess {
        step: usize,
        by: TransactionId,
        variable: String,
        held: LockMode,
    },
}

impl PhaseTrigger {
    #[must_use]
    pub const fn step(&self) -> usize {
        match self {
            Self::Termination { step } | Self::ConflictingAccess { step, .. } => *step,
        }
    }
}

/// One-way `Growing -> Shrinking` machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseMachine {
    trigger: Option<PhaseTrigger>,
}

impl PhaseMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self { trigger: None }
    }

    #[must_use]
    pub const fn phase(&self) -> LockPhase {
        if self.trigger.is_some() {
            LockPhase::Shrinking
        } else {
            LockPhase::Growing
        }
    }

    /// The phase the transaction was in at `step`.
    #[must_use]
    pub fn phase_at(&self, step: usize) -> LockPhase {
        match &self.trigger {
            Some(trigger) if trigger.step() <= step => LockPhase::Shrinking,
            _ => LockPhase::Growing,
        }
    }

    /// The trigger that ended the growing phase, if any.
    #[must_use]
    pub const fn trigger(&self) -> Option<&PhaseTrigger> {
        self.trigger.as_ref()
    }

    /// Feeds a trigger. Returns `true` if it caused the transition; once
    /// shrinking, later triggers are ignored.
    pub fn fire(&mut self, trigger: PhaseTrigger) -> bool {
        if self.trigger.is_some() {
            return false;
        }
        tracing::trace!(?trigger, "lock phase: growing -> shrinking");
        self.trigger = Some(trigger);
        true
    }
}
