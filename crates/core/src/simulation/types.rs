use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Result};

use crate::locking::LockMode;
use crate::schedule::types::{Operation, TransactionId};

/// A lock held by a transaction.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub transaction: TransactionId,
    pub variable: String,
    pub mode: LockMode,
}

impl Display for Lock {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}({}) by {}", self.mode, self.variable, self.transaction)
    }
}

/// Modeled state of a transaction inside the simulation.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    /// Waiting for a lock held incompatibly by another transaction.
    Blocked,
    Committed,
    Aborted,
}

impl TransactionStatus {
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Blocked => f.write_str("blocked"),
            Self::Committed => f.write_str("committed"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// A lock request that could not be granted yet.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitEntry {
    pub transaction: TransactionId,
    pub operation: Operation,
    pub variable: String,
    pub requested: LockMode,
}

/// Immutable snapshot of the lock manager after one step.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationStep {
    /// Index of the last operation taken from the schedule, `None` before
    /// the first.
    pub current_step_index: Option<usize>,
    /// The operation processed by this step, `None` for the initial
    /// snapshot, queue drains and steps past the end.
    pub operation: Option<Operation>,
    pub locks: Vec<Lock>,
    pub transaction_statuses: BTreeMap<TransactionId, TransactionStatus>,
    pub waiting_queue: Vec<WaitEntry>,
    /// What happened during this step.
    pub log: Vec<String>,
    pub is_deadlock: bool,
    /// The two transactions waiting on each other, when `is_deadlock`.
    pub deadlocked: Vec<TransactionId>,
}
