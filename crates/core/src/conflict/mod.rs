//! Conflicting operation pairs and the precedence graph they induce.

pub mod precedence;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Result};

pub use precedence::{build_precedence_graph, describe_cycle, PrecedenceEdge, PrecedenceGraph};

use crate::schedule::types::{Operation, OperationKind};

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    ReadWrite,
    WriteRead,
    WriteWrite,
}

impl ConflictType {
    /// Classify an ordered pair of operation kinds. `None` unless at least
    /// one of them is a write and both are accesses.
    #[must_use]
    pub const fn classify(first: OperationKind, second: OperationKind) -> Option<Self> {
        match (first, second) {
            (OperationKind::Read, OperationKind::Write) => Some(Self::ReadWrite),
            (OperationKind::Write, OperationKind::Read) => Some(Self::WriteRead),
            (OperationKind::Write, OperationKind::Write) => Some(Self::WriteWrite),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReadWrite => "RW",
            Self::WriteRead => "WR",
            Self::WriteWrite => "WW",
        }
    }
}

impl Display for ConflictType {
    fn fmt(&self, f: &mut Formatter) -> Result {
        f.write_str(self.label())
    }
}

/// Two operations of different transactions on the same variable, at least
/// one a write. `first.step < second.step` always holds.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub first: Operation,
    pub second: Operation,
    pub conflict_type: ConflictType,
    pub variable: String,
}

impl Conflict {
    /// Edge label contribution, e.g. `RW(X)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}({})", self.conflict_type, self.variable)
    }
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(
            f,
            "{} -> {} ({} on {})",
            self.first, self.second, self.conflict_type, self.variable
        )
    }
}

/// All conflicting pairs, ordered by the first operation and then the
/// second, both in input order.
///
/// Every pair is compared, so this is quadratic in the schedule length.
#[must_use]
pub fn detect_conflicts(operations: &[Operation]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for first in operations {
        let Some(variable) = first.variable() else {
            continue;
        };
        for second in operations {
            if second.step <= first.step
                || second.transaction == first.transaction
                || second.variable() != Some(variable)
            {
                continue;
            }
            let Some(conflict_type) = ConflictType::classify(first.kind(), second.kind()) else {
                continue;
            };
            tracing::trace!(%first, %second, %conflict_type, "conflict");
            conflicts.push(Conflict {
                first: first.clone(),
                second: second.clone(),
                conflict_type,
                variable: variable.into(),
            });
        }
    }
    tracing::debug!(conflicts = conflicts.len(), "detected conflicts");
    conflicts
}
