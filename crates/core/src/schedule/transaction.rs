use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Result};

use hashbrown::HashMap;

use crate::schedule::types::{Action, Operation, TransactionId};

/// How a transaction ended within the schedule.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    Aborted,
    /// Neither a commit nor an abort appears.
    Unterminated,
}

/// Derived facts about one transaction's operations.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub read_set: BTreeSet<String>,
    pub write_set: BTreeSet<String>,
    pub outcome: Outcome,
    /// Step of the first commit or abort, if any.
    pub termination_step: Option<usize>,
    pub first_step: usize,
    pub last_step: usize,
}

impl Display for TransactionSummary {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let join = |set: &BTreeSet<String>| {
            set.iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "reads {{{}}}, writes {{{}}}, ",
            join(&self.read_set),
            join(&self.write_set)
        )?;
        match self.outcome {
            Outcome::Committed => f.write_str("committed"),
            Outcome::Aborted => f.write_str("aborted"),
            Outcome::Unterminated => f.write_str("unterminated"),
        }
    }
}

/// A transaction together with its operations, in step order.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub operations: Vec<Operation>,
    pub summary: TransactionSummary,
}

impl Transaction {
    fn from_operations(id: TransactionId, operations: Vec<Operation>) -> Self {
        let mut read_set = BTreeSet::new();
        let mut write_set = BTreeSet::new();
        let mut outcome = Outcome::Unterminated;
        let mut termination_step = None;

        for op in &operations {
            match &op.action {
                Action::Read { variable } => {
                    read_set.insert(variable.clone());
                }
                Action::Write { variable } => {
                    write_set.insert(variable.clone());
                }
                Action::Commit if termination_step.is_none() => {
                    outcome = Outcome::Committed;
                    termination_step = Some(op.step);
                }
                Action::Abort if termination_step.is_none() => {
                    outcome = Outcome::Aborted;
                    termination_step = Some(op.step);
                }
                Action::Commit | Action::Abort => {}
            }
        }

        let first_step = operations.first().map_or(0, |op| op.step);
        let last_step = operations.last().map_or(0, |op| op.step);

        Self {
            id,
            operations,
            summary: TransactionSummary {
                read_set,
                write_set,
                outcome,
                termination_step,
                first_step,
                last_step,
            },
        }
    }
}

/// Unique transaction ids in order of first appearance.
#[must_use]
pub fn transaction_ids(operations: &[Operation]) -> Vec<TransactionId> {
    let mut seen = hashbrown::HashSet::new();
    let mut ordered: Vec<&Operation> = operations.iter().collect();
    ordered.sort_by_key(|op| op.step);
    ordered
        .into_iter()
        .filter(|op| seen.insert(&op.transaction))
        .map(|op| op.transaction.clone())
        .collect()
}

/// Group operations by transaction, keeping first-appearance order of the
/// transactions and step order within each.
#[must_use]
pub fn group_transactions(operations: &[Operation]) -> Vec<Transaction> {
    let ids = transaction_ids(operations);
    let mut grouped: HashMap<TransactionId, Vec<Operation>> =
        ids.iter().map(|id| (id.clone(), Vec::new())).collect();

    let mut ordered: Vec<&Operation> = operations.iter().collect();
    ordered.sort_by_key(|op| op.step);
    for op in ordered {
        grouped
            .entry(op.transaction.clone())
            .or_default()
            .push(op.clone());
    }

    let transactions: Vec<Transaction> = ids
        .into_iter()
        .map(|id| {
            let operations = grouped.remove(&id).unwrap_or_default();
            Transaction::from_operations(id, operations)
        })
        .collect();

    tracing::debug!(
        operations = operations.len(),
        transactions = transactions.len(),
        "grouped transactions"
    );

    transactions
}
