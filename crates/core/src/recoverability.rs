//! Recoverability and cascadelessness.
//!
//! A read `R_j(X)` at step `s` reads from the most recent earlier write
//! `W_i(X)` by a different transaction. If `T_i` aborted before `s` the read
//! is treated as seeing an older committed value and is ignored.
//!
//! - **Cascadeless**: every such `T_i` committed strictly before `s`.
//! - **Recoverable**: whenever the reader commits, every `T_i` it read from
//!   committed strictly before that commit.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::schedule::types::{Action, Operation, TransactionId};

/// A read of data written by a transaction that had not committed yet.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRead {
    pub read_step: usize,
    pub reader: TransactionId,
    pub writer: TransactionId,
    pub variable: String,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverabilityReport {
    pub is_recoverable: bool,
    pub is_cascadeless: bool,
    pub allows_cascading_aborts: bool,
    pub dirty_reads: Vec<DirtyRead>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    Commit(usize),
    Abort(usize),
}

fn terminations(operations: &[Operation]) -> HashMap<TransactionId, Termination> {
    let mut ordered: Vec<&Operation> = operations.iter().collect();
    ordered.sort_by_key(|op| op.step);
    let mut terminations = HashMap::new();
    for op in ordered {
        let termination = match op.action {
            Action::Commit => Termination::Commit(op.step),
            Action::Abort => Termination::Abort(op.step),
            Action::Read { .. } | Action::Write { .. } => continue,
        };
        terminations.entry(op.transaction.clone()).or_insert(termination);
    }
    terminations
}

/// Check recoverability and cascadelessness of a schedule.
#[must_use]
pub fn check_recoverability(operations: &[Operation]) -> RecoverabilityReport {
    let terminations = terminations(operations);
    let commit_step = |id: &TransactionId| match terminations.get(id) {
        Some(Termination::Commit(step)) => Some(*step),
        _ => None,
    };

    let mut dirty_reads = Vec::new();
    let mut is_recoverable = true;

    for read in operations {
        let Action::Read { variable } = &read.action else {
            continue;
        };

        let Some(writer) = operations
            .iter()
            .filter(|op| {
                op.step < read.step
                    && op.transaction != read.transaction
                    && matches!(&op.action, Action::Write { variable: written } if written == variable)
            })
            .max_by_key(|op| op.step)
        else {
            continue;
        };

        if let Some(Termination::Abort(step)) = terminations.get(&writer.transaction) {
            if *step < read.step {
                continue;
            }
        }

        let writer_commit = commit_step(&writer.transaction);
        if !writer_commit.is_some_and(|step| step < read.step) {
            tracing::trace!(
                reader = %read.transaction,
                writer = %writer.transaction,
                step = read.step,
                "dirty read"
            );
            dirty_reads.push(DirtyRead {
                read_step: read.step,
                reader: read.transaction.clone(),
                writer: writer.transaction.clone(),
                variable: variable.clone(),
            });
        }

        // A read issued after the reader already committed cannot make that
        // commit unrecoverable.
        if let Some(reader_commit) =
            commit_step(&read.transaction).filter(|step| *step > read.step)
        {
            if !writer_commit.is_some_and(|step| step < reader_commit) {
                is_recoverable = false;
            }
        }
    }

    dirty_reads.sort_by_key(|dirty| dirty.read_step);
    let is_cascadeless = dirty_reads.is_empty();

    tracing::debug!(is_recoverable, is_cascadeless, "checked recoverability");

    RecoverabilityReport {
        is_recoverable,
        is_cascadeless,
        allows_cascading_aborts: !is_cascadeless,
        dirty_reads,
    }
}

/// `true` if no read observes a write of a not-yet-committed transaction.
#[must_use]
pub fn is_cascadeless(operations: &[Operation]) -> bool {
    check_recoverability(operations).is_cascadeless
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_after_commit_is_cascadeless() {
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::commit(1, 1),
            Operation::read(2, 2, "X"),
            Operation::commit(3, 2),
        ];
        let report = check_recoverability(&ops);
        assert!(report.is_cascadeless);
        assert!(report.is_recoverable);
        assert!(!report.allows_cascading_aborts);
    }

    #[test]
    fn test_dirty_read_before_abort() {
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::read(1, 2, "X"),
            Operation::abort(2, 1),
        ];
        let report = check_recoverability(&ops);
        assert!(!report.is_cascadeless);
        assert!(report.allows_cascading_aborts);
        assert_eq!(
            report.dirty_reads,
            vec![DirtyRead {
                read_step: 1,
                reader: TransactionId::from(2),
                writer: TransactionId::from(1),
                variable: "X".into(),
            }]
        );
        // T2 never commits, so nothing unrecoverable has happened.
        assert!(report.is_recoverable);
    }

    #[test]
    fn test_writer_aborted_before_read_is_ignored() {
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::abort(1, 1),
            Operation::read(2, 2, "X"),
            Operation::commit(3, 2),
        ];
        assert!(is_cascadeless(&ops));
    }

    #[test]
    fn test_reader_commits_first_is_unrecoverable() {
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::read(1, 2, "X"),
            Operation::commit(2, 2),
            Operation::commit(3, 1),
        ];
        let report = check_recoverability(&ops);
        assert!(!report.is_recoverable);
        assert!(!report.is_cascadeless);
    }

    #[test]
    fn test_recoverable_but_not_cascadeless() {
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::read(1, 2, "X"),
            Operation::commit(2, 1),
            Operation::commit(3, 2),
        ];
        let report = check_recoverability(&ops);
        assert!(report.is_recoverable);
        assert!(!report.is_cascadeless);
    }

    #[test]
    fn test_most_recent_writer_decides() {
        // T1's write is committed, but T3 overwrote X afterwards and is still open.
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::commit(1, 1),
            Operation::write(2, 3, "X"),
            Operation::read(3, 2, "X"),
            Operation::commit(4, 3),
        ];
        let report = check_recoverability(&ops);
        assert_eq!(report.dirty_reads.len(), 1);
        assert_eq!(report.dirty_reads[0].writer, TransactionId::from(3));
    }

    #[test]
    fn test_own_writes_are_not_dirty() {
        let ops = vec![Operation::write(0, 1, "X"), Operation::read(1, 1, "X")];
        assert!(is_cascadeless(&ops));
    }

    #[test]
    fn test_commit_at_read_step_is_too_late() {
        // Same-step commit cannot happen in a parsed schedule, but the rule
        // is strict inequality.
        let ops = vec![
            Operation::write(0, 1, "X"),
            Operation::read(1, 2, "X"),
            Operation::commit(1, 1),
        ];
        assert!(!is_cascadeless(&ops));
    }
}
