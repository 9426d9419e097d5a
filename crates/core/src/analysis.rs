//! One complete analysis run over a parsed schedule.

use alloc::vec::Vec;

use crate::conflict::{build_precedence_graph, detect_conflicts, Conflict, PrecedenceGraph};
use crate::locking::{analyze_two_phase_locking, TwoPhaseLockingReport};
use crate::recoverability::{check_recoverability, RecoverabilityReport};
use crate::schedule::transaction::{group_transactions, Transaction};
use crate::schedule::types::{Operation, TransactionId};

/// Read-only result of analyzing a schedule.
///
/// Built fresh by [`analyze`]; analyzing the same operations twice yields
/// equal values.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAnalysis {
    pub operations: Vec<Operation>,
    pub transactions: Vec<Transaction>,
    pub conflicts: Vec<Conflict>,
    pub precedence_graph: PrecedenceGraph,
    /// An equivalent serial order, when the schedule is conflict
    /// serializable.
    pub serial_order: Option<Vec<TransactionId>>,
    pub two_pl_report: TwoPhaseLockingReport,
    pub recoverability: RecoverabilityReport,
}

impl ScheduleAnalysis {
    #[must_use]
    pub const fn is_serializable(&self) -> bool {
        self.precedence_graph.is_serializable
    }
}

/// Group, detect conflicts, build the precedence graph and check 2PL and
/// recoverability.
#[must_use]
pub fn analyze(operations: Vec<Operation>) -> ScheduleAnalysis {
    let transactions = group_transactions(&operations);
    let ids: Vec<TransactionId> = transactions.iter().map(|t| t.id.clone()).collect();

    let conflicts = detect_conflicts(&operations);
    let precedence_graph = build_precedence_graph(&ids, &conflicts);
    let serial_order = precedence_graph.serial_order();
    let recoverability = check_recoverability(&operations);
    let two_pl_report = analyze_two_phase_locking(&operations, &ids, &recoverability);

    tracing::debug!(
        operations = operations.len(),
        transactions = ids.len(),
        conflicts = conflicts.len(),
        serializable = precedence_graph.is_serializable,
        cascadeless = recoverability.is_cascadeless,
        "analyzed schedule"
    );

    ScheduleAnalysis {
        operations,
        transactions,
        conflicts,
        precedence_graph,
        serial_order,
        two_pl_report,
        recoverability,
    }
}
