//! End-to-end checks of the analysis and the lock manager on small,
//! hand-written schedules.
//!
//! Uses the `schedule!` DSL macro defined in tests/common/mod.rs.
mod common;

use schedcheck_core::conflict::{describe_cycle, ConflictType};
use schedcheck_core::locking::{LockEventKind, LockPhase, Violation};
use schedcheck_core::simulation::{TransactionStatus, DEFAULT_MAX_STEPS};
use schedcheck_core::{analyze, LockManager, TransactionId};

fn t(id: u64) -> TransactionId {
    TransactionId::from(id)
}

#[test]
fn serializable_single_edge() {
    let analysis = analyze(schedule![r(1, X), w(1, X), r(2, X), w(2, X), c(1), c(2)]);

    let conflicts: Vec<_> = analysis
        .conflicts
        .iter()
        .map(|c| (c.first.text.as_str(), c.second.text.as_str(), c.conflict_type))
        .collect();
    assert_eq!(
        conflicts,
        vec![
            ("R1(X)", "W2(X)", ConflictType::ReadWrite),
            ("W1(X)", "R2(X)", ConflictType::WriteRead),
            ("W1(X)", "W2(X)", ConflictType::WriteWrite),
        ]
    );

    let graph = &analysis.precedence_graph;
    assert_eq!(graph.nodes, vec![t(1), t(2)]);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(
        (&graph.edges[0].source, &graph.edges[0].target),
        (&t(1), &t(2))
    );
    assert!(graph.is_serializable);
    assert!(graph.cycle_edges.is_empty());
    assert_eq!(analysis.serial_order, Some(vec![t(1), t(2)]));
}

#[test]
fn two_transaction_cycle() {
    let analysis = analyze(schedule![r(1, X), w(2, X), r(2, Y), w(1, Y)]);
    let graph = &analysis.precedence_graph;

    assert!(!graph.is_serializable);
    assert!(graph.edge(&t(1), &t(2)).is_some());
    assert!(graph.edge(&t(2), &t(1)).is_some());
    assert_eq!(graph.cycle_edges.len(), 2);
    assert!(graph.cycle_edges.iter().all(|edge| edge.is_cycle_edge));
    assert_eq!(analysis.serial_order, None);
    assert_eq!(
        describe_cycle(graph),
        "T1 -> T2 [RW(X)]; T2 -> T1 [RW(Y)]"
    );
}

#[test]
fn three_transaction_cycle_reports_all_edges() {
    let analysis = analyze(schedule![
        w(1, X),
        r(2, X),
        w(2, Y),
        r(3, Y),
        w(3, Z),
        r(1, Z),
    ]);
    let graph = &analysis.precedence_graph;
    assert!(!graph.is_serializable);
    let cycle: Vec<_> = graph
        .cycle_edges
        .iter()
        .map(|edge| (edge.source.0, edge.target.0))
        .collect();
    assert_eq!(cycle, vec![(1, 2), (2, 3), (3, 1)]);
}

#[test]
fn strict_violation_keeps_basic() {
    let analysis = analyze(schedule![w(1, X), r(2, X), c(1)]);
    let t1 = &analysis.two_pl_report.transaction_compliance[&t(1)];

    assert!(t1.basic_2pl);
    assert!(t1.conservative_2pl);
    assert!(!t1.strict_2pl);
    assert!(!t1.rigorous_2pl);

    // The foreign read at step 1 forces the inferred release.
    assert!(t1.lock_phase_events.iter().any(|event| event.step == 1
        && matches!(&event.kind, LockEventKind::ImplicitRelease { by, .. } if *by == t(2))));
    assert!(t1
        .lock_phase_events
        .iter()
        .any(|event| event.violation.is_some() && event.action.contains("VIOLATION")));

    // T2 reads but never terminates.
    let t2 = &analysis.two_pl_report.transaction_compliance[&t(2)];
    assert!(t2.basic_2pl);
    assert!(!t2.rigorous_2pl);
}

#[test]
fn acquisition_after_inferred_release() {
    let analysis = analyze(schedule![w(1, X), r(2, X), w(1, Y), c(1), c(2)]);
    let t1 = &analysis.two_pl_report.transaction_compliance[&t(1)];

    assert!(!t1.basic_2pl);
    assert!(!t1.strict_2pl);
    assert!(!t1.conservative_2pl);
    let last = t1.lock_phase_events.last().map(|event| (event.step, event.violation));
    assert_eq!(last, Some((2, Some(Violation::AcquireAfterRelease))));
}

#[test]
fn serial_schedule_is_rigorous() {
    let analysis = analyze(schedule![r(1, X), w(1, X), c(1), r(2, X), w(2, X), c(2)]);
    for compliance in analysis.two_pl_report.transaction_compliance.values() {
        assert!(compliance.basic_2pl);
        assert!(compliance.strict_2pl);
        assert!(compliance.rigorous_2pl);
        let phases: Vec<_> = compliance.lock_phase_events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![LockPhase::Growing, LockPhase::Growing, LockPhase::Shrinking]
        );
    }
    assert!(analysis.two_pl_report.is_cascadeless);
    assert!(analysis.recoverability.is_recoverable);
}

#[test]
fn cascading_abort_risk() {
    let analysis = analyze(schedule![w(1, X), r(2, X), a(1)]);
    assert!(!analysis.two_pl_report.is_cascadeless);
    assert!(analysis.two_pl_report.allows_cascading_aborts);
    assert_eq!(analysis.recoverability.dirty_reads.len(), 1);
    assert_eq!(analysis.recoverability.dirty_reads[0].writer, t(1));
}

#[test]
fn deadlock_after_four_steps() {
    let mut manager = LockManager::new(schedule![w(1, A), w(2, B), r(1, B), r(2, A)]);
    for _ in 0..4 {
        manager.next_step();
    }
    let step = manager.current();

    assert!(step.is_deadlock);
    let waiting: Vec<_> = step
        .waiting_queue
        .iter()
        .map(|entry| (entry.transaction.clone(), entry.variable.as_str()))
        .collect();
    assert_eq!(waiting, vec![(t(1), "B"), (t(2), "A")]);
    assert_eq!(step.transaction_statuses[&t(1)], TransactionStatus::Blocked);
    assert_eq!(step.transaction_statuses[&t(2)], TransactionStatus::Blocked);
}

#[test]
fn waiting_writer_proceeds_after_commit() {
    let mut manager = LockManager::new(schedule![r(1, X), w(2, X), c(1), w(2, Y), c(2)]);
    let history = manager.run(DEFAULT_MAX_STEPS).to_vec();

    assert!(manager.is_complete());
    assert!(history.iter().all(|step| !step.is_deadlock));
    let statuses = &manager.current().transaction_statuses;
    assert_eq!(statuses[&t(1)], TransactionStatus::Committed);
    assert_eq!(statuses[&t(2)], TransactionStatus::Committed);
    assert!(manager.current().locks.is_empty());
}

#[test]
fn empty_schedule() {
    let analysis = analyze(Vec::new());
    assert!(analysis.operations.is_empty());
    assert!(analysis.transactions.is_empty());
    assert!(analysis.precedence_graph.edges.is_empty());
    assert!(analysis.is_serializable());

    let mut manager = LockManager::new(Vec::new());
    assert!(manager.is_complete());
    assert_eq!(manager.run(DEFAULT_MAX_STEPS).len(), 1);
}

#[test]
fn analysis_is_idempotent() {
    let ops = schedule![r(1, X), w(2, X), w(1, X), c(1), a(2)];
    assert_eq!(analyze(ops.clone()), analyze(ops));
}
