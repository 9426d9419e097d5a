use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use schedcheck_core::{analyze, Action, LockManager, Operation, TransactionId};

const VARIABLES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Round-robin interleaving of `transactions` transactions with
/// `ops_per_txn` accesses each, followed by their commits.
fn build_schedule(transactions: u64, ops_per_txn: usize) -> Vec<Operation> {
    let mut operations = Vec::new();
    for round in 0..ops_per_txn {
        for tx in 1..=transactions {
            let index = (tx as usize + round) % VARIABLES.len();
            let variable = VARIABLES[index].to_string();
            let action = if round % 2 == 0 {
                Action::Read { variable }
            } else {
                Action::Write { variable }
            };
            operations.push(Operation::new(operations.len(), TransactionId::from(tx), action));
        }
    }
    for tx in 1..=transactions {
        operations.push(Operation::new(
            operations.len(),
            TransactionId::from(tx),
            Action::Commit,
        ));
    }
    operations
}

fn bench_analysis(c: &mut Criterion) {
    let sizes = [
        ("small", build_schedule(3, 4)),
        ("medium", build_schedule(6, 8)),
        ("large", build_schedule(12, 16)),
    ];

    let mut group = c.benchmark_group("analysis");
    for (name, schedule) in &sizes {
        group.bench_function(format!("analyze_{name}"), |b| {
            b.iter(|| analyze(black_box(schedule.clone())));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("simulation");
    for (name, schedule) in &sizes {
        group.bench_function(format!("run_{name}"), |b| {
            b.iter(|| {
                let mut manager = LockManager::new(black_box(schedule.clone()));
                manager.run(10_000).len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
