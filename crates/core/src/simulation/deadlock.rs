//! Mutual-wait detection over the waiting queue.
//!
//! Only direct two-transaction waits are found: `a` waits for a lock `b`
//! holds while `b` waits for a lock `a` holds. Longer wait-for cycles
//! (`T1 -> T2 -> T3 -> T1`) are not reported; the simulation simply stops
//! making progress. Detecting those needs cycle detection over the full
//! wait-for graph.

use crate::schedule::types::TransactionId;
use crate::simulation::types::{Lock, WaitEntry};

/// `true` if `holder` holds a lock on `waiting.variable` that conflicts with
/// the requested mode.
fn blocks(locks: &[Lock], holder: &TransactionId, waiting: &WaitEntry) -> bool {
    locks.iter().any(|lock| {
        lock.transaction == *holder
            && lock.variable == waiting.variable
            && !lock.mode.is_compatible_with(waiting.requested)
    })
}

/// Find the first pair of waiting transactions blocked on each other.
#[must_use]
pub fn find_mutual_wait(
    locks: &[Lock],
    waiting_queue: &[WaitEntry],
) -> Option<(TransactionId, TransactionId)> {
    waiting_queue
        .iter()
        .enumerate()
        .flat_map(|(i, a)| waiting_queue[i + 1..].iter().map(move |b| (a, b)))
        .find(|(a, b)| {
            a.transaction != b.transaction
                && blocks(locks, &a.transaction, b)
                && blocks(locks, &b.transaction, a)
        })
        .map(|(a, b)| (a.transaction.clone(), b.transaction.clone()))
}
