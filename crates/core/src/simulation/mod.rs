//! Step-by-step strict-2PL execution of a schedule.
//!
//! [`SimulationState::advance`] is the reducer; [`LockManager`] owns the
//! schedule, the current state and the append-only history of snapshots.

pub mod deadlock;
pub mod state;
pub mod types;

use alloc::format;
use alloc::vec::Vec;

pub use deadlock::find_mutual_wait;
pub use state::SimulationState;
pub use types::{Lock, SimulationStep, TransactionStatus, WaitEntry};

use crate::schedule::types::Operation;

/// Default bound for [`LockManager::run`].
pub const DEFAULT_MAX_STEPS: usize = 1000;

#[derive(Debug, Clone)]
pub struct LockManager {
    operations: Vec<Operation>,
    state: SimulationState,
    history: Vec<SimulationStep>,
}

impl LockManager {
    /// Build a manager over `operations` with the initial snapshot recorded.
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        let state = SimulationState::new(&operations);
        let initial = state.snapshot(
            None,
            alloc::vec![format!(
                "Simulation initialized: {} operation(s), {} transaction(s)",
                operations.len(),
                state.transaction_statuses.len()
            )],
        );
        tracing::debug!(
            operations = operations.len(),
            transactions = state.transaction_statuses.len(),
            "lock manager initialized"
        );
        Self {
            operations,
            state,
            history: alloc::vec![initial],
        }
    }

    /// Advance by one step and return the new snapshot.
    pub fn next_step(&mut self) -> &SimulationStep {
        let (state, step) = core::mem::take(&mut self.state).advance(&self.operations);
        tracing::trace!(
            index = ?step.current_step_index,
            deadlock = step.is_deadlock,
            "simulation step"
        );
        self.state = state;
        self.history.push(step);
        self.current()
    }

    /// The latest snapshot.
    #[must_use]
    pub fn current(&self) -> &SimulationStep {
        // `history` always holds at least the initial snapshot.
        &self.history[self.history.len() - 1]
    }

    #[must_use]
    pub fn history(&self) -> &[SimulationStep] {
        &self.history
    }

    #[must_use]
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete(&self.operations)
    }

    #[must_use]
    pub fn is_deadlocked(&self) -> bool {
        self.current().is_deadlock
    }

    /// Discard all progress, optionally switching to a new schedule.
    pub fn reset(&mut self, operations: Option<Vec<Operation>>) {
        let operations = operations.unwrap_or_else(|| core::mem::take(&mut self.operations));
        *self = Self::new(operations);
    }

    /// Step until the schedule completes, a deadlock is detected or
    /// `max_steps` steps were taken. Returns the full history.
    pub fn run(&mut self, max_steps: usize) -> &[SimulationStep] {
        let mut taken = 0;
        while taken < max_steps && !self.is_complete() && !self.is_deadlocked() {
            self.next_step();
            taken += 1;
        }
        tracing::debug!(
            steps = taken,
            complete = self.is_complete(),
            deadlock = self.is_deadlocked(),
            "simulation run finished"
        );
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::String;

    use super::*;
    use crate::locking::LockMode;
    use crate::schedule::types::TransactionId;

    fn deadlock_schedule() -> Vec<Operation> {
        vec![
            Operation::write(0, 1, "A"),
            Operation::write(1, 2, "B"),
            Operation::read(2, 1, "B"),
            Operation::read(3, 2, "A"),
        ]
    }

    fn assert_lock_invariant(step: &SimulationStep) {
        let mut per_variable: BTreeMap<&str, Vec<LockMode>> = BTreeMap::new();
        for lock in &step.locks {
            per_variable
                .entry(lock.variable.as_str())
                .or_default()
                .push(lock.mode);
        }
        for (variable, modes) in per_variable {
            let exclusive = modes.iter().filter(|m| **m == LockMode::Exclusive).count();
            assert!(exclusive <= 1, "two X locks on {variable}");
            if exclusive == 1 {
                assert_eq!(modes.len(), 1, "X and S locks mixed on {variable}");
            }
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let manager = LockManager::new(deadlock_schedule());
        assert_eq!(manager.history().len(), 1);
        let initial = manager.current();
        assert_eq!(initial.current_step_index, None);
        assert!(initial.operation.is_none());
        assert!(initial.locks.is_empty());
        assert_eq!(
            initial.log,
            vec![String::from(
                "Simulation initialized: 4 operation(s), 2 transaction(s)"
            )]
        );
    }

    #[test]
    fn test_two_way_deadlock() {
        let mut manager = LockManager::new(deadlock_schedule());
        for _ in 0..4 {
            manager.next_step();
        }
        let step = manager.current();
        assert!(step.is_deadlock);
        assert_eq!(step.deadlocked, vec![TransactionId::from(1), TransactionId::from(2)]);
        assert_eq!(step.waiting_queue.len(), 2);
        assert_eq!(step.waiting_queue[0].transaction, TransactionId::from(1));
        assert_eq!(step.waiting_queue[0].variable, "B");
        assert_eq!(step.waiting_queue[1].transaction, TransactionId::from(2));
        assert_eq!(step.waiting_queue[1].variable, "A");
        assert_eq!(
            step.transaction_statuses[&TransactionId::from(1)],
            TransactionStatus::Blocked
        );
    }

    #[test]
    fn test_run_stops_on_deadlock() {
        let mut manager = LockManager::new(deadlock_schedule());
        let history = manager.run(DEFAULT_MAX_STEPS);
        assert_eq!(history.len(), 5);
        assert!(manager.is_deadlocked());
    }

    #[test]
    fn test_run_respects_bound() {
        let mut manager = LockManager::new(deadlock_schedule());
        assert_eq!(manager.run(2).len(), 3);
        assert!(!manager.is_deadlocked());
    }

    #[test]
    fn test_run_to_completion() {
        let ops = vec![
            Operation::read(0, 1, "X"),
            Operation::write(1, 2, "X"),
            Operation::commit(2, 1),
            Operation::commit(3, 2),
        ];
        let mut manager = LockManager::new(ops);
        let history = manager.run(DEFAULT_MAX_STEPS).to_vec();
        assert!(manager.is_complete());
        history.iter().for_each(assert_lock_invariant);
        let last = manager.current();
        assert!(last.locks.is_empty());
        assert!(last
            .transaction_statuses
            .values()
            .all(|status| *status == TransactionStatus::Committed));
    }

    #[test]
    fn test_step_past_end_logs_completion() {
        let mut manager = LockManager::new(vec![Operation::commit(0, 1)]);
        manager.next_step();
        let step = manager.next_step();
        assert_eq!(step.log, vec![String::from("Simulation complete")]);
        assert_eq!(manager.history().len(), 3);
    }

    #[test]
    fn test_reset() {
        let mut manager = LockManager::new(deadlock_schedule());
        manager.run(DEFAULT_MAX_STEPS);
        manager.reset(None);
        assert_eq!(manager.history().len(), 1);
        assert_eq!(manager.operations().len(), 4);
        assert!(!manager.is_deadlocked());

        manager.reset(Some(vec![Operation::read(0, 5, "Z")]));
        assert_eq!(manager.operations().len(), 1);
        assert!(manager
            .state()
            .transaction_statuses
            .contains_key(&TransactionId::from(5)));
    }
}
