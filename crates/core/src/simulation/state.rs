//! The lock manager as a pure reducer: `(state, schedule) -> (state, step)`.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::locking::LockMode;
use crate::schedule::transaction::transaction_ids;
use crate::schedule::types::{Action, Operation, TransactionId};
use crate::simulation::deadlock::find_mutual_wait;
use crate::simulation::types::{Lock, SimulationStep, TransactionStatus, WaitEntry};

/// Mutable part of a strict-2PL lock manager.
///
/// Locks are held until commit or abort; conflicting requests wait in a
/// FIFO queue that is re-examined at the start of every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationState {
    /// Index of the last schedule operation taken, `None` before the first.
    pub current_step_index: Option<usize>,
    pub locks: Vec<Lock>,
    pub transaction_statuses: BTreeMap<TransactionId, TransactionStatus>,
    pub waiting_queue: Vec<WaitEntry>,
}

impl SimulationState {
    /// Initial state: no locks, nothing waiting, every transaction active.
    #[must_use]
    pub fn new(operations: &[Operation]) -> Self {
        Self {
            current_step_index: None,
            locks: Vec::new(),
            transaction_statuses: transaction_ids(operations)
                .into_iter()
                .map(|id| (id, TransactionStatus::Active))
                .collect(),
            waiting_queue: Vec::new(),
        }
    }

    /// Index of the next schedule operation to take.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.current_step_index.map_or(0, |index| index + 1)
    }

    #[must_use]
    pub fn status(&self, transaction: &TransactionId) -> TransactionStatus {
        self.transaction_statuses
            .get(transaction)
            .copied()
            .unwrap_or(TransactionStatus::Active)
    }

    /// Whether a request could be granted against the current lock table.
    ///
    /// Locks held by the requester itself never block it: a shared request
    /// needs every other holder to be shared, an exclusive request needs no
    /// other holder at all (which also covers upgrading its own shared lock).
    #[must_use]
    pub fn can_grant(&self, transaction: &TransactionId, variable: &str, mode: LockMode) -> bool {
        let mut others = self
            .locks
            .iter()
            .filter(|lock| lock.variable == variable && lock.transaction != *transaction);
        match mode {
            LockMode::Shared => others.all(|lock| lock.mode == LockMode::Shared),
            LockMode::Exclusive => others.next().is_none(),
        }
    }

    /// `true` when every operation has been taken and no waiting request
    /// can be granted.
    #[must_use]
    pub fn is_complete(&self, operations: &[Operation]) -> bool {
        self.next_index() >= operations.len()
            && !self
                .waiting_queue
                .iter()
                .any(|entry| self.can_grant(&entry.transaction, &entry.variable, entry.requested))
    }

    /// Snapshot the current state, running deadlock detection.
    #[must_use]
    pub fn snapshot(&self, operation: Option<Operation>, log: Vec<String>) -> SimulationStep {
        let mutual_wait = find_mutual_wait(&self.locks, &self.waiting_queue);
        let mut log = log;
        if let Some((a, b)) = &mutual_wait {
            log.push(format!("Deadlock: {a} and {b} are waiting for each other"));
        }
        SimulationStep {
            current_step_index: self.current_step_index,
            operation,
            locks: self.locks.clone(),
            transaction_statuses: self.transaction_statuses.clone(),
            waiting_queue: self.waiting_queue.clone(),
            log,
            is_deadlock: mutual_wait.is_some(),
            deadlocked: mutual_wait.map(|(a, b)| [a, b].into()).unwrap_or_default(),
        }
    }

    /// Perform one step.
    ///
    /// First the waiting queue is drained; if that grants anything, the
    /// drain is the whole step. Otherwise the next schedule operation is
    /// processed. Past the end of the schedule the step changes nothing and
    /// only logs that the simulation is complete.
    #[must_use]
    pub fn advance(mut self, operations: &[Operation]) -> (Self, SimulationStep) {
        let mut log = Vec::new();

        if self.drain_waiting(&mut log) > 0 {
            let step = self.snapshot(None, log);
            return (self, step);
        }

        let next = self.next_index();
        let Some(operation) = operations.get(next) else {
            if self.waiting_queue.is_empty() {
                log.push(String::from("Simulation complete"));
            } else {
                log.push(format!(
                    "Simulation complete: {} request(s) can never be granted",
                    self.waiting_queue.len()
                ));
            }
            let step = self.snapshot(None, log);
            return (self, step);
        };

        self.current_step_index = Some(next);
        self.process(operation, &mut log);
        let step = self.snapshot(Some(operation.clone()), log);
        (self, step)
    }

    fn set_status(&mut self, transaction: &TransactionId, status: TransactionStatus) {
        self.transaction_statuses.insert(transaction.clone(), status);
    }

    fn process(&mut self, operation: &Operation, log: &mut Vec<String>) {
        let transaction = &operation.transaction;
        let status = self.status(transaction);
        if status.is_finished() {
            log.push(format!("Skipped {operation}: {transaction} is already {status}"));
            return;
        }

        match &operation.action {
            Action::Read { variable } | Action::Write { variable } => {
                let mode = if matches!(operation.action, Action::Read { .. }) {
                    LockMode::Shared
                } else {
                    LockMode::Exclusive
                };
                if self.can_grant(transaction, variable, mode) {
                    self.grant(transaction, variable, mode);
                    log.push(format!("{transaction} granted {mode} lock on {variable} for {operation}"));
                    if status == TransactionStatus::Blocked {
                        self.set_status(transaction, TransactionStatus::Active);
                    }
                } else {
                    tracing::trace!(%transaction, %variable, %mode, "lock request queued");
                    self.set_status(transaction, TransactionStatus::Blocked);
                    log.push(format!(
                        "{transaction} blocked: {mode} lock on {variable} conflicts with {}",
                        self.holders(transaction, variable)
                    ));
                    self.waiting_queue.push(WaitEntry {
                        transaction: transaction.clone(),
                        operation: operation.clone(),
                        variable: variable.clone(),
                        requested: mode,
                    });
                }
            }
            Action::Commit | Action::Abort => {
                let aborted = matches!(operation.action, Action::Abort);
                let released = self.release_all(transaction);
                log.push(format!("{transaction} released {released} lock(s)"));
                if aborted {
                    let before = self.waiting_queue.len();
                    self.waiting_queue.retain(|entry| entry.transaction != *transaction);
                    let purged = before - self.waiting_queue.len();
                    if purged > 0 {
                        log.push(format!("{transaction} withdrew {purged} waiting request(s)"));
                    }
                }
                self.drain_waiting(log);
                if aborted {
                    self.set_status(transaction, TransactionStatus::Aborted);
                    log.push(format!("{transaction} aborted"));
                } else {
                    self.set_status(transaction, TransactionStatus::Committed);
                    log.push(format!("{transaction} committed"));
                }
            }
        }
    }

    /// Describe who holds `variable` besides `transaction`.
    fn holders(&self, transaction: &TransactionId, variable: &str) -> String {
        self.locks
            .iter()
            .filter(|lock| lock.variable == variable && lock.transaction != *transaction)
            .map(|lock| format!("{}({}) held by {}", lock.mode, lock.variable, lock.transaction))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Add a lock to the table. An exclusive grant replaces the holder's
    /// shared lock on the same variable; a request already covered by a
    /// held lock adds nothing.
    fn grant(&mut self, transaction: &TransactionId, variable: &str, mode: LockMode) {
        let held = self
            .locks
            .iter()
            .filter(|lock| lock.transaction == *transaction && lock.variable == variable)
            .map(|lock| lock.mode)
            .max();
        if held.is_some_and(|held| held >= mode) {
            return;
        }
        if mode == LockMode::Exclusive {
            self.locks
                .retain(|lock| !(lock.transaction == *transaction && lock.variable == variable));
        }
        self.locks.push(Lock {
            transaction: transaction.clone(),
            variable: variable.into(),
            mode,
        });
    }

    fn release_all(&mut self, transaction: &TransactionId) -> usize {
        let before = self.locks.len();
        self.locks.retain(|lock| lock.transaction != *transaction);
        before - self.locks.len()
    }

    /// Scan the waiting queue once, granting every request compatible with
    /// the lock table as it stands at that point. Returns the number granted.
    fn drain_waiting(&mut self, log: &mut Vec<String>) -> usize {
        let pending = core::mem::take(&mut self.waiting_queue);
        let mut granted: HashSet<TransactionId> = HashSet::new();
        let mut count = 0;

        for entry in pending {
            if self.can_grant(&entry.transaction, &entry.variable, entry.requested) {
                self.grant(&entry.transaction, &entry.variable, entry.requested);
                log.push(format!(
                    "{} granted waiting {} lock on {} for {}",
                    entry.transaction, entry.requested, entry.variable, entry.operation
                ));
                granted.insert(entry.transaction.clone());
                count += 1;
            } else {
                self.waiting_queue.push(entry);
            }
        }

        for transaction in granted {
            let still_waiting = self
                .waiting_queue
                .iter()
                .any(|entry| entry.transaction == transaction);
            if !still_waiting && self.status(&transaction) == TransactionStatus::Blocked {
                self.set_status(&transaction, TransactionStatus::Active);
            }
        }

        count
    }
}
