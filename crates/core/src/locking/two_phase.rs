//! Two-phase-locking compliance of a schedule, per transaction.
//!
//! Every transaction is replayed against the **whole** schedule, since
//! whether it could have followed a locking discipline depends on what the
//! other transactions did to the same variables in the meantime.
//!
//! - **Basic 2PL**: no lock is acquired once the transaction's
//!   [`PhaseMachine`] has moved to shrinking.
//! - **Strict 2PL**: basic, and no other transaction touches a variable
//!   this one wrote until this one commits or aborts.
//! - **Rigorous 2PL**: strict, and the same holds for every lock (shared or
//!   exclusive): no incompatible access by others before termination.
//! - **Conservative 2PL** is reported as basic. Pre-claiming all locks up
//!   front leaves no trace in the notation, so it cannot be checked.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Result};

use crate::locking::phase::{LockPhase, PhaseMachine, PhaseTrigger};
use crate::locking::LockMode;
use crate::recoverability::RecoverabilityReport;
use crate::schedule::types::{Operation, OperationKind, TransactionId};

/// The locking disciplines that can be violated.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Basic,
    Strict,
    Rigorous,
}

impl Display for Discipline {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::Basic => f.write_str("basic 2PL"),
            Self::Strict => f.write_str("strict 2PL"),
            Self::Rigorous => f.write_str("rigorous 2PL"),
        }
    }
}

/// Why an event breaks a discipline.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A lock was requested after the shrinking phase began.
    AcquireAfterRelease,
    /// Another transaction got in before this one terminated.
    ReleasedBeforeTermination(Discipline),
    /// The transaction never commits or aborts, so its locks are never
    /// released at termination.
    Unterminated(Discipline),
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::AcquireAfterRelease => {
                write!(f, "lock acquired in shrinking phase ({})", Discipline::Basic)
            }
            Self::ReleasedBeforeTermination(discipline) => {
                write!(f, "lock released before commit/abort ({discipline})")
            }
            Self::Unterminated(discipline) => {
                write!(f, "transaction never commits or aborts ({discipline})")
            }
        }
    }
}

/// What happened to a transaction's locks at one step.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEventKind {
    /// The transaction's own read or write takes a lock.
    Acquire { mode: LockMode, variable: String },
    /// The transaction's commit or abort releases everything.
    ReleaseAll { aborted: bool },
    /// Another transaction's access implies the lock was already released.
    ImplicitRelease {
        mode: LockMode,
        variable: String,
        by: TransactionId,
    },
    /// Another transaction accessed a variable this one should still hold.
    EarlyAccess {
        held: LockMode,
        variable: String,
        by: TransactionId,
    },
    /// Accesses exist but no commit or abort follows.
    MissingTermination,
    /// The transaction has no operations in the schedule.
    NoOperations,
}

impl Display for LockEventKind {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::Acquire { mode, variable } => write!(f, "acquire {mode} lock on {variable}"),
            Self::ReleaseAll { aborted: false } => f.write_str("commit releases all locks"),
            Self::ReleaseAll { aborted: true } => f.write_str("abort releases all locks"),
            Self::ImplicitRelease { mode, variable, by } => write!(
                f,
                "implicit release of {mode} lock on {variable} (conflicting access by {by})"
            ),
            Self::EarlyAccess { held, variable, by } => {
                write!(f, "{by} accesses {variable} while {held} lock should be held")
            }
            Self::MissingTermination => f.write_str("no commit or abort follows"),
            Self::NoOperations => f.write_str("no operations"),
        }
    }
}

/// One entry of a transaction's lock audit trail.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPhaseEvent {
    pub step: usize,
    /// Text of the operation that produced the event (possibly another
    /// transaction's).
    pub op_text: String,
    /// Human-readable description, with the violation appended if any.
    pub action: String,
    pub phase: LockPhase,
    pub kind: LockEventKind,
    pub violation: Option<Violation>,
}

impl LockPhaseEvent {
    fn new(
        op: &Operation,
        kind: LockEventKind,
        phase: LockPhase,
        violation: Option<Violation>,
    ) -> Self {
        let action = violation.map_or_else(
            || kind.to_string(),
            |violation| format!("{kind}; VIOLATION: {violation}"),
        );
        Self {
            step: op.step,
            op_text: op.text.clone(),
            action,
            phase,
            kind,
            violation,
        }
    }

    /// Stub entry for a transaction that does nothing in the schedule.
    fn no_operations() -> Self {
        let kind = LockEventKind::NoOperations;
        Self {
            step: 0,
            op_text: String::new(),
            action: kind.to_string(),
            phase: LockPhase::Growing,
            kind,
            violation: None,
        }
    }
}

/// Compliance flags and audit trail of one transaction.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCompliance {
    pub basic_2pl: bool,
    pub strict_2pl: bool,
    pub rigorous_2pl: bool,
    /// Same as `basic_2pl`; pre-claiming cannot be observed.
    pub conservative_2pl: bool,
    /// Sorted by step.
    pub lock_phase_events: Vec<LockPhaseEvent>,
}

/// 2PL compliance of every transaction, plus the cascadelessness verdict.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoPhaseLockingReport {
    pub transaction_compliance: BTreeMap<TransactionId, TransactionCompliance>,
    pub is_cascadeless: bool,
    pub allows_cascading_aborts: bool,
}

/// What one transaction's phase machine observes at a step.
enum Observation<'a> {
    /// Its own read or write.
    Acquire {
        op: &'a Operation,
        variable: &'a str,
        mode: LockMode,
    },
    /// Its own commit or abort.
    Terminate { op: &'a Operation },
    /// Another transaction's read or write.
    Foreign {
        op: &'a Operation,
        variable: &'a str,
        mode: LockMode,
    },
}

fn observe<'a>(id: &TransactionId, op: &'a Operation) -> Option<Observation<'a>> {
    let access = op.variable().zip(op.lock_mode());
    match (op.transaction == *id, access) {
        (true, Some((variable, mode))) => Some(Observation::Acquire { op, variable, mode }),
        (true, None) => Some(Observation::Terminate { op }),
        (false, Some((variable, mode))) => Some(Observation::Foreign { op, variable, mode }),
        (false, None) => None,
    }
}

/// Check every transaction in `transactions` against the four 2PL variants.
///
/// Transactions with no operations in the schedule get a vacuously
/// compliant entry whose audit trail is a single
/// [`LockEventKind::NoOperations`] stub. The cascadelessness flags are
/// copied from `recoverability`.
#[must_use]
pub fn analyze_two_phase_locking(
    operations: &[Operation],
    transactions: &[TransactionId],
    recoverability: &RecoverabilityReport,
) -> TwoPhaseLockingReport {
    let mut schedule: Vec<&Operation> = operations.iter().collect();
    schedule.sort_by_key(|op| op.step);

    let transaction_compliance: BTreeMap<TransactionId, TransactionCompliance> = transactions
        .iter()
        .map(|id| (id.clone(), transaction_compliance(id, &schedule)))
        .collect();

    let is_cascadeless = recoverability.is_cascadeless;

    tracing::debug!(
        transactions = transaction_compliance.len(),
        basic_violations = transaction_compliance
            .values()
            .filter(|c| !c.basic_2pl)
            .count(),
        is_cascadeless,
        "analyzed two-phase locking"
    );

    TwoPhaseLockingReport {
        transaction_compliance,
        is_cascadeless,
        allows_cascading_aborts: !is_cascadeless,
    }
}

fn transaction_compliance(id: &TransactionId, schedule: &[&Operation]) -> TransactionCompliance {
    if !schedule.iter().any(|op| op.transaction == *id) {
        return TransactionCompliance {
            basic_2pl: true,
            strict_2pl: true,
            rigorous_2pl: true,
            conservative_2pl: true,
            lock_phase_events: vec![LockPhaseEvent::no_operations()],
        };
    }

    let mut events = Vec::new();
    let (basic, machine) = replay_phases(id, schedule, &mut events);

    let termination = schedule
        .iter()
        .find(|op| op.transaction == *id && op.is_termination())
        .map(|op| op.step);

    let strict = basic
        && holds_until_termination(
            id,
            schedule,
            termination,
            Discipline::Strict,
            &machine,
            &mut events,
        );
    let rigorous = strict
        && holds_until_termination(
            id,
            schedule,
            termination,
            Discipline::Rigorous,
            &machine,
            &mut events,
        );

    events.sort_by_key(|event| event.step);

    TransactionCompliance {
        basic_2pl: basic,
        strict_2pl: strict,
        rigorous_2pl: rigorous,
        conservative_2pl: basic,
        lock_phase_events: events,
    }
}

/// Drive the phase machine of `id` over the schedule. Stops at the first
/// acquisition in the shrinking phase and reports basic 2PL as failed.
fn replay_phases(
    id: &TransactionId,
    schedule: &[&Operation],
    events: &mut Vec<LockPhaseEvent>,
) -> (bool, PhaseMachine) {
    let mut machine = PhaseMachine::new();
    let mut held: BTreeMap<&str, LockMode> = BTreeMap::new();

    for observation in schedule.iter().copied().filter_map(|op| observe(id, op)) {
        match observation {
            Observation::Acquire { op, variable, mode } => {
                let kind = LockEventKind::Acquire {
                    mode,
                    variable: variable.into(),
                };
                if machine.phase() == LockPhase::Shrinking {
                    tracing::trace!(%id, step = op.step, "acquisition after release");
                    events.push(LockPhaseEvent::new(
                        op,
                        kind,
                        LockPhase::Shrinking,
                        Some(Violation::AcquireAfterRelease),
                    ));
                    return (false, machine);
                }
                held.entry(variable)
                    .and_modify(|current| *current = (*current).max(mode))
                    .or_insert(mode);
                events.push(LockPhaseEvent::new(op, kind, LockPhase::Growing, None));
            }
            Observation::Terminate { op } => {
                machine.fire(PhaseTrigger::Termination { step: op.step });
                held.clear();
                let kind = LockEventKind::ReleaseAll {
                    aborted: op.kind() == OperationKind::Abort,
                };
                events.push(LockPhaseEvent::new(op, kind, LockPhase::Shrinking, None));
            }
            Observation::Foreign { op, variable, mode } => {
                if machine.phase() == LockPhase::Shrinking {
                    continue;
                }
                let Some(&held_mode) = held.get(variable) else {
                    continue;
                };
                if held_mode.is_compatible_with(mode) {
                    continue;
                }
                machine.fire(PhaseTrigger::ConflictingAccess {
                    step: op.step,
                    by: op.transaction.clone(),
                    variable: variable.into(),
                    held: held_mode,
                });
                let kind = LockEventKind::ImplicitRelease {
                    mode: held_mode,
                    variable: variable.into(),
                    by: op.transaction.clone(),
                };
                events.push(LockPhaseEvent::new(op, kind, LockPhase::Shrinking, None));
            }
        }
    }

    (true, machine)
}

/// Check that locks taken by `id` (exclusive only for strict, all for
/// rigorous) are not bypassed by another transaction before `id`
/// terminates.
fn holds_until_termination(
    id: &TransactionId,
    schedule: &[&Operation],
    termination: Option<usize>,
    discipline: Discipline,
    machine: &PhaseMachine,
    events: &mut Vec<LockPhaseEvent>,
) -> bool {
    let locks: Vec<(usize, &str, LockMode)> = schedule
        .iter()
        .copied()
        .filter(|op| op.transaction == *id)
        .filter_map(|op| Some((op.step, op.variable()?, op.lock_mode()?)))
        .filter(|(_, _, mode)| discipline == Discipline::Rigorous || *mode == LockMode::Exclusive)
        .collect();

    let Some(last_lock) = locks.last() else {
        return true;
    };

    let Some(end) = termination else {
        if let Some(op) = schedule.iter().find(|op| op.step == last_lock.0) {
            events.push(LockPhaseEvent::new(
                op,
                LockEventKind::MissingTermination,
                machine.phase_at(op.step),
                Some(Violation::Unterminated(discipline)),
            ));
        }
        return false;
    };

    let mut compliant = true;
    for op in schedule {
        if op.transaction == *id || op.step >= end {
            continue;
        }
        let (Some(variable), Some(mode)) = (op.variable(), op.lock_mode()) else {
            continue;
        };
        let held = locks
            .iter()
            .filter(|(step, locked, _)| *step < op.step && *locked == variable)
            .map(|(_, _, held)| *held)
            .max();
        if let Some(held) = held.filter(|held| !held.is_compatible_with(mode)) {
            compliant = false;
            events.push(LockPhaseEvent::new(
                op,
                LockEventKind::EarlyAccess {
                    held,
                    variable: variable.into(),
                    by: op.transaction.clone(),
                },
                machine.phase_at(op.step),
                Some(Violation::ReleasedBeforeTermination(discipline)),
            ));
        }
    }

    compliant
}
