use alloc::format;
use alloc::string::String;
use core::cmp::Ordering;
use core::fmt::{Display, Formatter, Result};

use crate::locking::LockMode;

/// Identifies a transaction by the digits written after the action letter.
///
/// `R12(X)` belongs to transaction `T12`. The digits are kept exactly as
/// written, so `R01(X)` and `R1(X)` name different transactions and ids of
/// any length are accepted. Ordering is numeric, with leading zeros breaking
/// ties (`T1 < T01 < T2 < T10`).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Builds an id from its digits. Returns `None` unless `digits` is a
    /// non-empty run of ASCII digits.
    #[must_use]
    pub fn new(digits: &str) -> Option<Self> {
        (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(digits.into()))
    }

    /// The digits as written, without the `T` prefix.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    fn significant(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl From<u64> for TransactionId {
    fn from(number: u64) -> Self {
        Self(format!("{number}"))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.cmp(b))
            .then_with(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "T{}", self.0)
    }
}

/// The four operation types of the schedule notation.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Write,
    Commit,
    Abort,
}

impl OperationKind {
    /// The letter used for this kind in schedule text.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Read => 'R',
            Self::Write => 'W',
            Self::Commit => 'C',
            Self::Abort => 'A',
        }
    }
}

/// What an operation does. Only reads and writes name a variable.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Read { variable: String },
    Write { variable: String },
    Commit,
    Abort,
}

impl Action {
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Read { .. } => OperationKind::Read,
            Self::Write { .. } => OperationKind::Write,
            Self::Commit => OperationKind::Commit,
            Self::Abort => OperationKind::Abort,
        }
    }

    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Read { variable } | Self::Write { variable } => Some(variable.as_str()),
            Self::Commit | Self::Abort => None,
        }
    }
}

/// One parsed step of a schedule.
///
/// `step` is the 0-based position among the valid operations of the
/// schedule and is the only ordering key used by the analyses. It also
/// serves as the operation's identity.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub step: usize,
    pub transaction: TransactionId,
    pub action: Action,
    /// The token this operation was parsed from, upper-cased.
    pub text: String,
}

impl Operation {
    /// Builds an operation whose text is the canonical rendering of `action`.
    #[must_use]
    pub fn new(step: usize, transaction: TransactionId, action: Action) -> Self {
        let text = canonical_text(&transaction, &action);
        Self {
            step,
            transaction,
            action,
            text,
        }
    }

    #[must_use]
    pub fn read(step: usize, transaction: u64, variable: &str) -> Self {
        Self::new(
            step,
            TransactionId::from(transaction),
            Action::Read {
                variable: variable.into(),
            },
        )
    }

    #[must_use]
    pub fn write(step: usize, transaction: u64, variable: &str) -> Self {
        Self::new(
            step,
            TransactionId::from(transaction),
            Action::Write {
                variable: variable.into(),
            },
        )
    }

    #[must_use]
    pub fn commit(step: usize, transaction: u64) -> Self {
        Self::new(step, TransactionId::from(transaction), Action::Commit)
    }

    #[must_use]
    pub fn abort(step: usize, transaction: u64) -> Self {
        Self::new(step, TransactionId::from(transaction), Action::Abort)
    }

    /// Replaces the display text, keeping everything else.
    #[must_use]
    pub fn with_text(mut self, text: String) -> Self {
        self.text = text;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.action.kind()
    }

    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        self.action.variable()
    }

    /// `true` for reads and writes.
    #[must_use]
    pub const fn is_access(&self) -> bool {
        matches!(self.action, Action::Read { .. } | Action::Write { .. })
    }

    /// `true` for commits and aborts.
    #[must_use]
    pub const fn is_termination(&self) -> bool {
        matches!(self.action, Action::Commit | Action::Abort)
    }

    /// Lock a lock-based scheduler needs before running this operation:
    /// shared for reads, exclusive for writes, none for terminations.
    #[must_use]
    pub const fn lock_mode(&self) -> Option<LockMode> {
        match self.action {
            Action::Read { .. } => Some(LockMode::Shared),
            Action::Write { .. } => Some(LockMode::Exclusive),
            Action::Commit | Action::Abort => None,
        }
    }

    /// Canonical text, e.g. `R1(X)` or `C2`, independent of how it was written.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        canonical_text(&self.transaction, &self.action)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter) -> Result {
        f.write_str(&self.text)
    }
}

fn canonical_text(transaction: &TransactionId, action: &Action) -> String {
    let letter = action.kind().letter();
    match action.variable() {
        Some(variable) => format!("{letter}{}({variable})", transaction.0),
        None => format!("{letter}{}", transaction.0),
    }
}
