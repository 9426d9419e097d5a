//! Winnow-based grammar for a single operation token.
//!
//! Grammar (applied to the upper-cased token):
//! ```text
//! operation   = access | termination
//! access      = ("R" | "W") transaction "(" variable ")"
//! termination = ("C" | "A") transaction
//! transaction = DIGIT+
//! variable    = (any char except ")")+
//! ```
//!
//! Tokens come from [`crate::lexer`]. A token that does not match is
//! dropped and reported as a [`ParseWarning`]; parsing never fails.

use std::ops::Range;

use schedcheck_core::{Action, Operation, TransactionId};
use winnow::ascii::digit1;
use winnow::combinator::{delimited, eof, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};
use winnow::ModalResult;

use crate::lexer::{tokenize, TokenKind};

/// Why a token was dropped.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Not of the form letter, number, optional `(variable)`.
    Malformed,
    /// A read or write without a variable.
    MissingVariable,
    /// A commit or abort with a variable.
    UnexpectedVariable,
}

impl core::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => f.write_str("malformed operation"),
            Self::MissingVariable => f.write_str("read/write needs a variable"),
            Self::UnexpectedVariable => f.write_str("commit/abort takes no variable"),
        }
    }
}

/// A dropped token with human-readable location information.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// The token as written.
    pub token: String,
    /// Position among all operation tokens, valid or not.
    pub index: usize,
    pub span: Range<usize>,
    pub line: usize,
    pub column: usize,
    pub kind: WarningKind,
}

impl core::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "line {}, column {}: {} `{}` (ignored)",
            self.line, self.column, self.kind, self.token
        )
    }
}

impl std::error::Error for ParseWarning {}

/// Operations in schedule order plus every token that was dropped.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub operations: Vec<Operation>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedSchedule {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parse schedule text.
///
/// Every token is upper-cased before matching, so `r1(x)` reads `X`.
/// Operations are numbered by their position among the *valid* tokens.
/// Empty or blank input gives an empty schedule.
#[must_use]
pub fn parse_schedule(input: &str) -> ParsedSchedule {
    let mut parsed = ParsedSchedule::default();

    let candidates = tokenize(input)
        .into_iter()
        .filter(|token| token.kind == TokenKind::Operation);

    for (index, token) in candidates.enumerate() {
        let written = token.text(input);
        let text = written.to_uppercase();
        match operation(&text) {
            Ok((transaction, action)) => {
                let step = parsed.operations.len();
                parsed
                    .operations
                    .push(Operation::new(step, transaction, action).with_text(text));
            }
            Err(kind) => {
                let (line, column) = offset_to_line_col(input, token.span.start);
                tracing::debug!(token = written, line, column, %kind, "dropped token");
                parsed.warnings.push(ParseWarning {
                    token: written.to_string(),
                    index,
                    span: token.span,
                    line,
                    column,
                    kind,
                });
            }
        }
    }

    tracing::debug!(
        operations = parsed.operations.len(),
        warnings = parsed.warnings.len(),
        "parsed schedule"
    );
    parsed
}

// ---------------------------------------------------------------------------
// Line/column helper
// ---------------------------------------------------------------------------

/// Convert a byte offset into the original input to 1-based (line, column).
fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let prefix = &input[..offset.min(input.len())];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = prefix
        .rfind('\n')
        .map_or_else(|| prefix.len() + 1, |pos| prefix.len() - pos);
    (line, column)
}

// ---------------------------------------------------------------------------
// Token grammar
// ---------------------------------------------------------------------------

struct RawOperation<'s> {
    letter: char,
    transaction: &'s str,
    variable: Option<&'s str>,
}

/// `letter DIGIT+ ("(" variable ")")? EOF`
fn raw_operation<'s>(input: &mut &'s str) -> ModalResult<RawOperation<'s>> {
    let letter = one_of(['R', 'W', 'C', 'A']).parse_next(input)?;
    // Digits are kept as written, so there is no length limit and `R01(X)`
    // belongs to T01, not T1.
    let transaction = digit1.parse_next(input)?;
    let variable = opt(delimited(
        '(',
        take_while(1.., |c: char| c != ')'),
        ')',
    ))
    .parse_next(input)?;
    eof.parse_next(input)?;
    Ok(RawOperation {
        letter,
        transaction,
        variable,
    })
}

/// Match one upper-cased token and check that only reads and writes name a
/// variable.
fn operation(text: &str) -> Result<(TransactionId, Action), WarningKind> {
    let mut stream = text;
    let raw = raw_operation
        .parse_next(&mut stream)
        .map_err(|_| WarningKind::Malformed)?;
    let action = match (raw.letter, raw.variable) {
        ('R', Some(variable)) => Action::Read {
            variable: variable.to_string(),
        },
        ('W', Some(variable)) => Action::Write {
            variable: variable.to_string(),
        },
        ('C', None) => Action::Commit,
        ('A', None) => Action::Abort,
        ('R' | 'W', None) => return Err(WarningKind::MissingVariable),
        ('C' | 'A', Some(_)) => return Err(WarningKind::UnexpectedVariable),
        _ => return Err(WarningKind::Malformed),
    };
    let transaction = TransactionId::new(raw.transaction).ok_or(WarningKind::Malformed)?;
    Ok((transaction, action))
}
