//! Logos-based lexer for schedule text.
//!
//! A schedule is a list of operation tokens separated by any mix of commas,
//! semicolons and whitespace:
//!
//! ```text
//! R1(X), W2(X); r2(y)
//! C1 A2
//! ```
//!
//! The lexer only splits; whether a token is a well-formed operation is
//! decided by the parser.

use std::ops::Range;

/// All token kinds produced by the schedule lexer.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(::logos::Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of `,`, `;` or whitespace. Emitted so the tokenizer can drive
    /// syntax highlighting with exact positions.
    #[regex(r"[,;\s]+")]
    Separator,

    /// Anything between separators, e.g. `R1(X)` or `C2`.
    #[regex(r"[^,;\s]+")]
    Operation,
}

/// A single token with its kind and the byte-offset span in the source.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range `start..end` into the original input string.
    pub span: Range<usize>,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Return the source text for this token given the original input.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span.clone()]
    }
}

/// Tokenize `input` into separators and operation candidates.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|kind| Token { kind, span }))
        .collect()
}

/// Tokenize `input` and return tokens paired with their source text slices.
#[must_use]
pub fn tokenize_with_text(input: &str) -> Vec<(Token, &str)> {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(result, span)| {
            result.ok().map(|kind| {
                let text = &input[span.clone()];
                (Token { kind, span }, text)
            })
        })
        .collect()
}
