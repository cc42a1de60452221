//! Parser error types for Xbase++/Clipper

use serde::Serialize;
use thiserror::Error;

use crate::lexer::{Span, TokenKind};

/// A parser error with location information
///
/// Displays as `"<what> at <offset>"`, where the offset is the start of the
/// token the parser was looking at when it gave up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    /// The kind of error
    pub kind: ParseErrorKind,
    /// Source location where the error occurred
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error
    #[must_use]
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Byte offset reported in the message
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.span.start
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.offset())
    }
}

impl std::error::Error for ParseError {}

/// The kind of parse error
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ParseErrorKind {
    #[error("Unexpected {0}")]
    Unexpected(TokenKind),

    #[error("Expected expression, found {0}")]
    ExpectedExpression(TokenKind),

    #[error("Expected identifier after {0}")]
    ExpectedIdentifier(&'static str),

    #[error("Expected {expected} after {context}")]
    ExpectedAfter {
        expected: TokenKind,
        context: &'static str,
    },

    #[error("Expected {closer} to close {opener}")]
    ExpectedClosing {
        closer: TokenKind,
        opener: TokenKind,
    },

    #[error("Invalid token '{0}'")]
    InvalidToken(String),

    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("Nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}
