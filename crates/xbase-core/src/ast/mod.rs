//! Syntax tree for Xbase++/Clipper source code
//!
//! Every node carries the [`Span`] of the source it was parsed from, in
//! original-source coordinates. A node's span always lies inside its
//! parent's span. Trees are built once by the parser and never mutated.

mod expr;
mod pretty;
mod stmt;

pub use expr::*;
pub use stmt::*;

use serde::Serialize;

// Re-export Span from lexer for convenience
pub use crate::lexer::Span;

/// A trait for AST nodes that have associated source location information
pub trait Spanned {
    /// Returns the source span of this node
    fn span(&self) -> Span;
}

/// An identifier with its source location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ident {
    /// The identifier as written (`::name` for scoped self references)
    pub name: String,
    /// Source location
    pub span: Span,
}

impl Ident {
    /// Create a new identifier
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl Spanned for Ident {
    fn span(&self) -> Span {
        self.span
    }
}

/// An ordered run of statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// The statements in the block
    pub stmts: Vec<Stmt>,
    /// Source location of the whole block
    pub span: Span,
}

impl Block {
    /// Create a new block
    #[must_use]
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

impl Spanned for Block {
    fn span(&self) -> Span {
        self.span
    }
}

/// Root of a parsed source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    /// Top-level statements, including routine declarations
    pub stmts: Vec<Stmt>,
    /// Source location of the program
    pub span: Span,
}

impl Program {
    /// Create a new program
    #[must_use]
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }

    /// Top-level FUNCTION and PROCEDURE declarations, in source order
    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.stmts.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Function(routine) | StmtKind::Procedure(routine) => Some(routine),
            _ => None,
        })
    }
}

impl Spanned for Program {
    fn span(&self) -> Span {
        self.span
    }
}
