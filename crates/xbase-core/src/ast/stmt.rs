//! Statement AST nodes for Xbase++/Clipper

use serde::Serialize;

use crate::lexer::{Span, TokenKind};

use super::{Block, Expr, Ident, Spanned};

/// A statement with source location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    /// The kind of statement
    pub kind: StmtKind,
    /// Source location
    pub span: Span,
}

impl Stmt {
    /// Create a new statement
    #[must_use]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an expression statement
    #[must_use]
    pub fn expr(expr: Expr, span: Span) -> Self {
        Self::new(StmtKind::Expr(expr), span)
    }
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

/// The kind of statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    /// Expression statement (QOut(x))
    Expr(Expr),

    /// Assignment statement (x := value, a[1] := value)
    Assign {
        /// Assignment target
        target: Expr,
        /// New value
        value: Expr,
    },

    /// Compound assignment (n += 1, cPath += '\')
    CompoundAssign {
        /// Assignment target
        target: Expr,
        /// Operator (+, -, *, /)
        op: CompoundOp,
        /// Value to apply
        value: Expr,
    },

    /// `? a, b` prints with a leading newline, `?? a` without
    Print { newline: bool, exprs: Vec<Expr> },

    /// LOCAL or STATIC variable declaration
    Local {
        storage: Storage,
        bindings: Vec<Binding>,
    },

    /// Return statement (RETURN, RETURN value)
    Return(Option<Expr>),

    /// IF/ELSEIF/ELSE/ENDIF; each ELSEIF is a nested `If` alone in `else_block`
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },

    /// WHILE/DO WHILE ... ENDDO
    While { cond: Expr, body: Block },

    /// FOR var := start TO end [STEP step] ... NEXT
    For {
        var: Ident,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },

    /// FUNCTION declaration
    Function(Routine),

    /// PROCEDURE declaration
    Procedure(Routine),

    /// Leave the innermost loop
    Exit,

    /// Continue with the next iteration of the innermost loop
    Loop,
}

/// Compound assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompoundOp {
    /// +=
    Add,
    /// -=
    Sub,
    /// *=
    Mul,
    /// /=
    Div,
}

impl CompoundOp {
    /// The compound operator a token stands for
    #[must_use]
    pub const fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::PlusEq => Some(Self::Add),
            TokenKind::MinusEq => Some(Self::Sub),
            TokenKind::StarEq => Some(Self::Mul),
            TokenKind::SlashEq => Some(Self::Div),
            _ => None,
        }
    }

    /// Returns the symbol representation of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CompoundOp::Add => "+=",
            CompoundOp::Sub => "-=",
            CompoundOp::Mul => "*=",
            CompoundOp::Div => "/=",
        }
    }
}

/// Storage class of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Storage {
    Local,
    Static,
}

impl Storage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Storage::Local => "LOCAL",
            Storage::Static => "STATIC",
        }
    }
}

/// One declared name with an optional initializer (`nCount := 0`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub name: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

impl Spanned for Binding {
    fn span(&self) -> Span {
        self.span
    }
}

/// A FUNCTION or PROCEDURE
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routine {
    /// Routine name
    pub name: Ident,
    /// Parameter names in declaration order
    pub params: Vec<Ident>,
    /// Statements up to the closing keyword or the next routine header
    pub body: Block,
    /// Declared with a leading STATIC
    pub is_static: bool,
}
