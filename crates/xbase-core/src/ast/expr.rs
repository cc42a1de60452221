//! Expression AST nodes for Xbase++/Clipper

use serde::Serialize;

use crate::lexer::{Span, TokenKind};

use super::{Ident, Spanned};

/// Name given to the placeholder identifier inserted during error recovery
pub const MISSING: &str = "<missing>";

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    // Arithmetic
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,

    // Comparison
    /// Equal (=)
    Eq,
    /// Exactly equal (==)
    ExactEq,
    /// Not equal (!=, #, <>)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Substring containment ($)
    Contains,

    // Logical
    /// Logical AND (.and.)
    And,
    /// Logical OR (.or.)
    Or,
}

impl BinOp {
    /// The binary operator a token stands for in infix position
    #[must_use]
    pub const fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Sub,
            TokenKind::Star => Self::Mul,
            TokenKind::Slash => Self::Div,
            TokenKind::Percent => Self::Mod,
            TokenKind::Eq => Self::Eq,
            TokenKind::EqEq => Self::ExactEq,
            TokenKind::NotEq => Self::Ne,
            TokenKind::Lt => Self::Lt,
            TokenKind::LtEq => Self::Le,
            TokenKind::Gt => Self::Gt,
            TokenKind::GtEq => Self::Ge,
            TokenKind::Dollar => Self::Contains,
            TokenKind::And => Self::And,
            TokenKind::Or => Self::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the precedence of the operator (higher = binds tighter)
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::ExactEq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Contains => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        }
    }

    /// Returns the symbol representation of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "=",
            BinOp::ExactEq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Contains => "$",
            BinOp::And => ".and.",
            BinOp::Or => ".or.",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+)
    Plus,
    /// Logical NOT (!, .not.)
    Not,
}

impl UnaryOp {
    /// Returns the symbol representation of the operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

/// Literal categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralKind {
    Number,
    String,
    Nil,
    Boolean,
}

/// A literal value, kept as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Source text for numbers, decoded content for strings, `NIL`,
    /// `.T.` or `.F.`
    pub raw: String,
}

/// An expression with source location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    /// The kind of expression
    pub kind: ExprKind,
    /// Source location
    pub span: Span,
}

impl Expr {
    /// Create a new expression
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create a literal expression
    #[must_use]
    pub fn literal(kind: LiteralKind, raw: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Literal(Literal { kind, raw: raw.into() }), span)
    }

    /// Create an identifier expression
    #[must_use]
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Ident(Ident::new(name, span)), span)
    }

    /// Placeholder standing in for an expression that could not be parsed
    #[must_use]
    pub fn missing(offset: u32) -> Self {
        Self::ident(MISSING, Span::empty(offset))
    }

    /// Returns true if this is a recovery placeholder
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(&self.kind, ExprKind::Ident(ident) if ident.name == MISSING)
    }

    /// Returns true if the expression can appear on the left of `:=`
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Ident(_) | ExprKind::Index { .. } | ExprKind::Send { .. } | ExprKind::Alias { .. }
        )
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

/// The kind of expression (without source location)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// Literal value (42, "text", NIL, .T.)
    Literal(Literal),

    /// Identifier reference, including `::name`
    Ident(Ident),

    /// Prefix operation (-x, !lDone)
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (a + b, x = y, cSub $ cText)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call (QOut(x))
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Array element (aItems[i])
    Index { target: Box<Expr>, index: Box<Expr> },

    /// Array literal ({1, 2, 3})
    Array(Vec<Expr>),

    /// Message send (oObj:Method(x), oObj:Prop)
    Send {
        receiver: Box<Expr>,
        method: Ident,
        /// `None` when no parentheses follow the message name
        args: Option<Vec<Expr>>,
    },

    /// Work area field (Customer->Name)
    Alias { area: Box<Expr>, field: Ident },

    /// Code block ({|a, b| a + b})
    CodeBlock { params: Vec<Ident>, body: Vec<Expr> },
}
