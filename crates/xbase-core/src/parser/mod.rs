//! Parser for Xbase++/Clipper source code
//!
//! Statements are parsed by recursive descent and expressions by precedence
//! climbing. The parser never fails: a missing piece is recorded as a
//! [`ParseError`], replaced by a placeholder identifier (`<missing>`), and
//! parsing resumes at the next statement boundary. A [`Program`] is always
//! produced.
//!
//! # Example
//!
//! ```
//! use xbase_core::parser::parse_source;
//!
//! let result = parse_source("if 1 then return 2;");
//! assert_eq!(result.program.stmts.len(), 1);
//! assert_eq!(result.messages(), vec!["Expected ENDIF to close IF at 19"]);
//! ```

mod error;

pub use error::{ParseError, ParseErrorKind};

use serde::Serialize;

use crate::ast::{
    BinOp, Binding, Block, CompoundOp, Expr, ExprKind, Ident, LiteralKind, Program, Routine,
    Stmt, StmtKind, Storage, UnaryOp, MISSING,
};
use crate::lexer::{Lexer, Span, Token, TokenKind};

/// Output of a parse: the tree plus every syntax error, in source order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Human-readable diagnostics (`"<what> at <offset>"`)
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Returns true if any syntax error was recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Tokens at which error recovery stops
const SYNC_TOKENS: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::EndIf,
    TokenKind::Else,
    TokenKind::ElseIf,
    TokenKind::EndDo,
    TokenKind::Next,
    TokenKind::EndFunction,
    TokenKind::EndProc,
    TokenKind::Function,
    TokenKind::Procedure,
    TokenKind::Eof,
];

/// Deepest nesting of expressions and blocks the parser descends into
pub const MAX_NESTING: usize = 100;

/// The Xbase parser
///
/// Owns the token vector and its cursor; one instance serves one parse.
pub struct Parser {
    /// All tokens, always ending with EOF
    tokens: Vec<Token>,
    /// Current position in the token stream
    position: usize,
    /// End offset of the last consumed token
    prev_end: u32,
    /// Collected parse errors
    errors: Vec<ParseError>,
    /// Set after resynchronizing; cleared at the next statement
    recovering: bool,
    /// Current nesting depth, bounded by [`MAX_NESTING`]
    depth: usize,
    /// Set once nesting overflowed and the rest of the input was dropped
    too_deep: bool,
}

impl Parser {
    /// Create a parser over a token stream
    ///
    /// An EOF token is appended if the stream does not already end with one.
    #[must_use]
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token::new(TokenKind::Eof, Span::empty(end), ""));
        }
        Self {
            tokens,
            position: 0,
            prev_end: 0,
            errors: Vec::new(),
            recovering: false,
            depth: 0,
            too_deep: false,
        }
    }

    /// Parse the whole token stream into a program
    #[must_use]
    pub fn parse_program(mut self) -> ParseResult {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            let before = self.position;
            if let Some(stmt) = self.statement() {
                stmts.push(stmt);
            }
            self.ensure_progress(before);
        }

        let span = Span::new(0, self.current().span.end);
        log::debug!(
            "parsed {} top-level statements from {} tokens ({} syntax errors)",
            stmts.len(),
            self.tokens.len(),
            self.errors.len()
        );
        ParseResult {
            program: Program::new(stmts, span),
            errors: self.errors,
        }
    }

    /// Parse a single expression; anything left over is reported
    #[must_use]
    pub fn parse_expression(source: &str) -> (Expr, Vec<ParseError>) {
        let mut parser = Parser::new(Lexer::tokenize(source).0);
        let expr = parser.expression();
        parser.eat(TokenKind::Semicolon);
        if !parser.is_eof() && !parser.recovering {
            let token = parser.current();
            let error = ParseError::new(ParseErrorKind::Unexpected(token.kind), token.span);
            parser.errors.push(error);
        }
        (expr, parser.errors)
    }

    // ==================== Token Management ====================

    /// Get the current token
    fn current(&self) -> &Token {
        // `new` guarantees a trailing EOF and `advance` never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    /// Get the current token kind
    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Kind of the token after the current one
    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.position + 1)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    /// Check if we're at end of file
    fn is_eof(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    /// Advance to the next token, returning the consumed one
    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
            self.prev_end = token.span.end;
        }
        token
    }

    /// Check if the current token matches a kind
    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    /// Consume a token if it matches, returning it
    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume `kind` or report it missing and resynchronize
    fn expect(&mut self, kind: TokenKind, context: &'static str) {
        if self.eat(kind).is_none() {
            self.fail(ParseErrorKind::ExpectedAfter {
                expected: kind,
                context,
            });
        }
    }

    /// Consume an identifier, or report it and return a placeholder
    fn expect_ident(&mut self, context: &'static str) -> Ident {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            return Ident::new(token.lexeme, token.span);
        }
        let offset = self.current().span.start;
        self.fail(ParseErrorKind::ExpectedIdentifier(context));
        Ident::new(MISSING, Span::empty(offset))
    }

    /// Span from `start` to the end of the last consumed token
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    /// True at `FUNCTION`, `PROCEDURE` or `STATIC FUNCTION|PROCEDURE`
    fn at_routine_header(&self) -> bool {
        match self.current_kind() {
            TokenKind::Function | TokenKind::Procedure => true,
            TokenKind::Static => matches!(
                self.peek_kind(),
                TokenKind::Function | TokenKind::Procedure
            ),
            _ => false,
        }
    }

    // ==================== Error Recovery ====================

    /// Record an error at the current token
    fn error_here(&mut self, kind: ParseErrorKind) {
        let span = self.current().span;
        self.errors.push(ParseError::new(kind, span));
    }

    /// Record an error and skip to the next statement boundary. While
    /// already recovering the error is a consequence of the first one and
    /// is not reported again.
    fn fail(&mut self, kind: ParseErrorKind) {
        if self.recovering {
            return;
        }
        self.error_here(kind);
        self.synchronize();
    }

    /// Skip tokens up to a synchronization point, consuming a trailing `;`
    fn synchronize(&mut self) {
        let from = self.current().span.start;
        let mut skipped = 0usize;
        while !SYNC_TOKENS.contains(&self.current_kind()) && !self.at_routine_header() {
            self.advance();
            skipped += 1;
        }
        self.eat(TokenKind::Semicolon);
        self.recovering = true;
        log::trace!("recovered from error at {from}: skipped {skipped} token(s)");
    }

    /// Force one token forward if a statement attempt consumed nothing
    fn ensure_progress(&mut self, before: usize) {
        if self.position == before && !self.is_eof() {
            let token = self.advance();
            log::trace!("no progress at {}; skipped {}", token.span.start, token.kind);
        }
    }

    /// Step one nesting level down. Past [`MAX_NESTING`] the error is
    /// reported once, the remaining input is skipped and `false` is
    /// returned; the caller then yields a placeholder.
    fn enter(&mut self) -> bool {
        if self.depth < MAX_NESTING {
            self.depth += 1;
            return true;
        }
        if !self.too_deep {
            self.too_deep = true;
            self.error_here(ParseErrorKind::NestingTooDeep(MAX_NESTING));
            log::debug!("nesting limit hit at {}", self.current().span.start);
        }
        self.position = self.tokens.len() - 1;
        self.recovering = true;
        false
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Report a missing end keyword, unless the input was cut short by
    /// [`Self::enter`]
    fn missing_closer(&mut self, closer: TokenKind, opener: TokenKind) {
        if !self.too_deep {
            self.error_here(ParseErrorKind::ExpectedClosing { closer, opener });
        }
    }

    // ==================== Statements ====================

    /// Parse statements until one of `closers`, a routine header or EOF.
    /// The block boundary ends any recovery started inside it.
    fn block(&mut self, closers: &[TokenKind]) -> Block {
        let start = self.current().span.start;
        let mut stmts = Vec::new();
        if !self.enter() {
            return Block::new(stmts, Span::empty(start));
        }
        while !self.is_eof() && !closers.contains(&self.current_kind()) && !self.at_routine_header()
        {
            let before = self.position;
            if let Some(stmt) = self.statement() {
                stmts.push(stmt);
            }
            self.ensure_progress(before);
        }
        self.recovering = false;
        self.leave();

        let span = stmts
            .iter()
            .fold(self.span_from(start), |span, stmt| span.merge(stmt.span));
        Block::new(stmts, span)
    }

    /// Parse one statement. Returns `None` for an empty statement or a
    /// stray closing keyword.
    fn statement(&mut self) -> Option<Stmt> {
        self.recovering = false;
        let kind = self.current_kind();
        match kind {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            _ if kind.is_closer() => {
                self.error_here(ParseErrorKind::Unexpected(kind));
                self.advance();
                None
            }
            TokenKind::If => Some(self.if_stmt()),
            TokenKind::While => Some(self.while_stmt()),
            TokenKind::Do if self.peek_kind() == TokenKind::While => Some(self.while_stmt()),
            TokenKind::For => Some(self.for_stmt()),
            TokenKind::Function | TokenKind::Procedure => Some(self.routine()),
            TokenKind::Static if self.at_routine_header() => Some(self.routine()),
            TokenKind::Local | TokenKind::Static => Some(self.terminated(Self::local_decl)),
            TokenKind::Return => Some(self.terminated(Self::return_stmt)),
            TokenKind::Exit | TokenKind::Loop => Some(self.terminated(Self::loop_control)),
            TokenKind::Question | TokenKind::DoubleQuestion => {
                Some(self.terminated(Self::print_stmt))
            }
            _ => Some(self.terminated(Self::expr_stmt)),
        }
    }

    /// Run a simple statement parser and eat an optional trailing `;`
    fn terminated(&mut self, parse: fn(&mut Self) -> Stmt) -> Stmt {
        let stmt = parse(self);
        self.eat(TokenKind::Semicolon);
        stmt
    }

    fn if_stmt(&mut self) -> Stmt {
        let start = self.advance().span.start;
        let mut stmt = self.if_chain(start);

        if self.eat(TokenKind::EndIf).is_none() {
            self.missing_closer(TokenKind::EndIf, TokenKind::If);
        }
        stmt.span = self.span_from(start).merge(stmt.span);
        stmt
    }

    /// Arms and else part of an IF whose keyword has been consumed. Each
    /// ELSEIF arm becomes an IF nested in the else block of the arm before
    /// it. The shared ENDIF is left for [`Self::if_stmt`].
    fn if_chain(&mut self, start: u32) -> Stmt {
        let (cond, then_block) = self.if_arm();
        let mut arms = Vec::new();
        while self.check(TokenKind::ElseIf) {
            let arm_start = self.advance().span.start;
            let (arm_cond, arm_block) = self.if_arm();
            arms.push((arm_start, arm_cond, arm_block));
        }
        let mut else_block = self
            .eat(TokenKind::Else)
            .map(|_| self.block(&[TokenKind::EndIf]));

        for (arm_start, arm_cond, arm_block) in arms.into_iter().rev() {
            let nested = self.if_node(arm_start, arm_cond, arm_block, else_block);
            let span = nested.span;
            else_block = Some(Block::new(vec![nested], span));
        }
        self.if_node(start, cond, then_block, else_block)
    }

    fn if_arm(&mut self) -> (Expr, Block) {
        let cond = self.expression();
        self.eat(TokenKind::Then);
        let then_block = self.block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf]);
        (cond, then_block)
    }

    fn if_node(
        &self,
        start: u32,
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    ) -> Stmt {
        let mut span = self
            .span_from(start)
            .merge(cond.span)
            .merge(then_block.span);
        if let Some(block) = &else_block {
            span = span.merge(block.span);
        }
        Stmt::new(
            StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            span,
        )
    }

    /// `WHILE <cond> [DO] ... ENDDO` or `DO WHILE <cond> ... ENDDO`
    fn while_stmt(&mut self) -> Stmt {
        let start = self.current().span.start;
        self.eat(TokenKind::Do);
        self.advance();

        let cond = self.expression();
        if self.check(TokenKind::Do) && self.peek_kind() != TokenKind::While {
            self.advance();
        }
        let body = self.block(&[TokenKind::EndDo]);

        if self.eat(TokenKind::EndDo).is_none() {
            self.missing_closer(TokenKind::EndDo, TokenKind::While);
        }
        let span = self.span_from(start).merge(body.span).merge(cond.span);
        Stmt::new(StmtKind::While { cond, body }, span)
    }

    fn for_stmt(&mut self) -> Stmt {
        let start = self.advance().span.start;
        let var = self.expect_ident("FOR");

        if self.eat(TokenKind::Assign).is_none() && self.eat(TokenKind::Eq).is_none() {
            self.fail(ParseErrorKind::ExpectedAfter {
                expected: TokenKind::Assign,
                context: "loop variable",
            });
        }
        let from = self.expression();
        self.expect(TokenKind::To, "loop start value");
        let to = self.expression();
        let step = self.eat(TokenKind::Step).map(|_| self.expression());

        let body = self.block(&[TokenKind::Next]);
        if self.eat(TokenKind::Next).is_some() {
            let names_var = self.check(TokenKind::Ident)
                && self.current().lexeme.eq_ignore_ascii_case(&var.name);
            if names_var {
                self.advance();
            }
        } else {
            self.missing_closer(TokenKind::Next, TokenKind::For);
        }

        let mut span = self.span_from(start).merge(var.span).merge(from.span).merge(to.span);
        if let Some(step) = &step {
            span = span.merge(step.span);
        }
        span = span.merge(body.span);
        Stmt::new(
            StmtKind::For {
                var,
                start: from,
                end: to,
                step,
                body,
            },
            span,
        )
    }

    /// `[STATIC] FUNCTION|PROCEDURE name[(params)]`, body up to the matching
    /// end keyword, the next routine header or EOF
    fn routine(&mut self) -> Stmt {
        let start = self.current().span.start;
        let is_static = self.eat(TokenKind::Static).is_some();
        let is_function = self.advance().kind == TokenKind::Function;
        let name = self.expect_ident(if is_function { "FUNCTION" } else { "PROCEDURE" });

        let mut params = Vec::new();
        if self.eat(TokenKind::LParen).is_some() {
            if !self.check(TokenKind::RParen) {
                loop {
                    params.push(self.expect_ident("'('"));
                    if self.recovering || self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "parameters");
        }

        let body = self.block(&[TokenKind::EndFunction, TokenKind::EndProc]);
        if self.check(TokenKind::EndFunction) || self.check(TokenKind::EndProc) {
            self.advance();
        }

        let span = params
            .iter()
            .fold(self.span_from(start).merge(name.span), |span, p| span.merge(p.span))
            .merge(body.span);
        let routine = Routine {
            name,
            params,
            body,
            is_static,
        };
        let kind = if is_function {
            StmtKind::Function(routine)
        } else {
            StmtKind::Procedure(routine)
        };
        Stmt::new(kind, span)
    }

    /// `LOCAL|STATIC name [:= init] {, name [:= init]}`
    fn local_decl(&mut self) -> Stmt {
        let token = self.advance();
        let (storage, context) = if token.kind == TokenKind::Static {
            (Storage::Static, "STATIC")
        } else {
            (Storage::Local, "LOCAL")
        };

        let mut bindings = Vec::new();
        loop {
            let name = self.expect_ident(context);
            let init = self.eat(TokenKind::Assign).map(|_| self.expression());
            let span = init
                .as_ref()
                .map_or(name.span, |init| name.span.merge(init.span));
            bindings.push(Binding { name, init, span });
            if self.recovering || self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        let span = bindings
            .iter()
            .fold(self.span_from(token.span.start), |span, b| span.merge(b.span));
        Stmt::new(StmtKind::Local { storage, bindings }, span)
    }

    fn return_stmt(&mut self) -> Stmt {
        let start = self.advance().span.start;
        let value = can_start_expression(self.current_kind()).then(|| self.expression());
        let span = value
            .as_ref()
            .map_or(self.span_from(start), |v| self.span_from(start).merge(v.span));
        Stmt::new(StmtKind::Return(value), span)
    }

    fn loop_control(&mut self) -> Stmt {
        let token = self.advance();
        let kind = if token.kind == TokenKind::Exit {
            StmtKind::Exit
        } else {
            StmtKind::Loop
        };
        Stmt::new(kind, token.span)
    }

    /// `? a, b` and `?? a, b`
    fn print_stmt(&mut self) -> Stmt {
        let token = self.advance();
        let mut exprs = Vec::new();
        if can_start_expression(self.current_kind()) {
            loop {
                exprs.push(self.expression());
                if self.recovering || self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let span = exprs
            .iter()
            .fold(self.span_from(token.span.start), |span, e| span.merge(e.span));
        Stmt::new(
            StmtKind::Print {
                newline: token.kind == TokenKind::Question,
                exprs,
            },
            span,
        )
    }

    /// Expression statement, promoted to an assignment on `:=` or `+=` etc.
    fn expr_stmt(&mut self) -> Stmt {
        let start = self.current().span.start;
        let target = self.expression();
        if self.recovering {
            let span = self.span_from(start).merge(target.span);
            return Stmt::expr(target, span);
        }

        let op = CompoundOp::from_token(self.current_kind());
        if op.is_none() && !self.check(TokenKind::Assign) {
            let span = self.span_from(start).merge(target.span);
            return Stmt::expr(target, span);
        }

        if !target.is_assignable() {
            self.errors.push(ParseError::new(
                ParseErrorKind::InvalidAssignmentTarget,
                target.span,
            ));
        }
        self.advance();
        let value = self.expression();
        let span = self
            .span_from(start)
            .merge(target.span)
            .merge(value.span);
        let kind = match op {
            Some(op) => StmtKind::CompoundAssign { target, op, value },
            None => StmtKind::Assign { target, value },
        };
        Stmt::new(kind, span)
    }

    // ==================== Expressions ====================

    /// Parse an expression; yields a placeholder while recovering
    pub fn expression(&mut self) -> Expr {
        if self.recovering || !self.enter() {
            return Expr::missing(self.current().span.start);
        }
        let expr = self.binary(1);
        self.leave();
        expr
    }

    /// Precedence climbing over binary operators. The right operand binds
    /// one level tighter, so every operator is left-associative.
    fn binary(&mut self, min_prec: u8) -> Expr {
        let mut left = self.unary();

        while !self.recovering {
            let Some(op) = BinOp::from_token(self.current_kind()) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.advance(); // consume operator
            let right = self.binary(prec + 1);
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        left
    }

    fn unary(&mut self) -> Expr {
        let op = match self.current_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.postfix(),
        };
        if !self.enter() {
            return Expr::missing(self.current().span.start);
        }
        let start = self.advance().span.start;
        let operand = self.unary();
        self.leave();
        let span = self.span_from(start).merge(operand.span);
        Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// Calls, indexing, message sends and alias fields
    fn postfix(&mut self) -> Expr {
        let mut expr = self.primary();

        while !self.recovering {
            let start = expr.span.start;
            let kind = match self.current_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.list(TokenKind::RParen, "arguments");
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression();
                    self.expect(TokenKind::RBracket, "index");
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                TokenKind::Colon => {
                    self.advance();
                    let method = self.expect_ident("':'");
                    let args = if !self.recovering && self.eat(TokenKind::LParen).is_some() {
                        Some(self.list(TokenKind::RParen, "arguments"))
                    } else {
                        None
                    };
                    ExprKind::Send {
                        receiver: Box::new(expr),
                        method,
                        args,
                    }
                }
                TokenKind::Arrow => {
                    self.advance();
                    let field = self.expect_ident("'->'");
                    ExprKind::Alias {
                        area: Box::new(expr),
                        field,
                    }
                }
                _ => break,
            };
            let span = self.span_from(start);
            expr = Expr::new(kind, span);
            expr.span = contain_children(&expr);
        }

        expr
    }

    /// Comma-separated expressions up to `close`, which is consumed
    fn list(&mut self, close: TokenKind, context: &'static str) -> Vec<Expr> {
        let mut items = Vec::new();
        if !self.check(close) {
            loop {
                items.push(self.expression());
                if self.recovering || self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(close, context);
        items
    }

    fn primary(&mut self) -> Expr {
        let token = self.current().clone();
        let literal = match token.kind {
            TokenKind::Number => Some((LiteralKind::Number, token.lexeme.clone())),
            TokenKind::String => Some((LiteralKind::String, token.lexeme.clone())),
            TokenKind::Nil => Some((LiteralKind::Nil, "NIL".to_string())),
            TokenKind::True => Some((LiteralKind::Boolean, ".T.".to_string())),
            TokenKind::False => Some((LiteralKind::Boolean, ".F.".to_string())),
            _ => None,
        };
        if let Some((kind, raw)) = literal {
            self.advance();
            return Expr::literal(kind, raw, token.span);
        }

        match token.kind {
            TokenKind::Ident => {
                self.advance();
                Expr::ident(token.lexeme, token.span)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression();
                self.expect(TokenKind::RParen, "expression");
                let span = self.span_from(token.span.start).merge(inner.span);
                Expr::new(inner.kind, span)
            }
            TokenKind::LBrace if self.peek_kind() == TokenKind::Pipe => self.code_block(),
            TokenKind::LBrace => {
                self.advance();
                let elements = self.list(TokenKind::RBrace, "array elements");
                let span = elements
                    .iter()
                    .fold(self.span_from(token.span.start), |span, e| span.merge(e.span));
                Expr::new(ExprKind::Array(elements), span)
            }
            TokenKind::Error => {
                self.error_here(ParseErrorKind::InvalidToken(token.lexeme));
                self.advance();
                Expr::missing(token.span.start)
            }
            found => {
                self.fail(ParseErrorKind::ExpectedExpression(found));
                Expr::missing(token.span.start)
            }
        }
    }

    /// `{|a, b| expr, ...}`
    fn code_block(&mut self) -> Expr {
        let start = self.advance().span.start;
        self.advance(); // opening '|'

        let mut params = Vec::new();
        if !self.check(TokenKind::Pipe) {
            loop {
                params.push(self.expect_ident("'|'"));
                if self.recovering || self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::Pipe, "code block parameters");
        let body = self.list(TokenKind::RBrace, "code block");

        let span = params
            .iter()
            .map(|p| p.span)
            .chain(body.iter().map(|e| e.span))
            .fold(self.span_from(start), Span::merge);
        Expr::new(ExprKind::CodeBlock { params, body }, span)
    }
}

/// Widen a postfix node's span over its children, which may include a
/// placeholder positioned past the last consumed token
fn contain_children(expr: &Expr) -> Span {
    let span = expr.span;
    match &expr.kind {
        ExprKind::Call { callee, args } => args
            .iter()
            .fold(span.merge(callee.span), |span, arg| span.merge(arg.span)),
        ExprKind::Index { target, index } => span.merge(target.span).merge(index.span),
        ExprKind::Send {
            receiver,
            method,
            args,
        } => args
            .iter()
            .flatten()
            .fold(span.merge(receiver.span).merge(method.span), |span, arg| {
                span.merge(arg.span)
            }),
        ExprKind::Alias { area, field } => span.merge(area.span).merge(field.span),
        _ => span,
    }
}

/// Tokens that can begin an expression
const fn can_start_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
            | TokenKind::Ident
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Not
            | TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::Error
    )
}

/// Parse a token stream into a program
#[must_use]
pub fn parse(tokens: Vec<Token>) -> ParseResult {
    Parser::new(tokens).parse_program()
}

/// Lex `source` without preprocessing and parse the result
#[must_use]
pub fn parse_source(source: &str) -> ParseResult {
    parse(Lexer::tokenize(source).0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let result = parse_source(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors for {source:?}: {:?}",
            result.messages()
        );
        result.program
    }

    fn parse_expr(source: &str) -> Expr {
        let (expr, errors) = Parser::parse_expression(source);
        assert!(errors.is_empty(), "errors for {source:?}: {errors:?}");
        expr
    }

    fn single(source: &str) -> StmtKind {
        let mut program = parse_ok(source);
        assert_eq!(program.stmts.len(), 1, "{source:?}");
        program.stmts.remove(0).kind
    }

    #[test]
    fn parse_literals() {
        let expr = parse_expr("42.5");
        assert!(
            matches!(&expr.kind, ExprKind::Literal(lit) if lit.kind == LiteralKind::Number && lit.raw == "42.5")
        );
        let expr = parse_expr(".t.");
        assert!(matches!(&expr.kind, ExprKind::Literal(lit) if lit.raw == ".T."));
        let expr = parse_expr("nil");
        assert!(matches!(&expr.kind, ExprKind::Literal(lit) if lit.kind == LiteralKind::Nil));
        let expr = parse_expr("'it''s'");
        assert!(matches!(&expr.kind, ExprKind::Literal(lit) if lit.raw == "it's"));
    }

    #[test]
    fn parse_binary_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        assert_eq!(expr.dump(), "Add(Number(1), Mul(Number(2), Number(3)))");

        let expr = parse_expr("a .or. b .and. c = d");
        assert_eq!(
            expr.dump(),
            "Or(Ident(a), And(Ident(b), Eq(Ident(c), Ident(d))))"
        );

        let expr = parse_expr("\"x\" $ cText == .t.");
        assert_eq!(expr.dump(), "ExactEq(Contains(String(\"x\"), Ident(cText)), Boolean(.T.))");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(
            parse_expr("10 - 4 - 3").dump(),
            "Sub(Sub(Number(10), Number(4)), Number(3))"
        );
        assert_eq!(
            parse_expr("a / b * c").dump(),
            "Mul(Div(Ident(a), Ident(b)), Ident(c))"
        );
    }

    #[test]
    fn parse_unary_expressions() {
        assert_eq!(parse_expr("-x * 2").dump(), "Mul(Neg(Ident(x)), Number(2))");
        assert_eq!(parse_expr("!lDone").dump(), "Not(Ident(lDone))");
        assert_eq!(parse_expr(".not. a").dump(), "Not(Ident(a))");
        assert_eq!(parse_expr("+ - 1").dump(), "Plus(Neg(Number(1)))");
    }

    #[test]
    fn parse_grouping() {
        let expr = parse_expr("(1 + 2) * 3");
        assert_eq!(expr.dump(), "Mul(Add(Number(1), Number(2)), Number(3))");
        assert_eq!(expr.span, Span::new(0, 11));
    }

    #[test]
    fn parse_postfix_forms() {
        assert_eq!(
            parse_expr("QOut(1, x)").dump(),
            "Call(Ident(QOut), [Number(1), Ident(x)])"
        );
        assert_eq!(parse_expr("a[i][2]").dump(), "Index(Index(Ident(a), Ident(i)), Number(2))");
        assert_eq!(
            parse_expr("oWin:Show(1):nTop").dump(),
            "Send(Send(Ident(oWin), Show, [Number(1)]), nTop)"
        );
        assert_eq!(parse_expr("Customer->Name").dump(), "Alias(Ident(Customer), Name)");
        assert_eq!(parse_expr("::nCount").dump(), "Ident(::nCount)");
    }

    #[test]
    fn parse_arrays_and_code_blocks() {
        assert_eq!(parse_expr("{1, {2}, {}}").dump(), "Array[Number(1), Array[Number(2)], Array[]]");
        assert_eq!(
            parse_expr("{|a, b| a + b}").dump(),
            "CodeBlock([a, b], [Add(Ident(a), Ident(b))])"
        );
        assert_eq!(
            parse_expr("{|| Init(), Run()}").dump(),
            "CodeBlock([], [Call(Ident(Init), []), Call(Ident(Run), [])])"
        );
    }

    #[test]
    fn expression_statement_with_semicolon() {
        let result = parse_source("1 + 2 * 3;");
        assert!(result.errors.is_empty());
        assert_eq!(result.program.stmts.len(), 1);
        let StmtKind::Expr(expr) = &result.program.stmts[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.dump(), "Add(Number(1), Mul(Number(2), Number(3)))");
    }

    #[test]
    fn assignments() {
        assert!(matches!(single("x := 1"), StmtKind::Assign { .. }));
        assert!(matches!(
            single(r"cPath += '\\'"),
            StmtKind::CompoundAssign {
                op: CompoundOp::Add,
                ..
            }
        ));
        assert!(matches!(single("a[1] *= 2"), StmtKind::CompoundAssign { op: CompoundOp::Mul, .. }));
        // bare `=` compares
        let StmtKind::Expr(expr) = single("x = 1") else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn invalid_assignment_target() {
        let result = parse_source("1 := 2");
        assert_eq!(result.messages(), vec!["Invalid assignment target at 0"]);
        assert!(matches!(result.program.stmts[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn if_without_endif() {
        let result = parse_source("if 1 then return 2;");
        assert_eq!(result.messages(), vec!["Expected ENDIF to close IF at 19"]);
        assert_eq!(result.program.stmts.len(), 1);
        let StmtKind::If {
            cond,
            then_block,
            else_block,
        } = &result.program.stmts[0].kind
        else {
            panic!("expected IF");
        };
        assert_eq!(cond.dump(), "Number(1)");
        assert!(matches!(then_block.stmts[0].kind, StmtKind::Return(Some(_))));
        assert!(else_block.is_none());
    }

    #[test]
    fn if_elseif_else_chain() {
        let source = "IF a\n  x := 1\nELSEIF b\n  x := 2\nELSEIF c\n  x := 3\nELSE\n  x := 4\nENDIF";
        let StmtKind::If { else_block, .. } = single(source) else {
            panic!("expected IF");
        };
        let else_block = else_block.expect("else block");
        assert_eq!(else_block.stmts.len(), 1);
        let StmtKind::If {
            cond, else_block, ..
        } = &else_block.stmts[0].kind
        else {
            panic!("expected nested IF");
        };
        assert_eq!(cond.dump(), "Ident(b)");
        let inner = else_block.as_ref().expect("second ELSEIF");
        let StmtKind::If { else_block, .. } = &inner.stmts[0].kind else {
            panic!("expected nested IF");
        };
        let last = else_block.as_ref().expect("ELSE");
        assert!(matches!(last.stmts[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn if_without_then_keyword() {
        let StmtKind::If { then_block, .. } = single("if x > 1\n ? x\nendif") else {
            panic!("expected IF");
        };
        assert_eq!(then_block.stmts.len(), 1);
    }

    #[test]
    fn while_loops() {
        let StmtKind::While { cond, body } = single("WHILE n < 10\n  n += 1\nENDDO") else {
            panic!("expected WHILE");
        };
        assert_eq!(cond.dump(), "Lt(Ident(n), Number(10))");
        assert!(!body.stmts.is_empty());
    }

    #[test]
    fn do_while_loop() {
        let StmtKind::While { body, .. } = single("do while .t.\n exit\n loop\nenddo") else {
            panic!("expected WHILE");
        };
        assert!(matches!(body.stmts[0].kind, StmtKind::Exit));
        assert!(matches!(body.stmts[1].kind, StmtKind::Loop));
    }

    #[test]
    fn for_loops() {
        let StmtKind::For {
            var, step, body, ..
        } = single("FOR i := 1 TO Len(a) STEP 2\n  ? a[i]\nNEXT i")
        else {
            panic!("expected FOR");
        };
        assert_eq!(var.name, "i");
        assert_eq!(step.map(|s| s.dump()), Some("Number(2)".to_string()));
        assert_eq!(body.stmts.len(), 1);

        // `=` is accepted as the initializer, and NEXT alone closes the loop
        let program = parse_ok("for n = 1 to 3\nnext\nx := n");
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn next_leaves_unrelated_identifier() {
        let program = parse_ok("for i := 1 to 2\nnext\nfoo()");
        assert_eq!(program.stmts.len(), 2);
        assert!(matches!(program.stmts[1].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn functions_and_procedures() {
        let source = "FUNCTION Add(a, b)\n  RETURN a + b\n\nSTATIC PROCEDURE Main\n  ? Add(1, 2)\n  RETURN\n";
        let program = parse_ok(source);
        let routines: Vec<_> = program.routines().collect();
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].name.name, "Add");
        assert_eq!(routines[0].params.len(), 2);
        assert!(!routines[0].is_static);
        assert_eq!(routines[1].name.name, "Main");
        assert!(routines[1].is_static);
        assert!(matches!(
            routines[1].body.stmts.last().map(|s| &s.kind),
            Some(StmtKind::Return(None))
        ));
        assert!(matches!(program.stmts[1].kind, StmtKind::Procedure(_)));
    }

    #[test]
    fn explicit_routine_terminators() {
        let program = parse_ok("function f()\nreturn 1\nendfunction\nprocedure p()\nendproc");
        assert_eq!(program.routines().count(), 2);
    }

    #[test]
    fn local_and_static_declarations() {
        let StmtKind::Local { storage, bindings } = single("LOCAL a := 1, b, c := {}") else {
            panic!("expected LOCAL");
        };
        assert_eq!(storage, Storage::Local);
        assert_eq!(bindings.len(), 3);
        assert!(bindings[1].init.is_none());

        let StmtKind::Local { storage, .. } = single("static nCount := 0") else {
            panic!("expected STATIC");
        };
        assert_eq!(storage, Storage::Static);
    }

    #[test]
    fn print_statements() {
        let StmtKind::Print { newline, exprs } = single("? 'a', b") else {
            panic!("expected print");
        };
        assert!(newline);
        assert_eq!(exprs.len(), 2);
        let StmtKind::Print { newline, exprs } = single("??") else {
            panic!("expected print");
        };
        assert!(!newline);
        assert!(exprs.is_empty());
    }

    #[test]
    fn stray_closer_is_reported_and_consumed() {
        let result = parse_source("x := 1\nENDDO\ny := 2");
        assert_eq!(result.messages(), vec!["Unexpected ENDDO at 7"]);
        assert_eq!(result.program.stmts.len(), 2);
    }

    #[test]
    fn missing_expression_uses_placeholder() {
        let result = parse_source("x := ; y := 2");
        assert_eq!(result.messages(), vec!["Expected expression, found ';' at 5"]);
        assert_eq!(result.program.stmts.len(), 2);
        let StmtKind::Assign { value, .. } = &result.program.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(value.is_missing());
        assert_eq!(value.span, Span::empty(5));
    }

    #[test]
    fn recovery_reports_once_per_statement() {
        let result = parse_source("QOut(1, 2 x := 3; ? x");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            ParseErrorKind::ExpectedAfter {
                expected: TokenKind::RParen,
                context: "arguments"
            }
        );
        // the statement after the `;` is parsed normally
        assert!(matches!(
            result.program.stmts.last().map(|s| &s.kind),
            Some(StmtKind::Print { .. })
        ));
    }

    #[test]
    fn recovery_stops_at_closers() {
        let result = parse_source("if a\n  x := )\nendif\n? 1");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.program.stmts.len(), 2);
    }

    #[test]
    fn elseif_after_failed_branch_keeps_its_condition() {
        let result = parse_source("if a\n  x := )\nelseif b\n  y := 1\nendif");
        assert_eq!(result.messages(), vec!["Expected expression, found ')' at 12"]);
        let StmtKind::If { else_block, .. } = &result.program.stmts[0].kind else {
            panic!("expected IF");
        };
        let arm = &else_block.as_ref().expect("ELSEIF arm").stmts[0];
        let StmtKind::If {
            cond, then_block, ..
        } = &arm.kind
        else {
            panic!("expected nested IF");
        };
        assert_eq!(cond.dump(), "Ident(b)");
        assert_eq!(then_block.stmts.len(), 1);
        assert!(matches!(then_block.stmts[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn else_after_failed_branch_is_parsed() {
        let result = parse_source("if a\n  x := )\nelse\n  y := 2\nendif\n? 1");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.program.stmts.len(), 2);
        let StmtKind::If { else_block, .. } = &result.program.stmts[0].kind else {
            panic!("expected IF");
        };
        let else_block = else_block.as_ref().expect("ELSE");
        assert_eq!(else_block.stmts.len(), 1);
        let StmtKind::Assign { target, value } = &else_block.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.dump(), "Ident(y)");
        assert_eq!(value.dump(), "Number(2)");
    }

    #[test]
    fn failed_elseif_condition_leaves_else_intact() {
        let result = parse_source("if a\n ? 1\nelseif )\n ? 2\nelse\n ? 3\nendif");
        assert_eq!(result.errors.len(), 1);
        let StmtKind::If { else_block, .. } = &result.program.stmts[0].kind else {
            panic!("expected IF");
        };
        let StmtKind::If {
            cond, else_block, ..
        } = &else_block.as_ref().expect("ELSEIF arm").stmts[0].kind
        else {
            panic!("expected nested IF");
        };
        assert!(cond.is_missing());
        let last = else_block.as_ref().expect("ELSE");
        assert!(matches!(last.stmts[0].kind, StmtKind::Print { .. }));
    }

    #[test]
    fn routine_after_failed_statement_is_parsed() {
        let result = parse_source("function a()\n  x := (\nfunction b(p)\n  return p");
        assert_eq!(result.messages(), vec!["Expected expression, found FUNCTION at 22"]);
        let routines: Vec<_> = result.program.routines().collect();
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[1].name.name, "b");
        assert_eq!(routines[1].params.len(), 1);
        assert!(matches!(
            routines[1].body.stmts[0].kind,
            StmtKind::Return(Some(_))
        ));
    }

    #[test]
    fn long_elseif_chain() {
        let mut source = String::from("if n = 0\n ? 0\n");
        for i in 1..500 {
            source.push_str(&format!("elseif n = {i}\n ? {i}\n"));
        }
        source.push_str("endif");
        let result = parse_source(&source);
        assert!(result.errors.is_empty(), "{:?}", result.messages());
        assert_eq!(result.program.stmts.len(), 1);
    }

    #[test]
    fn nesting_within_limit_is_accepted() {
        let depth = MAX_NESTING - 2;
        let source = format!("x := {}1{}", "(".repeat(depth), ")".repeat(depth));
        parse_ok(&source);
    }

    #[test]
    fn deep_parentheses_are_cut_off() {
        let n = 100_000;
        let source = format!("x := {}1{}\n? 2", "(".repeat(n), ")".repeat(n));
        let result = parse_source(&source);
        assert_eq!(
            result.errors.iter().map(|e| &e.kind).collect::<Vec<_>>(),
            vec![&ParseErrorKind::NestingTooDeep(MAX_NESTING)]
        );
        assert!(matches!(
            result.program.stmts[0].kind,
            StmtKind::Assign { .. }
        ));
    }

    #[test]
    fn deep_unary_chain_is_cut_off() {
        let source = format!("x := {}1", "-".repeat(100_000));
        let result = parse_source(&source);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ParseErrorKind::NestingTooDeep(MAX_NESTING));
    }

    #[test]
    fn deep_blocks_report_one_error() {
        let source = format!("{}? 1", "if a\n".repeat(10_000));
        let result = parse_source(&source);
        // the condition of the first IF past the limit is where parsing stops
        let offset = 5 * MAX_NESTING + 3;
        assert_eq!(
            result.messages(),
            vec![format!("Nesting deeper than {MAX_NESTING} levels at {offset}")]
        );
        assert_eq!(result.program.stmts.len(), 1);
    }

    #[test]
    fn lexical_error_token_becomes_placeholder() {
        let result = parse_source("x := 'open\ny := 2");
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0].kind, ParseErrorKind::InvalidToken(_)));
        assert_eq!(result.program.stmts.len(), 2);
    }

    #[test]
    fn empty_and_garbage_inputs_produce_a_program() {
        assert!(parse_source("").program.stmts.is_empty());
        assert!(parse_source(";;;").program.stmts.is_empty());
        let result = parse_source(") ] , := @");
        assert!(result.has_errors());
        let result = parse_source("if if if");
        assert!(result.has_errors());
    }

    #[test]
    fn routine_header_closes_open_blocks() {
        let result = parse_source("function a()\nif x\n? 1\nfunction b()\nreturn 2");
        assert_eq!(result.messages(), vec!["Expected ENDIF to close IF at 22"]);
        assert_eq!(result.program.routines().count(), 2);
    }

    #[test]
    fn tokens_without_eof_are_accepted() {
        let tokens = vec![Token::new(TokenKind::Ident, Span::new(0, 1), "x")];
        let result = parse(tokens);
        assert!(result.errors.is_empty());
        assert_eq!(result.program.span, Span::new(0, 1));
    }
}
