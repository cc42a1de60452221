//! Pretty printing for AST nodes
//!
//! `Display` renders nodes back as Xbase source, with every binary
//! operation parenthesized so the tree shape is visible. [`Program::dump`]
//! produces an indented tree in constructor notation
//! (`Add(Number(1), Mul(Number(2), Number(3)))`) for the CLI.

use std::fmt::{self, Display, Formatter, Write};

use super::{
    BinOp, Binding, Block, CompoundOp, Expr, ExprKind, Ident, Literal, LiteralKind, Program,
    Routine, Stmt, StmtKind, UnaryOp,
};

// ============================================================================
// Helpers
// ============================================================================

fn write_comma_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

const INDENT: &str = "    ";

/// Write each statement of a block on its own line, one level deeper
fn write_body(f: &mut Formatter<'_>, block: &Block) -> fmt::Result {
    for stmt in &block.stmts {
        let text = stmt.to_string();
        writeln!(f)?;
        write!(f, "{INDENT}{}", text.replace('\n', &format!("\n{INDENT}")))?;
    }
    Ok(())
}

// ============================================================================
// Basic types
// ============================================================================

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for CompoundOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::String => write!(f, "\"{}\"", self.raw.replace('"', "\"\"")),
            LiteralKind::Number | LiteralKind::Nil | LiteralKind::Boolean => {
                write!(f, "{}", self.raw)
            }
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Ident(ident) => write!(f, "{ident}"),
            ExprKind::Unary { op, operand } => write!(f, "{op}{operand}"),
            ExprKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            ExprKind::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_comma_separated(f, args)?;
                write!(f, ")")
            }
            ExprKind::Index { target, index } => write!(f, "{target}[{index}]"),
            ExprKind::Array(elements) => {
                write!(f, "{{")?;
                write_comma_separated(f, elements)?;
                write!(f, "}}")
            }
            ExprKind::Send {
                receiver,
                method,
                args,
            } => {
                write!(f, "{receiver}:{method}")?;
                if let Some(args) = args {
                    write!(f, "(")?;
                    write_comma_separated(f, args)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
            ExprKind::Alias { area, field } => write!(f, "{area}->{field}"),
            ExprKind::CodeBlock { params, body } => {
                write!(f, "{{|")?;
                write_comma_separated(f, params)?;
                write!(f, "| ")?;
                write_comma_separated(f, body)?;
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

impl Display for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(init) = &self.init {
            write!(f, " := {init}")?;
        }
        Ok(())
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Display for StmtKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StmtKind::Expr(expr) => write!(f, "{expr}"),
            StmtKind::Assign { target, value } => write!(f, "{target} := {value}"),
            StmtKind::CompoundAssign { target, op, value } => write!(f, "{target} {op} {value}"),
            StmtKind::Print { newline, exprs } => {
                write!(f, "{}", if *newline { "?" } else { "??" })?;
                if !exprs.is_empty() {
                    write!(f, " ")?;
                    write_comma_separated(f, exprs)?;
                }
                Ok(())
            }
            StmtKind::Local { storage, bindings } => {
                write!(f, "{} ", storage.as_str())?;
                write_comma_separated(f, bindings)
            }
            StmtKind::Return(expr) => {
                write!(f, "RETURN")?;
                if let Some(expr) = expr {
                    write!(f, " {expr}")?;
                }
                Ok(())
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                write!(f, "IF {cond}")?;
                write_body(f, then_block)?;
                if let Some(else_block) = else_block {
                    write!(f, "\nELSE")?;
                    write_body(f, else_block)?;
                }
                write!(f, "\nENDIF")
            }
            StmtKind::While { cond, body } => {
                write!(f, "WHILE {cond}")?;
                write_body(f, body)?;
                write!(f, "\nENDDO")
            }
            StmtKind::For {
                var,
                start,
                end,
                step,
                body,
            } => {
                write!(f, "FOR {var} := {start} TO {end}")?;
                if let Some(step) = step {
                    write!(f, " STEP {step}")?;
                }
                write_body(f, body)?;
                write!(f, "\nNEXT")
            }
            StmtKind::Function(routine) => write_routine(f, "FUNCTION", "ENDFUNCTION", routine),
            StmtKind::Procedure(routine) => write_routine(f, "PROCEDURE", "ENDPROC", routine),
            StmtKind::Exit => write!(f, "EXIT"),
            StmtKind::Loop => write!(f, "LOOP"),
        }
    }
}

fn write_routine(
    f: &mut Formatter<'_>,
    keyword: &str,
    closer: &str,
    routine: &Routine,
) -> fmt::Result {
    if routine.is_static {
        write!(f, "STATIC ")?;
    }
    write!(f, "{keyword} {}(", routine.name)?;
    write_comma_separated(f, &routine.params)?;
    write!(f, ")")?;
    write_body(f, &routine.body)?;
    write!(f, "\n{closer}")
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.stmts.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for stmt in &self.stmts {
            writeln!(f, "{stmt}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tree dump
// ============================================================================

impl Expr {
    /// Constructor-style rendering of the expression tree
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        dump_expr(&mut out, self);
        out
    }
}

impl Program {
    /// Indented tree, one statement header per line
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for stmt in &self.stmts {
            dump_stmt(&mut out, stmt, 0);
        }
        out
    }
}

fn dump_list(out: &mut String, exprs: &[Expr]) {
    out.push('[');
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        dump_expr(out, expr);
    }
    out.push(']');
}

fn dump_expr(out: &mut String, expr: &Expr) {
    // Writing into a String cannot fail
    let _ = match &expr.kind {
        ExprKind::Literal(lit) => match lit.kind {
            LiteralKind::Nil => write!(out, "Nil"),
            LiteralKind::String => write!(out, "String({:?})", lit.raw),
            kind => write!(out, "{kind:?}({})", lit.raw),
        },
        ExprKind::Ident(ident) => write!(out, "Ident({})", ident.name),
        ExprKind::Unary { op, operand } => {
            let _ = write!(out, "{op:?}(");
            dump_expr(out, operand);
            write!(out, ")")
        }
        ExprKind::Binary { op, left, right } => {
            let _ = write!(out, "{op:?}(");
            dump_expr(out, left);
            out.push_str(", ");
            dump_expr(out, right);
            write!(out, ")")
        }
        ExprKind::Call { callee, args } => {
            out.push_str("Call(");
            dump_expr(out, callee);
            out.push_str(", ");
            dump_list(out, args);
            write!(out, ")")
        }
        ExprKind::Index { target, index } => {
            out.push_str("Index(");
            dump_expr(out, target);
            out.push_str(", ");
            dump_expr(out, index);
            write!(out, ")")
        }
        ExprKind::Array(elements) => {
            out.push_str("Array");
            dump_list(out, elements);
            Ok(())
        }
        ExprKind::Send {
            receiver,
            method,
            args,
        } => {
            out.push_str("Send(");
            dump_expr(out, receiver);
            let _ = write!(out, ", {}", method.name);
            if let Some(args) = args {
                out.push_str(", ");
                dump_list(out, args);
            }
            write!(out, ")")
        }
        ExprKind::Alias { area, field } => {
            out.push_str("Alias(");
            dump_expr(out, area);
            write!(out, ", {})", field.name)
        }
        ExprKind::CodeBlock { params, body } => {
            let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            let _ = write!(out, "CodeBlock([{}], ", names.join(", "));
            dump_list(out, body);
            write!(out, ")")
        }
    };
}

fn dump_block(out: &mut String, label: &str, block: &Block, depth: usize) {
    let _ = writeln!(out, "{}{label}", INDENT.repeat(depth));
    for stmt in &block.stmts {
        dump_stmt(out, stmt, depth + 1);
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&pad);
    match &stmt.kind {
        StmtKind::Expr(expr) => dump_expr(out, expr),
        StmtKind::Assign { target, value } => {
            out.push_str("Assign(");
            dump_expr(out, target);
            out.push_str(", ");
            dump_expr(out, value);
            out.push(')');
        }
        StmtKind::CompoundAssign { target, op, value } => {
            let _ = write!(out, "CompoundAssign({op}, ");
            dump_expr(out, target);
            out.push_str(", ");
            dump_expr(out, value);
            out.push(')');
        }
        StmtKind::Print { newline, exprs } => {
            out.push_str(if *newline { "Print" } else { "PrintInline" });
            dump_list(out, exprs);
        }
        StmtKind::Local { storage, bindings } => {
            let _ = write!(out, "{storage:?}(");
            for (i, binding) in bindings.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&binding.name.name);
                if let Some(init) = &binding.init {
                    out.push_str(" := ");
                    dump_expr(out, init);
                }
            }
            out.push(')');
        }
        StmtKind::Return(expr) => {
            out.push_str("Return");
            if let Some(expr) = expr {
                out.push('(');
                dump_expr(out, expr);
                out.push(')');
            }
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            out.push_str("If(");
            dump_expr(out, cond);
            out.push_str(")\n");
            dump_block(out, "Then", then_block, depth + 1);
            if let Some(else_block) = else_block {
                dump_block(out, "Else", else_block, depth + 1);
            }
            return;
        }
        StmtKind::While { cond, body } => {
            out.push_str("While(");
            dump_expr(out, cond);
            out.push_str(")\n");
            dump_block(out, "Body", body, depth + 1);
            return;
        }
        StmtKind::For {
            var,
            start,
            end,
            step,
            body,
        } => {
            let _ = write!(out, "For({}, ", var.name);
            dump_expr(out, start);
            out.push_str(", ");
            dump_expr(out, end);
            if let Some(step) = step {
                out.push_str(", ");
                dump_expr(out, step);
            }
            out.push_str(")\n");
            dump_block(out, "Body", body, depth + 1);
            return;
        }
        StmtKind::Function(routine) | StmtKind::Procedure(routine) => {
            let kind = if matches!(stmt.kind, StmtKind::Function(_)) {
                "Function"
            } else {
                "Procedure"
            };
            let params: Vec<&str> = routine.params.iter().map(|p| p.name.as_str()).collect();
            let _ = writeln!(
                out,
                "{}{kind}({}, [{}])",
                if routine.is_static { "Static" } else { "" },
                routine.name.name,
                params.join(", ")
            );
            for stmt in &routine.body.stmts {
                dump_stmt(out, stmt, depth + 1);
            }
            return;
        }
        StmtKind::Exit => out.push_str("Exit"),
        StmtKind::Loop => out.push_str("Loop"),
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn num(raw: &str) -> Expr {
        Expr::literal(LiteralKind::Number, raw, span())
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span(),
        )
    }

    #[test]
    fn display_literals() {
        assert_eq!(format!("{}", num("3.5")), "3.5");
        let s = Expr::literal(LiteralKind::String, "say \"hi\"", span());
        assert_eq!(format!("{s}"), "\"say \"\"hi\"\"\"");
        let t = Expr::literal(LiteralKind::Boolean, ".T.", span());
        assert_eq!(format!("{t}"), ".T.");
    }

    #[test]
    fn display_binary_operators() {
        assert_eq!(format!("{}", BinOp::Eq), "=");
        assert_eq!(format!("{}", BinOp::Ne), "!=");
        assert_eq!(format!("{}", BinOp::Contains), "$");
        assert_eq!(format!("{}", BinOp::And), ".and.");
    }

    #[test]
    fn display_expressions() {
        let expr = binary(BinOp::Add, num("1"), binary(BinOp::Mul, num("2"), num("3")));
        assert_eq!(format!("{expr}"), "(1 + (2 * 3))");

        let send = Expr::new(
            ExprKind::Send {
                receiver: Box::new(Expr::ident("oWin", span())),
                method: Ident::new("Show", span()),
                args: Some(vec![]),
            },
            span(),
        );
        assert_eq!(format!("{send}"), "oWin:Show()");

        let block = Expr::new(
            ExprKind::CodeBlock {
                params: vec![Ident::new("a", span()), Ident::new("b", span())],
                body: vec![binary(BinOp::Add, Expr::ident("a", span()), Expr::ident("b", span()))],
            },
            span(),
        );
        assert_eq!(format!("{block}"), "{|a, b| (a + b)}");
    }

    #[test]
    fn display_nested_statements() {
        let inner = Stmt::new(StmtKind::Exit, span());
        let loop_stmt = Stmt::new(
            StmtKind::While {
                cond: Expr::literal(LiteralKind::Boolean, ".T.", span()),
                body: Block::new(vec![inner], span()),
            },
            span(),
        );
        let stmt = Stmt::new(
            StmtKind::If {
                cond: Expr::ident("lOk", span()),
                then_block: Block::new(vec![loop_stmt], span()),
                else_block: None,
            },
            span(),
        );
        assert_eq!(
            format!("{stmt}"),
            "IF lOk\n    WHILE .T.\n        EXIT\n    ENDDO\nENDIF"
        );
    }

    #[test]
    fn dump_expression_tree() {
        let expr = binary(BinOp::Add, num("1"), binary(BinOp::Mul, num("2"), num("3")));
        assert_eq!(expr.dump(), "Add(Number(1), Mul(Number(2), Number(3)))");
        assert_eq!(Expr::missing(4).dump(), "Ident(<missing>)");
    }

    #[test]
    fn dump_program() {
        let ret = Stmt::new(StmtKind::Return(Some(num("2"))), span());
        let program = Program::new(
            vec![Stmt::new(
                StmtKind::If {
                    cond: num("1"),
                    then_block: Block::new(vec![ret], span()),
                    else_block: None,
                },
                span(),
            )],
            span(),
        );
        assert_eq!(program.dump(), "If(Number(1))\n    Then\n        Return(Number(2))\n");
    }
}
