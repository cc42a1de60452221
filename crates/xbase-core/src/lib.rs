//! Xbase Core - front end for Xbase++/Clipper source code
//!
//! This crate provides:
//! - Lexer: context-sensitive tokenization with offset mapping
//! - AST: syntax tree definitions with source spans
//! - Parser: error-tolerant recursive descent that always yields a tree
//! - Mapping: directive stripping with offsets mapped back to the original
//! - Config: `xbase.toml` loading
//!
//! ```
//! use xbase_core::{analyze, FrontendConfig};
//!
//! let source = "#include \"std.ch\"\nFUNCTION Main()\n  ? 'hi'\nRETURN NIL\n";
//! let analysis = analyze(source, &FrontendConfig::default());
//! assert!(!analysis.has_errors());
//! assert_eq!(analysis.result.program.routines().count(), 1);
//! ```

use serde::Serialize;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lexer module - tokenization of Xbase source code
pub mod lexer;

/// Abstract Syntax Tree - parsed representation of Xbase source code
pub mod ast;

/// Parser module - converts tokens into AST
pub mod parser;

/// Offset mapping and directive stripping
pub mod mapping;

/// `xbase.toml` configuration
pub mod config;

pub use config::{ConfigError, FrontendConfig};
pub use lexer::{lex, Lexer, Span, SpannedError, Token, TokenKind};
pub use mapping::{DirectiveFilter, IdentityMap, OffsetMap};
pub use parser::{parse, parse_source, ParseError, ParseResult, Parser};

/// Which stage reported a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Lexical,
    Syntax,
}

/// A diagnostic from either stage, positioned in the original source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub span: Span,
    /// Message without the trailing offset
    pub message: String,
}

/// Everything the front end produces for one source buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Token stream ending in EOF, spans in original-source coordinates
    pub tokens: Vec<Token>,
    /// Lexical errors, mirroring the `Error` tokens in `tokens`
    pub lex_errors: Vec<SpannedError>,
    /// Tree and syntax errors
    pub result: ParseResult,
}

impl Analysis {
    /// Returns true if either stage reported an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.lex_errors.is_empty() || self.result.has_errors()
    }

    /// Both diagnostic channels merged in source order. A syntax error for
    /// an invalid token is left out; the lexical error already covers it.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let lexical = self.lex_errors.iter().map(|e| Diagnostic {
            stage: Stage::Lexical,
            span: e.span,
            message: e.error.to_string(),
        });
        let syntax = self
            .result
            .errors
            .iter()
            .filter(|e| !matches!(e.kind, parser::ParseErrorKind::InvalidToken(_)))
            .map(|e| Diagnostic {
                stage: Stage::Syntax,
                span: e.span,
                message: e.kind.to_string(),
            });
        let mut all: Vec<Diagnostic> = lexical.chain(syntax).collect();
        all.sort_by_key(|d| d.span.start);
        all
    }
}

/// Run the front end over `source`: optional directive stripping, lexing
/// and parsing
#[must_use]
pub fn analyze(source: &str, config: &FrontendConfig) -> Analysis {
    let (tokens, lex_errors) = if config.preprocess.strip_directives {
        let filter = DirectiveFilter::new(source);
        Lexer::tokenize_mapped(filter.text(), &filter)
    } else {
        Lexer::tokenize(source)
    };
    let result = parse(tokens.clone());
    Analysis {
        tokens,
        lex_errors,
        result,
    }
}
