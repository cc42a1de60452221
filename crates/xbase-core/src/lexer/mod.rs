//! Lexer for Xbase++/Clipper source code
//!
//! The lexer converts a source buffer into a stream of tokens, handling:
//! - Case-insensitive keywords and dot-keywords (`.and.`, `.T.`)
//! - `//`, `&&`, `/* */` and legacy `*` full-line comments
//! - `;` as either a line continuation or a statement separator
//! - Quoted strings with doubled-delimiter and backslash escapes
//! - Bracket path literals (`[C:\data\]`)
//! - Mapping every offset back to the original source
//!
//! Plain operators, punctuation and identifiers come from a logos DFA; the
//! context-sensitive constructs are scanned by hand using the predicates in
//! [`rules`]. Lexing never fails: anything unrecognised becomes an
//! [`TokenKind::Error`] token and scanning continues.

#![allow(clippy::cast_possible_truncation)] // Spans are u32; sources over 4GB are unsupported

pub mod rules;
mod span;
mod token;

pub use span::{LineIndex, Location, Span};
pub use token::TokenKind;

use logos::Logos;
use serde::Serialize;
use thiserror::Error;

use crate::mapping::{IdentityMap, OffsetMap};

static IDENTITY: IdentityMap = IdentityMap;

/// A token with its kind, span, and source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the original source
    pub span: Span,
    /// The token text; decoded content for strings
    pub lexeme: String,
}

impl Token {
    /// Create a new token
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }
}

/// Lexer error types
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LexError {
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("unknown dot keyword '{0}'")]
    UnknownDotKeyword(String),
    #[error("missing closing '.'")]
    UnterminatedDotKeyword,
    #[error("expected a name after '::'")]
    MissingScopedName,
}

/// A lexer error with location information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpannedError {
    pub error: LexError,
    pub span: Span,
}

impl SpannedError {
    #[must_use]
    pub fn new(error: LexError, span: Span) -> Self {
        Self { error, span }
    }
}

impl std::fmt::Display for SpannedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.error, self.span.start)
    }
}

impl std::error::Error for SpannedError {}

/// The Xbase lexer
///
/// Holds the scan cursor, so one instance serves one run; create a new
/// lexer per buffer.
pub struct Lexer<'source> {
    source: &'source str,
    /// Current position in the buffer (byte offset)
    position: usize,
    /// Translates buffer offsets to original-source offsets
    map: &'source dyn OffsetMap,
    /// Collected errors during lexing
    errors: Vec<SpannedError>,
    /// Cached same-line lookaheads for strings and brackets
    lookahead: rules::LineLookahead,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer over original source text
    #[must_use]
    pub fn new(source: &'source str) -> Self {
        Self::with_map(source, &IDENTITY)
    }

    /// Create a lexer over a preprocessed buffer whose offsets are
    /// translated through `map`
    #[must_use]
    pub fn with_map(source: &'source str, map: &'source dyn OffsetMap) -> Self {
        Self {
            source,
            position: 0,
            map,
            errors: Vec::new(),
            lookahead: rules::LineLookahead::new(),
        }
    }

    /// Tokenize the entire source, returning all tokens and any errors
    #[must_use]
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<SpannedError>) {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.collect_all();
        (tokens, lexer.errors)
    }

    /// Tokenize a preprocessed buffer through an offset map
    #[must_use]
    pub fn tokenize_mapped(source: &str, map: &dyn OffsetMap) -> (Vec<Token>, Vec<SpannedError>) {
        let mut lexer = Lexer::with_map(source, map);
        let tokens = lexer.collect_all();
        (tokens, lexer.errors)
    }

    /// Collect all tokens from the source, ending with exactly one EOF
    pub fn collect_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        log::debug!(
            "lexed {} bytes into {} tokens ({} lexical errors)",
            self.source.len(),
            tokens.len(),
            self.errors.len()
        );
        tokens
    }

    /// Get the next token; returns EOF (repeatedly) once the buffer is done
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let Some(&byte) = self.source.as_bytes().get(self.position) else {
                return self.eof();
            };

            match byte {
                b'/' | b'&' if rules::starts_line_comment(self.source, self.position) => {
                    self.skip_line();
                }
                b'/' if self.peek_byte(1) == Some(b'*') => {
                    if let Some(error) = self.block_comment() {
                        return error;
                    }
                }
                b'*' if rules::is_legacy_comment_start(self.source, self.position) => {
                    self.skip_line();
                }
                b';' => {
                    if rules::is_line_continuation(self.source, self.position) {
                        self.position += 1;
                        continue;
                    }
                    let start = self.position;
                    self.position += 1;
                    return self.token(TokenKind::Semicolon, start, ";");
                }
                b'"' | b'\'' => return self.string(byte),
                b'[' => return self.bracket(),
                b'.' => return self.dot_keyword(),
                b'0'..=b'9' => return self.number(),
                b':' if self.peek_byte(1) == Some(b':') => return self.scoped_ident(),
                _ => return self.lex_normal(),
            }
        }
    }

    // ==================== Scanning helpers ====================

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.position + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.source.as_bytes();
        while let Some(b' ' | b'\t' | b'\r' | b'\n' | b'\x0c') = bytes.get(self.position) {
            self.position += 1;
        }
    }

    fn skip_line(&mut self) {
        self.position = rules::line_end(self.source, self.position);
    }

    /// Build a token for buffer range `start..self.position`
    fn token(&self, kind: TokenKind, start: usize, lexeme: impl Into<String>) -> Token {
        Token::new(kind, self.mapped(start, self.position), lexeme)
    }

    /// Build an error token for `start..self.position` and record the error
    fn error_token(&mut self, error: LexError, start: usize) -> Token {
        let span = self.mapped(start, self.position);
        self.errors.push(SpannedError::new(error, span));
        Token::new(TokenKind::Error, span, &self.source[start..self.position])
    }

    fn mapped(&self, start: usize, end: usize) -> Span {
        let span = Span::from_range(start..end);
        self.map.map(span).unwrap_or(span)
    }

    fn eof(&self) -> Token {
        let end = self.source.len();
        Token::new(TokenKind::Eof, self.mapped(end, end), "")
    }

    // ==================== Hand-scanned constructs ====================

    /// Skip a `/* ... */` comment; unterminated comments become one error
    /// token running to the end of input.
    fn block_comment(&mut self) -> Option<Token> {
        let start = self.position;
        if let Some(offset) = self.source[start + 2..].find("*/") {
            self.position = start + 2 + offset + 2;
            return None;
        }
        self.position = self.source.len();
        Some(self.error_token(LexError::UnterminatedBlockComment, start))
    }

    /// Lex a digit run with an optional fraction
    fn number(&mut self) -> Token {
        let start = self.position;
        self.eat_digits();
        if rules::number_fraction_follows(self.source, self.position) {
            self.position += 1;
            self.eat_digits();
        }
        self.token(TokenKind::Number, start, &self.source[start..self.position])
    }

    fn eat_digits(&mut self) {
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.position += 1;
        }
    }

    /// Lex a quoted string. The lexeme is the decoded content.
    fn string(&mut self, quote: u8) -> Token {
        let source = self.source;
        let bytes = source.as_bytes();
        let start = self.position;
        let mut content = String::new();
        let mut i = start + 1;

        loop {
            let Some(c) = source[i..].chars().next() else {
                self.position = i;
                return self.error_token(LexError::UnterminatedString, start);
            };

            match c {
                '\n' | '\r' => {
                    self.position = i;
                    return self.error_token(LexError::UnterminatedString, start);
                }
                _ if c == char::from(quote) => {
                    if bytes.get(i + 1) == Some(&quote) {
                        content.push(c);
                        i += 2;
                        continue;
                    }
                    self.position = i + 1;
                    return self.token(TokenKind::String, start, content);
                }
                '\\' => match bytes.get(i + 1) {
                    Some(b'\\') => {
                        content.push('\\');
                        i += 2;
                    }
                    Some(b'"')
                        if quote == b'"' && self.lookahead.backslash_escapes_quote(source, i) =>
                    {
                        content.push('"');
                        i += 2;
                    }
                    _ => {
                        content.push('\\');
                        i += 1;
                    }
                },
                _ => {
                    content.push(c);
                    i += c.len_utf8();
                }
            }
        }
    }

    /// `[` opens either a bracket path literal or an index/bracket token
    fn bracket(&mut self) -> Token {
        let start = self.position;
        if let Some(close) = self.lookahead.bracket_string_end(self.source, start) {
            self.position = close + 1;
            return self.token(TokenKind::String, start, &self.source[start + 1..close]);
        }
        self.position += 1;
        self.token(TokenKind::LBracket, start, "[")
    }

    /// `.word.` logical operators and constants
    fn dot_keyword(&mut self) -> Token {
        let start = self.position;
        let line_end = rules::line_end(self.source, start + 1);
        let Some(offset) = self.source[start + 1..line_end].find('.') else {
            self.position += 1;
            return self.error_token(LexError::UnterminatedDotKeyword, start);
        };

        let close = start + 1 + offset;
        let word = &self.source[start + 1..close];
        self.position = close + 1;
        match TokenKind::dot_keyword(word) {
            Some(kind) => self.token(kind, start, &self.source[start..self.position]),
            None => self.error_token(LexError::UnknownDotKeyword(word.to_string()), start),
        }
    }

    /// `::name`, optionally with blanks after the colons
    fn scoped_ident(&mut self) -> Token {
        let source = self.source;
        let bytes = source.as_bytes();
        let start = self.position;
        let mut i = start + 2;
        while matches!(bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }

        let name_start = i;
        if !bytes
            .get(i)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_')
        {
            self.position = start + 2;
            return self.error_token(LexError::MissingScopedName, start);
        }
        while bytes
            .get(i)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            i += 1;
        }

        self.position = i;
        let lexeme = format!("::{}", &source[name_start..i]);
        self.token(TokenKind::Ident, start, lexeme)
    }

    /// Lex operators, punctuation and identifiers using logos
    fn lex_normal(&mut self) -> Token {
        let remaining = &self.source[self.position..];
        let mut logos_lexer = TokenKind::lexer(remaining);

        match logos_lexer.next() {
            Some(Ok(kind)) => {
                let span_range = logos_lexer.span();
                let slice = logos_lexer.slice();
                let start = self.position + span_range.start;
                self.position += span_range.end;

                let kind = if kind == TokenKind::Ident {
                    TokenKind::keyword(slice).unwrap_or(TokenKind::Ident)
                } else {
                    kind
                };
                let lexeme = kind.canonical_lexeme().unwrap_or(slice);
                self.token(kind, start, lexeme)
            }
            Some(Err(())) => {
                // Error recovery: one character becomes one error token
                let start = self.position;
                let char_len = remaining.chars().next().map_or(1, char::len_utf8);
                self.position += char_len;
                self.error_token(LexError::UnexpectedChar, start)
            }
            None => self.eof(),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Lex original source text into a token list terminated by EOF
///
/// ```
/// use xbase_core::lexer::{lex, TokenKind};
///
/// let tokens = lex("p:Method()");
/// assert_eq!(tokens[1].kind, TokenKind::Colon);
/// assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
/// ```
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::tokenize(source).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DirectiveFilter;

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    fn strings(source: &str) -> Vec<String> {
        lex(source)
            .into_iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.lexeme)
            .collect()
    }

    #[test]
    fn lex_keywords_any_case() {
        assert_eq!(
            lex_kinds("IF if If ENDIF while EndDo LOCAL static nil"),
            vec![
                TokenKind::If,
                TokenKind::If,
                TokenKind::If,
                TokenKind::EndIf,
                TokenKind::While,
                TokenKind::EndDo,
                TokenKind::Local,
                TokenKind::Static,
                TokenKind::Nil,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn hash_is_not_equal() {
        let tokens = lex("a # b");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Ident, TokenKind::NotEq, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(tokens[1].lexeme, "!=");
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert_eq!(lex("a <> b")[1].lexeme, "!=");
    }

    #[test]
    fn colon_dispatch() {
        assert_eq!(
            lex_kinds("p:Method()"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn scoped_self_reference() {
        let tokens = lex("::cName := 1\n:: nAge");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lexeme, "::cName");
        assert_eq!(tokens[0].span, Span::new(0, 7));
        assert_eq!(tokens[3].lexeme, "::nAge");
        assert_eq!(lex("::")[0].kind, TokenKind::Error);
    }

    #[test]
    fn single_quoted_backslash_pair() {
        let tokens = lex(r"cPath += '\\'");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Error));
        let last = &tokens[tokens.len() - 2];
        assert_eq!(last.kind, TokenKind::String);
        assert_eq!(last.lexeme, "\\");
        assert_eq!(tokens[1].kind, TokenKind::PlusEq);
    }

    #[test]
    fn trailing_backslash_in_double_quotes() {
        let tokens = lex(r#"cDir := "C:\""#);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].lexeme, r"C:\");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn escaped_quote_when_closer_follows() {
        assert_eq!(strings(r#"? "say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn several_escapes_on_one_line() {
        let source = "? \"a\\\"b\", \"C:\\\"\n? \"x\\\"y\"";
        assert_eq!(strings(source), vec![r#"a"b"#, r"C:\", r#"x"y"#]);
        assert_eq!(strings(r"? a[i] + [C:\x\]"), vec![r"C:\x\"]);
    }

    #[test]
    fn single_quote_backslash_is_literal() {
        assert_eq!(strings(r"? 'a\'"), vec![r"a\"]);
    }

    #[test]
    fn doubled_delimiters() {
        assert_eq!(strings(r#"? "a""b", 'it''s', """#), vec![r#"a"b"#, "it's", ""]);
    }

    #[test]
    fn newline_in_string_is_error() {
        let (tokens, errors) = Lexer::tokenize("x := \"abc\ny := 1");
        assert_eq!(tokens[2].kind, TokenKind::Error);
        assert_eq!(tokens[2].lexeme, "\"abc");
        assert_eq!(errors[0].error, LexError::UnterminatedString);
        assert_eq!(tokens[3].kind, TokenKind::Ident);
        assert_eq!(tokens[3].lexeme, "y");
    }

    #[test]
    fn bracket_literals() {
        assert_eq!(
            lex_kinds("[abc]"),
            vec![
                TokenKind::LBracket,
                TokenKind::Ident,
                TokenKind::RBracket,
                TokenKind::Eof
            ]
        );
        let tokens = lex(r"[data\]");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, r"data\");
        assert_eq!(tokens[0].span, Span::new(0, 7));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn numbers_leave_member_dot() {
        let tokens = lex("3.14 10 1.and.x");
        assert_eq!(tokens[0].lexeme, "3.14");
        assert_eq!(tokens[1].lexeme, "10");
        assert_eq!(tokens[2].lexeme, "1");
        assert_eq!(tokens[3].kind, TokenKind::And);
        assert_eq!(tokens[4].kind, TokenKind::Ident);
    }

    #[test]
    fn dot_keywords() {
        assert_eq!(
            lex_kinds(".T. .f. .AND. .or. .Not."),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Eof
            ]
        );
        let (tokens, errors) = Lexer::tokenize("a .xor. b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, ".xor.");
        assert_eq!(errors[0].error, LexError::UnknownDotKeyword("xor".to_string()));
        let (tokens, _) = Lexer::tokenize("a.\nb");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, ".");
        assert_eq!(tokens[2].lexeme, "b");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex_kinds("a // one\nb && two\n/* three\n */ c"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment() {
        let (tokens, errors) = Lexer::tokenize("a /* never\nclosed");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, "/* never\nclosed");
        assert_eq!(tokens[1].span, Span::new(2, 17));
        assert_eq!(errors[0].error, LexError::UnterminatedBlockComment);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn legacy_star_comment() {
        assert_eq!(
            lex_kinds("* header line\n  ** banner\nx := a * b"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Ident,
                TokenKind::Star,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn semicolon_continuation_and_separator() {
        assert_eq!(
            lex_kinds("x := 1 + ;\n  2"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            lex_kinds("a := 1; b := 2"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn operator_spellings() {
        assert_eq!(
            lex_kinds("a = b == c != d -> e => f $ g @ ! h"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Ident,
                TokenKind::EqEq,
                TokenKind::Ident,
                TokenKind::NotEq,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Dollar,
                TokenKind::Ident,
                TokenKind::At,
                TokenKind::Not,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unknown_character_is_single_error() {
        let (tokens, errors) = Lexer::tokenize("a ~ é b");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, "~");
        assert_eq!(tokens[2].kind, TokenKind::Error);
        assert_eq!(tokens[2].lexeme, "é");
        assert_eq!(tokens[3].lexeme, "b");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn spans_are_correct() {
        let tokens = lex("local x := 42");
        assert_eq!(tokens[0].span, Span::new(0, 5));
        assert_eq!(tokens[1].span, Span::new(6, 7));
        assert_eq!(tokens[2].span, Span::new(8, 10));
        assert_eq!(tokens[3].span, Span::new(11, 13));
        assert_eq!(tokens[4].span, Span::new(13, 13));
    }

    #[test]
    fn exactly_one_eof_and_iterator_stops() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(Lexer::new("a b c").count(), 3);
    }

    #[test]
    fn mapped_tokens_point_into_original() {
        let source = "#define MAX 10\nx := y";
        let filter = DirectiveFilter::new(source);
        let (tokens, _) = Lexer::tokenize_mapped(filter.text(), &filter);
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[0].span, Span::new(15, 16));
        assert_eq!(tokens[2].span, Span::new(20, 21));
        assert_eq!(tokens[3].span, Span::empty(21));
    }
}
