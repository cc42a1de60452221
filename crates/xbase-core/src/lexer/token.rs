//! Token kinds for the Xbase lexer

use logos::Logos;
use serde::Serialize;

/// The kind of token produced by the lexer
///
/// Variants without a logos attribute are produced by the hand-written
/// scanning paths in [`super::Lexer`] (numbers, strings, dot-keywords,
/// semicolons, comments) or by the keyword table.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ========== Keywords (resolved through `TokenKind::keyword`) ==========
    If,
    Then,
    Else,
    ElseIf,
    EndIf,
    While,
    Do,
    EndDo,
    Return,
    Function,
    Procedure,
    EndFunction,
    EndProc,
    Local,
    Static,
    For,
    To,
    Step,
    Next,
    Nil,
    Exit,
    Loop,

    /// `and`, `.and.`
    And,
    /// `or`, `.or.`
    Or,
    /// `not`, `.not.`, `!`
    #[token("!")]
    Not,

    // ========== Literals ==========
    /// Digit run with optional fraction
    Number,
    /// Quoted or bracketed string; the lexeme holds the decoded content
    String,
    /// `.t.` / `.y.`
    True,
    /// `.f.` / `.n.`
    False,

    // ========== Identifiers ==========
    /// Plain identifier, or `::name` for a scoped self reference
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // ========== Operators ==========
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,

    /// `:=`
    #[token(":=")]
    Assign,
    /// Bare `=` compares, it never assigns
    #[token("=")]
    Eq,
    /// `==` exact comparison
    #[token("==")]
    EqEq,
    /// `!=`, `#` and `<>`
    #[token("!=")]
    #[token("#")]
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    /// `$` substring containment
    #[token("$")]
    Dollar,

    /// `->` and `=>`
    #[token("->")]
    #[token("=>")]
    Arrow,
    /// `:` message send
    #[token(":")]
    Colon,
    /// `@` screen addressing
    #[token("@")]
    At,
    /// `?` print with newline
    #[token("?")]
    Question,
    /// `??` print without newline
    #[token("??")]
    DoubleQuestion,
    /// Code block parameter bar
    #[token("|")]
    Pipe,

    // ========== Delimiters ==========
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    /// Statement separator (never a line continuation)
    Semicolon,

    // ========== Special ==========
    /// End of file (added by lexer, not matched by logos)
    Eof,

    /// Lexer error - the lexeme carries the offending text
    Error,
}

impl TokenKind {
    /// Look up a keyword, ignoring ASCII case
    #[must_use]
    pub fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident.to_ascii_lowercase().as_str() {
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "elseif" => Self::ElseIf,
            "endif" => Self::EndIf,
            "while" => Self::While,
            "do" => Self::Do,
            "enddo" => Self::EndDo,
            "return" => Self::Return,
            "function" => Self::Function,
            "procedure" => Self::Procedure,
            "endfunction" => Self::EndFunction,
            "endproc" => Self::EndProc,
            "local" => Self::Local,
            "static" => Self::Static,
            "for" => Self::For,
            "to" => Self::To,
            "step" => Self::Step,
            "next" => Self::Next,
            "nil" => Self::Nil,
            "exit" => Self::Exit,
            "loop" => Self::Loop,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            _ => return None,
        };
        Some(kind)
    }

    /// Map the text between two dots (`.and.`, `.T.`) to its token kind
    #[must_use]
    pub fn dot_keyword(word: &str) -> Option<Self> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "t" | "y" => Self::True,
            "f" | "n" => Self::False,
            _ => return None,
        };
        Some(kind)
    }

    /// Spelling stored as the lexeme when several spellings share one kind
    #[must_use]
    pub const fn canonical_lexeme(self) -> Option<&'static str> {
        match self {
            Self::NotEq => Some("!="),
            _ => None,
        }
    }

    /// Returns true if this token is a keyword
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Then
                | Self::Else
                | Self::ElseIf
                | Self::EndIf
                | Self::While
                | Self::Do
                | Self::EndDo
                | Self::Return
                | Self::Function
                | Self::Procedure
                | Self::EndFunction
                | Self::EndProc
                | Self::Local
                | Self::Static
                | Self::For
                | Self::To
                | Self::Step
                | Self::Next
                | Self::Nil
                | Self::Exit
                | Self::Loop
                | Self::And
                | Self::Or
                | Self::Not
        )
    }

    /// Returns true if this token closes a compound statement
    #[must_use]
    pub const fn is_closer(self) -> bool {
        matches!(
            self,
            Self::EndIf
                | Self::Else
                | Self::ElseIf
                | Self::EndDo
                | Self::Next
                | Self::EndFunction
                | Self::EndProc
        )
    }

    /// Returns true if this token is a literal
    #[must_use]
    pub const fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Number | Self::String | Self::True | Self::False | Self::Nil
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::ElseIf => "ELSEIF",
            Self::EndIf => "ENDIF",
            Self::While => "WHILE",
            Self::Do => "DO",
            Self::EndDo => "ENDDO",
            Self::Return => "RETURN",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::EndFunction => "ENDFUNCTION",
            Self::EndProc => "ENDPROC",
            Self::Local => "LOCAL",
            Self::Static => "STATIC",
            Self::For => "FOR",
            Self::To => "TO",
            Self::Step => "STEP",
            Self::Next => "NEXT",
            Self::Nil => "NIL",
            Self::Exit => "EXIT",
            Self::Loop => "LOOP",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Number => "number",
            Self::String => "string",
            Self::True => ".T.",
            Self::False => ".F.",
            Self::Ident => "identifier",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::PlusEq => "'+='",
            Self::MinusEq => "'-='",
            Self::StarEq => "'*='",
            Self::SlashEq => "'/='",
            Self::Assign => "':='",
            Self::Eq => "'='",
            Self::EqEq => "'=='",
            Self::NotEq => "'!='",
            Self::Lt => "'<'",
            Self::LtEq => "'<='",
            Self::Gt => "'>'",
            Self::GtEq => "'>='",
            Self::Dollar => "'$'",
            Self::Arrow => "'->'",
            Self::Colon => "':'",
            Self::At => "'@'",
            Self::Question => "'?'",
            Self::DoubleQuestion => "'??'",
            Self::Pipe => "'|'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::Eof => "end of file",
            Self::Error => "invalid token",
        };
        f.write_str(text)
    }
}
