//! Token types for Tiny Pascal.
//!
//! Each token carries its kind (which doubles as its literal value) and a
//! span locating it in the source. Spans hold both the byte range, used to
//! underline source text in reports, and the 1-based line and column that
//! syntax errors quote.

use std::fmt;

/// Source location of a token or AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span with a line/column position but no byte range, for tokens
    /// built by hand rather than scanned from text.
    pub fn at(line: usize, column: usize) -> Self {
        Self::new(0, 0, line, column)
    }

    /// Merge two spans into one that covers both. The position of the
    /// earlier span is kept.
    pub fn merge(self, other: Span) -> Span {
        let first = if other.start < self.start { other } else { self };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }
}

/// Coarse token classification used at the scanner boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Punctuation,
    EndOfStream,
}

/// All token kinds in Tiny Pascal.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Str(String),

    Identifier(String),

    // Keywords
    Var,
    Integer,
    Boolean,
    Procedure,
    Function,
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    Writeln,
    Break,
    Continue,
    Return,
    True,
    False,
    Not,
    And,
    Or,

    // Operators
    Assign,    // :=
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Eq,        // =
    NotEq,     // <>
    Lt,        // <
    LtEq,      // <=
    Gt,        // >
    GtEq,      // >=

    // Punctuation
    Semicolon, // ;
    Comma,     // ,
    Dot,       // .
    LParen,    // (
    RParen,    // )
    Colon,     // :

    Eof,
}

impl TokenKind {
    /// Look up a keyword. Keywords are case-insensitive.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "var" => TokenKind::Var,
            "integer" => TokenKind::Integer,
            "boolean" => TokenKind::Boolean,
            "procedure" => TokenKind::Procedure,
            "function" => TokenKind::Function,
            "begin" => TokenKind::Begin,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "writeln" => TokenKind::Writeln,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "not" => TokenKind::Not,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            _ => return None,
        };
        Some(kind)
    }

    pub fn category(&self) -> TokenCategory {
        match self {
            TokenKind::Int(_) => TokenCategory::Number,
            TokenKind::Str(_) => TokenCategory::String,
            TokenKind::Identifier(_) => TokenCategory::Identifier,
            TokenKind::Var
            | TokenKind::Integer
            | TokenKind::Boolean
            | TokenKind::Procedure
            | TokenKind::Function
            | TokenKind::Begin
            | TokenKind::End
            | TokenKind::If
            | TokenKind::Then
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::Do
            | TokenKind::Writeln
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Return
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Not
            | TokenKind::And
            | TokenKind::Or => TokenCategory::Keyword,
            TokenKind::Assign
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq => TokenCategory::Operator,
            TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::Colon => TokenCategory::Punctuation,
            TokenKind::Eof => TokenCategory::EndOfStream,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Integer => write!(f, "integer"),
            TokenKind::Boolean => write!(f, "boolean"),
            TokenKind::Procedure => write!(f, "procedure"),
            TokenKind::Function => write!(f, "function"),
            TokenKind::Begin => write!(f, "begin"),
            TokenKind::End => write!(f, "end"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::Writeln => write!(f, "writeln"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Not => write!(f, "not"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Assign => write!(f, ":="),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::NotEq => write!(f, "<>"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Eof => write!(f, "end-of-stream"),
        }
    }
}
