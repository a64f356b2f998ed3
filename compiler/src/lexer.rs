//! Lexer — turns Tiny Pascal source text into the token stream the parser
//! consumes.
//!
//! On an unexpected character the lexer records a [`LexError`], skips the
//! character and keeps scanning, so one pass reports every bad character.
//! Every token records its byte range and the line/column of its first
//! character. Keywords are recognised case-insensitively after an
//! identifier has been scanned.

use crate::errors::LexError;
use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'src> {
    source: &'src str,
    chars: Vec<char>,
    start: usize,    // Start of current token (byte offset)
    current: usize,  // Current position (char index)
    byte_pos: usize, // Current byte position
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            start: 0,
            current: 0,
            byte_pos: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source. The returned stream always ends with `Eof`.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.byte_pos;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token();
        }
        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.byte_pos, self.byte_pos, self.line, self.column),
        ));
        tracing::debug!(
            tokens = self.tokens.len(),
            errors = self.errors.len(),
            "scanned source"
        );
        std::mem::take(&mut self.tokens)
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            ' ' | '\t' | '\r' | '\n' => {}

            '/' if self.peek() == '/' => {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            }

            // Brace comments do not nest.
            '{' => {
                while !self.is_at_end() && self.peek() != '}' {
                    self.advance();
                }
                if self.is_at_end() {
                    self.error("Unterminated comment".to_string());
                } else {
                    self.advance();
                }
            }

            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            ';' => self.add_token(TokenKind::Semicolon),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '*' => self.add_token(TokenKind::Star),
            '/' => self.add_token(TokenKind::Slash),
            '=' => self.add_token(TokenKind::Eq),

            ':' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::Assign);
                } else {
                    self.add_token(TokenKind::Colon);
                }
            }

            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq);
                } else if self.match_char('>') {
                    self.add_token(TokenKind::NotEq);
                } else {
                    self.add_token(TokenKind::Lt);
                }
            }

            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq);
                } else {
                    self.add_token(TokenKind::Gt);
                }
            }

            '\'' => self.string(),

            c if c.is_ascii_digit() => self.number(),

            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            _ => self.error(format!("Invalid character '{}'", c)),
        }
    }

    // ── Literal scanners ─────────────────────────────────────────────

    /// `'text'`, with `''` standing for a single quote.
    fn string(&mut self) {
        let mut value = String::new();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                self.error("Unterminated string".to_string());
                return;
            }
            let c = self.advance();
            if c == '\'' {
                if self.match_char('\'') {
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        self.add_token(TokenKind::Str(value));
    }

    fn number(&mut self) {
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
        let text = &self.source[self.start..self.byte_pos];
        match text.parse::<i64>() {
            Ok(n) => self.add_token(TokenKind::Int(n)),
            Err(_) => self.error(format!("Integer literal '{}' out of range", text)),
        }
    }

    fn identifier(&mut self) {
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            self.advance();
        }
        let name = &self.source[self.start..self.byte_pos];
        let kind = TokenKind::keyword(name).unwrap_or_else(|| TokenKind::Identifier(name.to_string()));
        self.add_token(kind);
    }

    // ── Character-level helpers ──────────────────────────────────────

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.byte_pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn token_span(&self) -> Span {
        Span::new(self.start, self.byte_pos, self.start_line, self.start_column)
    }

    fn add_token(&mut self, kind: TokenKind) {
        let span = self.token_span();
        self.tokens.push(Token::new(kind, span));
    }

    fn error(&mut self, message: String) {
        let span = self.token_span();
        self.errors.push(LexError { message, span });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenCategory;

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.scan_tokens();
        assert!(lexer.errors().is_empty(), "Lexer errors: {:?}", lexer.errors());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(lex("007"), vec![TokenKind::Int(7), TokenKind::Eof]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex(":= + - * / = <> < <= > >="),
            vec![
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_colon_vs_assign() {
        assert_eq!(
            lex("x: integer; x:=1"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Colon,
                TokenKind::Integer,
                TokenKind::Semicolon,
                TokenKind::Identifier("x".into()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = lex("BEGIN End wHiLe writeln");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Begin,
                TokenKind::End,
                TokenKind::While,
                TokenKind::Writeln,
                TokenKind::Eof
            ]
        );
        assert!(tokens[..4].iter().all(|k| k.category() == TokenCategory::Keyword));
    }

    #[test]
    fn test_identifiers_keep_case() {
        assert_eq!(
            lex("Total _x a1"),
            vec![
                TokenKind::Identifier("Total".into()),
                TokenKind::Identifier("_x".into()),
                TokenKind::Identifier("a1".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex("'it''s'"),
            vec![TokenKind::Str("it's".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("1 { block } 2 // line\n3"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Int(3), TokenKind::Eof]
        );
    }

    #[test]
    fn test_line_and_column() {
        let mut lexer = Lexer::new("begin\n  x := 10\nend.");
        let tokens = lexer.scan_tokens();
        let positions: Vec<(usize, usize)> =
            tokens.iter().map(|t| (t.span.line, t.span.column)).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (2, 3), (2, 5), (2, 8), (3, 1), (3, 4), (3, 5)]
        );
        assert_eq!(tokens[3].span.start, 13);
        assert_eq!(tokens[3].span.end, 15);
    }

    #[test]
    fn test_error_recovery() {
        let mut lexer = Lexer::new("1 @ 2 # 3");
        let tokens = lexer.scan_tokens();
        assert_eq!(tokens.len(), 4); // 1, 2, 3, EOF
        assert_eq!(lexer.errors().len(), 2);
        assert_eq!(lexer.errors()[0].span.column, 3);
    }

    #[test]
    fn test_unterminated_comment() {
        let mut lexer = Lexer::new("begin { never closed");
        lexer.scan_tokens();
        assert_eq!(lexer.errors().len(), 1);
        assert!(lexer.errors()[0].message.contains("Unterminated"));
    }
}
