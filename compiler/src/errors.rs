//! Error types for every compilation stage, plus rich terminal reporting.
//!
//! Each stage fails fast with its own error type. [`Error`] is the sum the
//! pipeline driver returns; [`CompileError`] turns any of them into a
//! miette diagnostic with the offending source underlined.

use crate::ast::Type;
use crate::token::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A scanner error. The lexer skips the offending text and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {}, column {})", span.line, span.column)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// The first token mismatch met by the parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found: {found} (line {}, column {})", span.line, span.column)]
pub struct SyntaxError {
    /// The construct the parser was looking for, e.g. `'begin'`.
    pub expected: String,
    /// The literal value of the token actually found, or `end-of-stream`.
    pub found: String,
    pub span: Span,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("undeclared identifier '{name}'")]
    Undeclared { name: String, span: Span },

    #[error("'{name}' is already declared in this scope")]
    Redeclared { name: String, span: Span },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
        span: Span,
    },

    #[error("'{name}' expects {expected} argument(s), but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("'{name}' is not a variable")]
    NotAVariable { name: String, span: Span },

    #[error("'{name}' is not a procedure or function")]
    NotCallable { name: String, span: Span },

    #[error("procedure '{name}' does not produce a value")]
    NoValue { name: String, span: Span },

    #[error("'{keyword}' outside of a while loop")]
    OutsideLoop { keyword: &'static str, span: Span },

    #[error("'return' outside of a procedure or function")]
    ReturnOutsideRoutine { span: Span },

    #[error("procedure '{name}' cannot return a value")]
    UnexpectedReturnValue { name: String, span: Span },

    #[error("function '{name}' must return a value of type {expected}")]
    MissingReturnValue {
        name: String,
        expected: Type,
        span: Span,
    },
}

impl SemanticError {
    pub fn span(&self) -> Span {
        match self {
            SemanticError::Undeclared { span, .. }
            | SemanticError::Redeclared { span, .. }
            | SemanticError::TypeMismatch { span, .. }
            | SemanticError::ArityMismatch { span, .. }
            | SemanticError::NotAVariable { span, .. }
            | SemanticError::NotCallable { span, .. }
            | SemanticError::NoValue { span, .. }
            | SemanticError::OutsideLoop { span, .. }
            | SemanticError::ReturnOutsideRoutine { span }
            | SemanticError::UnexpectedReturnValue { span, .. }
            | SemanticError::MissingReturnValue { span, .. } => *span,
        }
    }
}

/// Failures of the IR generator. Only reachable with trees that skipped
/// semantic analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("'break' outside of a loop during IR generation")]
    BreakOutsideLoop { span: Span },

    #[error("'continue' outside of a loop during IR generation")]
    ContinueOutsideLoop { span: Span },
}

impl GenError {
    pub fn span(&self) -> Span {
        match self {
            GenError::BreakOutsideLoop { span } | GenError::ContinueOutsideLoop { span } => *span,
        }
    }
}

/// Symbol table misuse. The analyzer maps these onto [`SemanticError`]s
/// with the span of the offending declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol '{0}' is already declared in this scope")]
    AlreadyDeclared(String),

    #[error("symbol '{0}' not found")]
    NotFound(String),
}

/// Any failure of the lex → parse → analyze → generate pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("lexical error: {0}")]
    Lex(#[from] LexError),

    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("generation error: {0}")]
    Generation(#[from] GenError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Lex(e) => e.span,
            Error::Syntax(e) => e.span,
            Error::Semantic(e) => e.span(),
            Error::Generation(e) => e.span(),
        }
    }

    /// Attach source text for rich reporting.
    pub fn to_report(&self, src: &str) -> CompileError {
        let label = match self {
            Error::Lex(_) => "not valid here",
            Error::Syntax(_) => "unexpected token",
            Error::Semantic(_) => "rejected here",
            Error::Generation(_) => "cannot lower this",
        };
        CompileError::new(self.to_string(), src, self.span(), label)
    }
}

/// A compiler error with source location information.
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,

    #[source_code]
    pub src: String,

    #[label("{label}")]
    pub span: SourceSpan,

    pub label: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>, src: &str, span: Span, label: impl Into<String>) -> Self {
        let start = span.start.min(src.len());
        let len = span.end.saturating_sub(span.start).max(1).min(src.len() - start);
        Self {
            message: message.into(),
            src: src.to_string(),
            span: (start, len).into(),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_message() {
        let err = SyntaxError {
            expected: "'begin'".into(),
            found: "end-of-stream".into(),
            span: Span::at(3, 7),
        };
        assert_eq!(
            err.to_string(),
            "expected 'begin', found: end-of-stream (line 3, column 7)"
        );
    }

    #[test]
    fn test_pipeline_error_keeps_span() {
        let err: Error = SemanticError::Undeclared {
            name: "y".into(),
            span: Span::new(4, 5, 1, 5),
        }
        .into();
        assert_eq!(err.span().column, 5);
        assert!(err.to_string().starts_with("semantic error: undeclared identifier"));
    }

    #[test]
    fn test_report_span_clamped_to_source() {
        let err: Error = SyntaxError {
            expected: "'.'".into(),
            found: "end-of-stream".into(),
            span: Span::new(40, 40, 2, 1),
        }
        .into();
        let report = err.to_report("begin end");
        assert_eq!(report.span.offset(), 9);
        assert_eq!(report.span.len(), 0);
    }
}
