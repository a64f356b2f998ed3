//! TinyPascal compiler core — front end and three-address-code back end
//! for a small Pascal-like language.
//!
//! # Compiler Pipeline
//!
//! ```text
//! Source Code (.tp)
//!     │
//!     ▼
//! ┌───────────┐
//! │  Lexer     │  Tokenizes source into a stream of tokens with spans
//! └────┬──────┘
//!      │
//!      ▼
//! ┌───────────┐
//! │  Parser    │  Recursive descent, fails on the first syntax error
//! └────┬──────┘
//!      │
//!      ▼
//! ┌───────────┐
//! │ Semantics  │  Scoped name resolution + type checking
//! └────┬──────┘
//!      │
//!      ▼
//! ┌───────────┐
//! │  IR gen    │  AST → three-address code (temps, labels, jumps)
//! └────┬──────┘
//!      │
//!      ▼
//! TAC text / structured listing
//! ```

pub mod ast;
pub mod errors;
pub mod ir;
pub mod irgen;
pub mod lexer;
pub mod parser;
pub mod semantics;
pub mod symbols;
pub mod token;

use ast::Program;
use errors::Error;
use ir::Instr;
use lexer::Lexer;
use symbols::SymbolTable;
use token::Token;

/// Tokenize `source`. The first lexical error aborts the pipeline.
pub fn lex(source: &str) -> Result<Vec<Token>, Error> {
    let _span = tracing::info_span!("lex").entered();
    let mut lexer = Lexer::new(source);
    let tokens = lexer.scan_tokens();
    if let Some(err) = lexer.errors().first() {
        return Err(err.clone().into());
    }
    Ok(tokens)
}

/// Tokenize and parse `source`.
pub fn parse(source: &str) -> Result<Program, Error> {
    let tokens = lex(source)?;
    let _span = tracing::info_span!("parse").entered();
    Ok(parser::parse_program(tokens)?)
}

/// Parse and analyze `source`, returning the tree with its global symbols.
pub fn check(source: &str) -> Result<(Program, SymbolTable), Error> {
    let program = parse(source)?;
    let _span = tracing::info_span!("analyze").entered();
    let symbols = semantics::analyze_program(&program)?;
    Ok((program, symbols))
}

/// Run the whole pipeline: `parse_program → analyze_program → generate`.
pub fn compile(source: &str) -> Result<Vec<Instr>, Error> {
    let (program, _) = check(source)?;
    let _span = tracing::info_span!("generate").entered();
    Ok(irgen::generate(&program)?)
}
