//! Parser — recursive descent for declarations and statements, layered
//! precedence climbing for expressions.
//!
//! Expressions use one function per precedence tier, lowest first:
//!
//! ```text
//! expression         relational  = <> < <= > >=   (at most one, no chaining)
//! simple_expression  additive    + - or           (left fold)
//! term               multiplic.  * / and          (left fold)
//! factor             not, literals, calls, ( ... )
//! ```
//!
//! The parser looks one token ahead, never backtracks and never recovers:
//! the first token that does not fit aborts the parse with a
//! [`SyntaxError`] naming what was expected, what was found and where.

use crate::ast::*;
use crate::errors::SyntaxError;
use crate::token::{Span, Token, TokenKind};

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Parse a complete token stream into a [`Program`].
pub fn parse_program(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// A stream that does not end in `Eof` gets one appended after its
    /// last token, so running off the end reads as end-of-stream.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line, t.span.column + 1))
                .unwrap_or_else(|| Span::at(1, 1));
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self { tokens, current: 0 }
    }

    /// `Program := GlobalDecls Block '.'`
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let start = self.current_span();
        let declarations = self.global_declarations()?;
        let main = self.block()?;
        let end = self.current_span();
        self.expect(TokenKind::Dot, "'.' at the end of the program")?;
        let span = start.merge(end);
        tracing::debug!(declarations = declarations.len(), "parsed program");
        Ok(Program {
            declarations,
            main,
            span,
        })
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn global_declarations(&mut self) -> ParseResult<Vec<Decl>> {
        let mut declarations = Vec::new();

        while self.match_token(TokenKind::Var) {
            // One `var` introduces one or more `names: type;` lines.
            loop {
                declarations.push(Decl::Var(self.var_declaration()?));
                if !matches!(self.peek_kind(), TokenKind::Identifier(_)) {
                    break;
                }
            }
        }

        loop {
            match self.peek_kind() {
                TokenKind::Procedure => {
                    declarations.push(Decl::Procedure(self.procedure_declaration()?))
                }
                TokenKind::Function => {
                    declarations.push(Decl::Function(self.function_declaration()?))
                }
                _ => break,
            }
        }

        Ok(declarations)
    }

    /// `VarList ':' Type ';'`
    fn var_declaration(&mut self) -> ParseResult<VarDecl> {
        let start = self.current_span();
        let names = self.ident_list()?;
        self.expect(TokenKind::Colon, "':' after the variable names")?;
        let ty = self.parse_type()?;
        let end = self.current_span();
        self.expect(TokenKind::Semicolon, "';' after the variable declaration")?;
        Ok(VarDecl {
            names,
            ty,
            span: start.merge(end),
        })
    }

    /// `ident (',' ident)*`
    fn ident_list(&mut self) -> ParseResult<Vec<Ident>> {
        let mut names = vec![self.expect_identifier()?];
        while self.match_token(TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn parse_type(&mut self) -> ParseResult<Type> {
        match self.peek_kind() {
            TokenKind::Integer => {
                self.advance_token();
                Ok(Type::Integer)
            }
            TokenKind::Boolean => {
                self.advance_token();
                Ok(Type::Boolean)
            }
            _ => Err(self.error_here("type 'integer' or 'boolean'")),
        }
    }

    /// `'procedure' ident ['(' [ParamList] ')'] ';' Block ';'`
    fn procedure_declaration(&mut self) -> ParseResult<ProcDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Procedure, "'procedure'")?;
        let name = self.expect_identifier()?;

        let params = if self.match_token(TokenKind::LParen) {
            let params = self.optional_param_list()?;
            self.expect(TokenKind::RParen, "')' after the parameter list")?;
            params
        } else {
            Vec::new()
        };

        self.expect(TokenKind::Semicolon, "';' after the procedure header")?;
        let body = self.block()?;
        let end = self.current_span();
        self.expect(TokenKind::Semicolon, "';' after the procedure body")?;

        Ok(ProcDecl {
            name,
            params,
            body,
            span: start.merge(end),
        })
    }

    /// `'function' ident '(' [ParamList] ')' ':' Type ';' Block ';'`
    fn function_declaration(&mut self) -> ParseResult<FuncDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Function, "'function'")?;
        let name = self.expect_identifier()?;

        self.expect(TokenKind::LParen, "'(' after the function name")?;
        let params = self.optional_param_list()?;
        self.expect(TokenKind::RParen, "')' after the parameter list")?;
        self.expect(TokenKind::Colon, "':' before the return type")?;
        let return_type = self.parse_type()?;
        self.expect(TokenKind::Semicolon, "';' after the function header")?;

        let body = self.block()?;
        let end = self.current_span();
        self.expect(TokenKind::Semicolon, "';' after the function body")?;

        Ok(FuncDecl {
            name,
            params,
            return_type,
            body,
            span: start.merge(end),
        })
    }

    /// `Param (';' Param)*`, or nothing when the next token is `)`.
    fn optional_param_list(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(params);
        }
        params.push(self.param()?);
        while self.match_token(TokenKind::Semicolon) {
            params.push(self.param()?);
        }
        Ok(params)
    }

    /// `VarList ':' Type`
    fn param(&mut self) -> ParseResult<Param> {
        let start = self.current_span();
        let names = self.ident_list()?;
        self.expect(TokenKind::Colon, "':' after the parameter names")?;
        let ty = self.parse_type()?;
        Ok(Param {
            names,
            ty,
            span: start.merge(self.previous_span()),
        })
    }

    // ── Blocks and statements ────────────────────────────────────────

    /// `'begin' StmtList 'end'`. Empty statements are allowed, so
    /// `begin end` and a `;` right before `end` are accepted.
    fn block(&mut self) -> ParseResult<Block> {
        let start = self.current_span();
        self.expect(TokenKind::Begin, "'begin'")?;

        let mut statements = Vec::new();
        loop {
            if self.check(TokenKind::End) {
                break;
            }
            if self.match_token(TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.statement()?);
            if !self.match_token(TokenKind::Semicolon) {
                break;
            }
        }

        let end = self.current_span();
        self.expect(TokenKind::End, "'end'")?;
        Ok(Block {
            statements,
            span: start.merge(end),
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Writeln => self.write_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Break => Ok(self.keyword_statement(StmtKind::Break)),
            TokenKind::Continue => Ok(self.keyword_statement(StmtKind::Continue)),
            TokenKind::Identifier(_) => self.assign_or_call(),
            _ => Err(self.error_here("statement")),
        }
    }

    fn keyword_statement(&mut self, kind: StmtKind) -> Stmt {
        let token = self.advance_token();
        Stmt {
            kind,
            span: token.span,
        }
    }

    /// `ident ':=' Expr` or `ident '(' [ExprList] ')'`
    fn assign_or_call(&mut self) -> ParseResult<Stmt> {
        let target = self.expect_identifier()?;

        if self.match_token(TokenKind::Assign) {
            let value = self.expression()?;
            let span = target.span.merge(value.span);
            return Ok(Stmt {
                kind: StmtKind::Assign { target, value },
                span,
            });
        }

        if self.check(TokenKind::LParen) {
            let call = self.call_arguments(target)?;
            let span = call.callee.span.merge(self.previous_span());
            return Ok(Stmt {
                kind: StmtKind::Call(call),
                span,
            });
        }

        Err(self.error_here("':=' or '(' after identifier"))
    }

    /// `'if' Expr 'then' Block ['else' Block]`
    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect(TokenKind::If, "'if'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::Then, "'then' after the if condition")?;
        let then_block = self.block()?;

        let else_block = if self.match_token(TokenKind::Else) {
            Some(self.block()?)
        } else {
            None
        };

        let end = else_block.as_ref().map_or(then_block.span, |b| b.span);
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            span: start.merge(end),
        })
    }

    /// `'while' Expr 'do' Block`
    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect(TokenKind::While, "'while'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::Do, "'do' after the while condition")?;
        let body = self.block()?;
        let span = start.merge(body.span);
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            span,
        })
    }

    /// `'writeln' '(' [ExprList] ')'`
    fn write_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect(TokenKind::Writeln, "'writeln'")?;
        self.expect(TokenKind::LParen, "'(' after 'writeln'")?;
        let args = self.optional_expr_list()?;
        let end = self.current_span();
        self.expect(TokenKind::RParen, "')' after the writeln arguments")?;
        Ok(Stmt {
            kind: StmtKind::Write(args),
            span: start.merge(end),
        })
    }

    /// `'return' [Expr]`. The value is omitted when the statement ends
    /// right after the keyword.
    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect(TokenKind::Return, "'return'")?;

        let value = if matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::End | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.expression()?)
        };

        let span = start.merge(value.as_ref().map_or(start, |e| e.span));
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span,
        })
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// `SimpleExpr [relOp SimpleExpr]`. A second relational operator is
    /// left for the caller, which will reject it.
    fn expression(&mut self) -> ParseResult<Expr> {
        let left = self.simple_expression()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => BinOp::Eq,
            TokenKind::NotEq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::LtEq => BinOp::Lte,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::GtEq => BinOp::Gte,
            _ => return Ok(left),
        };
        self.advance_token();
        let right = self.simple_expression()?;
        Ok(binary(op, left, right))
    }

    /// `Term (('+' | '-' | 'or') Term)*`
    fn simple_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::Or => BinOp::Or,
                _ => break,
            };
            self.advance_token();
            let right = self.term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `Factor (('*' | '/' | 'and') Factor)*`
    fn term(&mut self) -> ParseResult<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::And => BinOp::And,
                _ => break,
            };
            self.advance_token();
            let right = self.factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Identifier(_) => {
                let ident = self.expect_identifier()?;
                if self.check(TokenKind::LParen) {
                    let call = self.call_arguments(ident)?;
                    let span = start.merge(self.previous_span());
                    Ok(Expr {
                        kind: ExprKind::Call(call),
                        span,
                    })
                } else {
                    Ok(Expr {
                        kind: ExprKind::Ident(ident.name),
                        span: ident.span,
                    })
                }
            }
            TokenKind::Int(n) => {
                self.advance_token();
                Ok(Expr {
                    kind: ExprKind::IntLit(n),
                    span: start,
                })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance_token();
                Ok(Expr {
                    kind: ExprKind::BoolLit(token.kind == TokenKind::True),
                    span: start,
                })
            }
            TokenKind::LParen => {
                self.advance_token();
                let inner = self.expression()?;
                let end = self.current_span();
                self.expect(TokenKind::RParen, "')' after the expression")?;
                Ok(Expr {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: start.merge(end),
                })
            }
            TokenKind::Not => {
                self.advance_token();
                let operand = self.factor()?;
                let span = start.merge(operand.span);
                Ok(Expr {
                    kind: ExprKind::Not(Box::new(operand)),
                    span,
                })
            }
            _ => Err(self.error_here("factor")),
        }
    }

    /// `'(' [ExprList] ')'` following a callee name.
    fn call_arguments(&mut self, callee: Ident) -> ParseResult<Call> {
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.optional_expr_list()?;
        self.expect(TokenKind::RParen, "')' after the call arguments")?;
        Ok(Call { callee, args })
    }

    /// `Expr (',' Expr)*`, or nothing when the next token is `)`.
    fn optional_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(exprs);
        }
        exprs.push(self.expression()?);
        while self.match_token(TokenKind::Comma) {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    // ── Token helpers ────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof, which is never consumed.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance_token(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        *self.peek_kind() == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance_token();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<()> {
        if self.check(kind) {
            self.advance_token();
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<Ident> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span: self.current_span(),
                };
                self.advance_token();
                Ok(ident)
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            span: token.span,
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.current.saturating_sub(1)].span
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}
