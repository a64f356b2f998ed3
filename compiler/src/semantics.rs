//! Semantic analysis — scope resolution and type checking.
//!
//! A single top-down walk over the AST with one [`SymbolTable`]:
//!
//! 1. Every global variable and every routine signature is declared in
//!    the global scope first, so routines may call each other regardless
//!    of declaration order.
//! 2. Each routine body is checked in a fresh scope holding its
//!    parameters; each `if`/`while` block gets a scope of its own.
//! 3. The main block is checked last.
//!
//! The language has exactly two types and no coercions: every rule below
//! is an exact type equality. The first violation aborts the analysis.

use crate::ast::*;
use crate::errors::{SemanticError, SymbolError};
use crate::symbols::{Symbol, SymbolKind, SymbolTable, SymbolUpdate};
use crate::token::Span;

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Check a program. On success the finished symbol table is returned; it
/// holds the global scope only.
pub fn analyze_program(program: &Program) -> SemanticResult<SymbolTable> {
    let mut analyzer = Analyzer::new();
    analyzer.check_program(program)?;
    Ok(analyzer.symbols)
}

/// The routine whose body is being checked.
struct Routine {
    name: String,
    /// `None` for procedures.
    return_type: Option<Type>,
}

struct Analyzer {
    symbols: SymbolTable,
    routine: Option<Routine>,
    /// Number of `while` loops enclosing the current statement.
    loop_depth: usize,
}

impl Analyzer {
    fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            routine: None,
            loop_depth: 0,
        }
    }

    fn check_program(&mut self, program: &Program) -> SemanticResult<()> {
        // First pass: declare every global name.
        for decl in &program.declarations {
            match decl {
                Decl::Var(var) => {
                    for name in &var.names {
                        self.declare(name, Symbol::variable(var.ty, name.span))?;
                    }
                }
                Decl::Procedure(proc) => {
                    let params = param_types(&proc.params);
                    self.declare(&proc.name, Symbol::procedure(params, proc.name.span))?;
                }
                Decl::Function(func) => {
                    let params = param_types(&func.params);
                    let symbol = Symbol::function(params, func.return_type, func.name.span);
                    self.declare(&func.name, symbol)?;
                }
            }
        }

        // Second pass: routine bodies, then the main block.
        for decl in &program.declarations {
            match decl {
                Decl::Var(_) => {}
                Decl::Procedure(proc) => {
                    self.check_routine(&proc.name, &proc.params, None, &proc.body)?
                }
                Decl::Function(func) => self.check_routine(
                    &func.name,
                    &func.params,
                    Some(func.return_type),
                    &func.body,
                )?,
            }
        }

        self.check_block(&program.main)
    }

    fn check_routine(
        &mut self,
        name: &Ident,
        params: &[Param],
        return_type: Option<Type>,
        body: &Block,
    ) -> SemanticResult<()> {
        tracing::debug!(routine = %name.name, "checking routine body");
        self.routine = Some(Routine {
            name: name.name.clone(),
            return_type,
        });

        self.symbols.enter_scope();
        let result = flatten_params(params)
            .try_for_each(|(param, ty)| self.declare(param, Symbol::parameter(ty, param.span)))
            .and_then(|()| self.check_statements(&body.statements));
        self.symbols.exit_scope();

        self.routine = None;
        result
    }

    // ── Statements ───────────────────────────────────────────────────

    /// Check a nested block in its own scope.
    fn check_block(&mut self, block: &Block) -> SemanticResult<()> {
        self.symbols.enter_scope();
        let result = self.check_statements(&block.statements);
        self.symbols.exit_scope();
        result
    }

    fn check_statements(&mut self, statements: &[Stmt]) -> SemanticResult<()> {
        statements.iter().try_for_each(|stmt| self.check_stmt(stmt))
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> SemanticResult<()> {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let target_type = self.storage_type(&target.name, target.span)?;
                let value_type = self.expr_type(value)?;
                expect_type(
                    format!("assignment to '{}'", target.name),
                    target_type,
                    value_type,
                    value.span,
                )?;
                let update = SymbolUpdate {
                    assigned: Some(true),
                    ..Default::default()
                };
                self.symbols
                    .update_symbol(&target.name, update)
                    .map_err(|e| symbol_error(e, target.span))
            }

            StmtKind::Call(call) => {
                // A function called for its effect has its result dropped.
                self.check_call(call, stmt.span).map(|_| ())
            }

            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.span),

            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_condition("if condition", cond)?;
                self.check_block(then_block)?;
                match else_block {
                    Some(block) => self.check_block(block),
                    None => Ok(()),
                }
            }

            StmtKind::While { cond, body } => {
                self.check_condition("while condition", cond)?;
                self.loop_depth += 1;
                let result = self.check_block(body);
                self.loop_depth -= 1;
                result
            }

            StmtKind::Break => self.check_in_loop("break", stmt.span),

            StmtKind::Continue => self.check_in_loop("continue", stmt.span),

            StmtKind::Write(args) => args.iter().try_for_each(|arg| self.expr_type(arg).map(|_| ())),
        }
    }

    fn check_condition(&mut self, context: &str, cond: &Expr) -> SemanticResult<()> {
        let ty = self.expr_type(cond)?;
        expect_type(context, Type::Boolean, ty, cond.span)
    }

    fn check_in_loop(&self, keyword: &'static str, span: Span) -> SemanticResult<()> {
        if self.loop_depth == 0 {
            return Err(SemanticError::OutsideLoop { keyword, span });
        }
        Ok(())
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) -> SemanticResult<()> {
        let Some(routine) = &self.routine else {
            return Err(SemanticError::ReturnOutsideRoutine { span });
        };
        let name = routine.name.clone();

        match (routine.return_type, value) {
            (Some(expected), Some(expr)) => {
                let found = self.expr_type(expr)?;
                expect_type(format!("return from '{}'", name), expected, found, expr.span)
            }
            (Some(expected), None) => Err(SemanticError::MissingReturnValue {
                name,
                expected,
                span,
            }),
            (None, Some(expr)) => Err(SemanticError::UnexpectedReturnValue {
                name,
                span: expr.span,
            }),
            (None, None) => Ok(()),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Infer the type of an expression, checking its operands.
    fn expr_type(&mut self, expr: &Expr) -> SemanticResult<Type> {
        match &expr.kind {
            ExprKind::IntLit(_) => Ok(Type::Integer),

            ExprKind::BoolLit(_) => Ok(Type::Boolean),

            ExprKind::Ident(name) => self.storage_type(name, expr.span),

            ExprKind::Paren(inner) => self.expr_type(inner),

            ExprKind::Not(operand) => {
                let ty = self.expr_type(operand)?;
                expect_type("operand of 'not'", Type::Boolean, ty, operand.span)?;
                Ok(Type::Boolean)
            }

            ExprKind::Binary { op, left, right } => {
                let left_type = self.expr_type(left)?;
                let right_type = self.expr_type(right)?;
                self.binary_type(*op, (left_type, left.span), (right_type, right.span))
            }

            ExprKind::Call(call) => match self.check_call(call, expr.span)? {
                Some(ty) => Ok(ty),
                None => Err(SemanticError::NoValue {
                    name: call.callee.name.clone(),
                    span: expr.span,
                }),
            },
        }
    }

    fn binary_type(
        &self,
        op: BinOp,
        (left, left_span): (Type, Span),
        (right, right_span): (Type, Span),
    ) -> SemanticResult<Type> {
        let context = || format!("operand of '{}'", op);

        if op.is_arithmetic() {
            expect_type(context(), Type::Integer, left, left_span)?;
            expect_type(context(), Type::Integer, right, right_span)?;
            Ok(Type::Integer)
        } else if op.is_logical() {
            expect_type(context(), Type::Boolean, left, left_span)?;
            expect_type(context(), Type::Boolean, right, right_span)?;
            Ok(Type::Boolean)
        } else {
            // Relational: both sides integer or both boolean.
            expect_type(context(), left, right, right_span)?;
            Ok(Type::Boolean)
        }
    }

    /// Check a call site and return the callee's result type, `None` for
    /// procedures.
    fn check_call(&mut self, call: &Call, span: Span) -> SemanticResult<Option<Type>> {
        let name = &call.callee.name;
        let symbol = self.resolve(name, call.callee.span)?;
        if !symbol.kind.is_routine() {
            return Err(SemanticError::NotCallable {
                name: name.clone(),
                span: call.callee.span,
            });
        }
        let params = symbol.params.clone();
        let result = symbol.ty;

        if params.len() != call.args.len() {
            return Err(SemanticError::ArityMismatch {
                name: name.clone(),
                expected: params.len(),
                found: call.args.len(),
                span,
            });
        }

        for (index, (arg, expected)) in call.args.iter().zip(params).enumerate() {
            let found = self.expr_type(arg)?;
            expect_type(
                format!("argument {} of '{}'", index + 1, name),
                expected,
                found,
                arg.span,
            )?;
        }

        Ok(result)
    }

    /// Resolve a name that must denote a variable or parameter.
    fn storage_type(&self, name: &str, span: Span) -> SemanticResult<Type> {
        let symbol = self.resolve(name, span)?;
        match (symbol.kind, symbol.ty) {
            (SymbolKind::Variable | SymbolKind::Parameter, Some(ty)) => Ok(ty),
            _ => Err(SemanticError::NotAVariable {
                name: name.to_string(),
                span,
            }),
        }
    }

    fn resolve(&self, name: &str, span: Span) -> SemanticResult<&Symbol> {
        self.symbols
            .lookup_symbol(name)
            .ok_or_else(|| SemanticError::Undeclared {
                name: name.to_string(),
                span,
            })
    }

    fn declare(&mut self, name: &Ident, symbol: Symbol) -> SemanticResult<()> {
        self.symbols
            .declare_symbol(&name.name, symbol)
            .map_err(|e| symbol_error(e, name.span))
    }
}

fn param_types(params: &[Param]) -> Vec<Type> {
    flatten_params(params).map(|(_, ty)| ty).collect()
}

fn expect_type(
    context: impl Into<String>,
    expected: Type,
    found: Type,
    span: Span,
) -> SemanticResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SemanticError::TypeMismatch {
            context: context.into(),
            expected,
            found,
            span,
        })
    }
}

fn symbol_error(err: SymbolError, span: Span) -> SemanticError {
    match err {
        SymbolError::AlreadyDeclared(name) => SemanticError::Redeclared { name, span },
        SymbolError::NotFound(name) => SemanticError::Undeclared { name, span },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse_program;

    fn parse(src: &str) -> Program {
        let mut lexer = Lexer::new(src);
        let tokens = lexer.scan_tokens();
        assert!(lexer.errors().is_empty(), "Lex errors: {:?}", lexer.errors());
        parse_program(tokens).expect("Parse failed")
    }

    fn check_ok(src: &str) -> SymbolTable {
        let program = parse(src);
        match analyze_program(&program) {
            Ok(table) => table,
            Err(e) => panic!("Expected no errors, got: {}", e),
        }
    }

    fn check_err(src: &str) -> SemanticError {
        let program = parse(src);
        analyze_program(&program).expect_err("Expected a semantic error")
    }

    // ── Declarations and scopes ─────────────────────────────────────

    #[test]
    fn test_globals_and_routines_declared() {
        let table = check_ok(
            "var x: integer; ok: boolean;
             procedure p(a: integer); begin end;
             function f(a, b: integer): boolean; begin return a < b end;
             begin x := 1 end.",
        );
        let kinds: Vec<(&str, SymbolKind)> =
            table.global_symbols().map(|(n, s)| (n, s.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("x", SymbolKind::Variable),
                ("ok", SymbolKind::Variable),
                ("p", SymbolKind::Procedure),
                ("f", SymbolKind::Function),
            ]
        );
        let f = table.lookup_symbol("f").unwrap();
        assert_eq!(f.params, vec![Type::Integer, Type::Integer]);
        assert_eq!(f.ty, Some(Type::Boolean));
        assert!(table.lookup_symbol("x").unwrap().assigned);
        assert!(!table.lookup_symbol("ok").unwrap().assigned);
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn test_redeclared_global() {
        let err = check_err("var x: integer; x: boolean; begin end.");
        assert!(matches!(err, SemanticError::Redeclared { ref name, .. } if name == "x"));
        assert_eq!(err.span().column, 17);
    }

    #[test]
    fn test_routine_name_clashes_with_global() {
        let err = check_err("var p: integer; procedure p; begin end; begin end.");
        assert!(matches!(err, SemanticError::Redeclared { .. }));
    }

    #[test]
    fn test_duplicate_parameter() {
        let err = check_err("procedure p(a: integer; a: boolean); begin end; begin end.");
        assert!(matches!(err, SemanticError::Redeclared { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_parameter_shadows_global() {
        check_ok(
            "var a: integer;
             procedure p(a: boolean); begin if a then begin writeln(1) end end;
             begin a := 1 end.",
        );
    }

    #[test]
    fn test_parameters_not_visible_after_routine() {
        let err = check_err("procedure p(n: integer); begin end; begin n := 1 end.");
        assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "n"));
    }

    #[test]
    fn test_forward_reference_between_routines() {
        check_ok(
            "function even(n: integer): boolean; begin if n = 0 then begin return true end; return odd(n - 1) end;
             function odd(n: integer): boolean; begin if n = 0 then begin return false end; return even(n - 1) end;
             begin writeln(even(4)) end.",
        );
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = check_err("begin writeln(y) end.");
        assert_eq!(err.to_string(), "undeclared identifier 'y'");
    }

    // ── Types ───────────────────────────────────────────────────────

    #[test]
    fn test_assignment_type_mismatch() {
        let err = check_err("var x: integer; begin x := true end.");
        assert!(matches!(
            err,
            SemanticError::TypeMismatch { expected: Type::Integer, found: Type::Boolean, .. }
        ));
    }

    #[test]
    fn test_arithmetic_requires_integers() {
        let err = check_err("var x: integer; b: boolean; begin x := x + b end.");
        assert!(matches!(err, SemanticError::TypeMismatch { found: Type::Boolean, .. }));
        assert!(err.to_string().contains("operand of '+'"));
    }

    #[test]
    fn test_logical_requires_booleans() {
        let err = check_err("var b: boolean; begin b := b and 1 end.");
        assert!(matches!(err, SemanticError::TypeMismatch { found: Type::Integer, .. }));
    }

    #[test]
    fn test_not_requires_boolean() {
        let err = check_err("var b: boolean; begin b := not 3 end.");
        assert!(err.to_string().contains("'not'"));
    }

    #[test]
    fn test_relational_operands() {
        check_ok("var b: boolean; x: integer; begin b := x < 3; b := b = true; b := (x > 1) <> b end.");
        let err = check_err("var b: boolean; x: integer; begin b := x = true end.");
        assert!(matches!(
            err,
            SemanticError::TypeMismatch { expected: Type::Integer, found: Type::Boolean, .. }
        ));
    }

    #[test]
    fn test_relational_yields_boolean() {
        let err = check_err("var x: integer; begin x := 1 < 2 end.");
        assert!(matches!(err, SemanticError::TypeMismatch { found: Type::Boolean, .. }));
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let err = check_err("var x: integer; begin while x do begin end end.");
        assert!(err.to_string().contains("while condition"));
        let err = check_err("begin if 1 then begin end end.");
        assert!(err.to_string().contains("if condition"));
    }

    #[test]
    fn test_assign_to_routine_name() {
        let err = check_err("procedure p; begin end; begin p := 1 end.");
        assert!(matches!(err, SemanticError::NotAVariable { .. }));
    }

    // ── Calls ───────────────────────────────────────────────────────

    #[test]
    fn test_arity_mismatch() {
        let err = check_err(
            "procedure p(a, b: integer); begin end;
             begin p(1) end.",
        );
        assert!(matches!(
            err,
            SemanticError::ArityMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let err = check_err(
            "procedure p(a: integer; b: boolean); begin end;
             begin p(1, 2) end.",
        );
        assert!(err.to_string().contains("argument 2 of 'p'"));
    }

    #[test]
    fn test_call_non_routine() {
        let err = check_err("var x: integer; begin x(1) end.");
        assert!(matches!(err, SemanticError::NotCallable { .. }));
    }

    #[test]
    fn test_procedure_has_no_value() {
        let err = check_err("var x: integer; procedure p; begin end; begin x := p() end.");
        assert!(matches!(err, SemanticError::NoValue { ref name, .. } if name == "p"));
    }

    #[test]
    fn test_function_call_as_statement() {
        check_ok("function f(): integer; begin return 1 end; begin f() end.");
    }

    #[test]
    fn test_function_name_is_not_a_value() {
        let err = check_err("var x: integer; function f(): integer; begin return 1 end; begin x := f end.");
        assert!(matches!(err, SemanticError::NotAVariable { .. }));
    }

    // ── Returns ─────────────────────────────────────────────────────

    #[test]
    fn test_return_type_mismatch() {
        let err = check_err(
            "function f(a: integer): integer; begin return a > 0 end;
             begin end.",
        );
        assert!(matches!(
            err,
            SemanticError::TypeMismatch { expected: Type::Integer, found: Type::Boolean, .. }
        ));
    }

    #[test]
    fn test_return_outside_routine() {
        let err = check_err("begin return end.");
        assert!(matches!(err, SemanticError::ReturnOutsideRoutine { .. }));
    }

    #[test]
    fn test_procedure_return() {
        check_ok("procedure p; begin return end; begin p() end.");
        let err = check_err("procedure p; begin return 1 end; begin end.");
        assert!(matches!(err, SemanticError::UnexpectedReturnValue { .. }));
    }

    #[test]
    fn test_function_bare_return() {
        let err = check_err("function f(): boolean; begin return end; begin end.");
        assert!(matches!(
            err,
            SemanticError::MissingReturnValue { expected: Type::Boolean, .. }
        ));
    }

    // ── Loops ───────────────────────────────────────────────────────

    #[test]
    fn test_break_and_continue_in_loop() {
        check_ok(
            "var x: integer;
             begin
               while x > 0 do begin
                 if x = 5 then begin break end;
                 x := x - 1;
                 continue
               end
             end.",
        );
    }

    #[test]
    fn test_break_outside_loop() {
        let err = check_err("begin break end.");
        assert_eq!(err.to_string(), "'break' outside of a while loop");
        let err = check_err("var x: integer; begin while x > 0 do begin end; continue end.");
        assert!(matches!(err, SemanticError::OutsideLoop { keyword: "continue", .. }));
    }

    #[test]
    fn test_loop_depth_does_not_leak_into_routines() {
        // The routine body is checked before main, outside any loop.
        let err = check_err("procedure p; begin break end; begin end.");
        assert!(matches!(err, SemanticError::OutsideLoop { keyword: "break", .. }));
    }

    #[test]
    fn test_first_error_wins() {
        let err = check_err("begin writeln(a); writeln(b) end.");
        assert!(matches!(err, SemanticError::Undeclared { ref name, .. } if name == "a"));
    }
}
