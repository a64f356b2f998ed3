//! IR generation — lowers the AST to three-address code.
//!
//! All mutable generation state lives in a [`GenContext`]: the temporary
//! counter, the label counter and the stack of enclosing loops. The
//! context is threaded by `&mut` through the lowering, so one run never
//! observes another's state. Both counters are shared by every routine
//! of a compilation unit and are never reset between sections, which
//! keeps every temporary and label name unique across the whole output.
//!
//! Control flow lowers to labels and jumps:
//!
//! ```text
//! if c then A                 if c then A else B          while c do A
//!   ifnot c goto L_end_n        if c goto L_then_n          L_while_start_n:
//!   A                           goto L_else_m               ifnot c goto L_while_end_m
//! L_end_n:                    L_then_n:                     A
//!                               A                           goto L_while_start_n
//!                               goto L_end_k              L_while_end_m:
//!                             L_else_m:
//!                               B
//!                             L_end_k:
//! ```

use crate::ast::*;
use crate::errors::GenError;
use crate::ir::{Instr, Literal, Place, SectionKind};
use crate::token::Span;

pub type GenResult<T> = Result<T, GenError>;

/// Jump targets of an enclosing `while`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoopLabels {
    start: String,
    end: String,
}

/// Mutable state of one generation run.
#[derive(Debug, Default)]
pub struct GenContext {
    temp_counter: u32,
    label_counter: u32,
    loops: Vec<LoopLabels>,
}

impl GenContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next temporary: `t1`, `t2`, ...
    pub fn new_temp(&mut self) -> Place {
        self.temp_counter += 1;
        format!("t{}", self.temp_counter)
    }

    /// Allocate the next label with the given prefix.
    pub fn new_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", prefix, self.label_counter)
    }

    pub fn temps_allocated(&self) -> u32 {
        self.temp_counter
    }

    pub fn labels_allocated(&self) -> u32 {
        self.label_counter
    }
}

/// Lower a program with fresh counters.
pub fn generate(program: &Program) -> GenResult<Vec<Instr>> {
    generate_with(&mut GenContext::new(), program)
}

/// Lower a program, continuing the numbering held in `ctx`.
pub fn generate_with(ctx: &mut GenContext, program: &Program) -> GenResult<Vec<Instr>> {
    let mut generator = Generator {
        ctx,
        code: Vec::new(),
    };
    generator.lower_program(program)?;
    tracing::debug!(
        instructions = generator.code.len(),
        temps = generator.ctx.temps_allocated(),
        labels = generator.ctx.labels_allocated(),
        "generated IR"
    );
    Ok(generator.code)
}

struct Generator<'ctx> {
    ctx: &'ctx mut GenContext,
    code: Vec<Instr>,
}

impl Generator<'_> {
    fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    fn label(&mut self, label: &str) {
        self.emit(Instr::Label {
            label: label.to_string(),
        });
    }

    fn goto(&mut self, label: &str) {
        self.emit(Instr::Goto {
            label: label.to_string(),
        });
    }

    // ── Program structure ───────────────────────────────────────────

    fn lower_program(&mut self, program: &Program) -> GenResult<()> {
        for decl in &program.declarations {
            match decl {
                Decl::Var(var) => self.emit(Instr::Decl {
                    names: var.names.iter().map(|n| n.name.clone()).collect(),
                    ty: var.ty,
                }),
                Decl::Procedure(proc) => self.lower_routine(
                    SectionKind::Procedure,
                    &proc.name,
                    &proc.params,
                    None,
                    &proc.body,
                )?,
                Decl::Function(func) => self.lower_routine(
                    SectionKind::Function,
                    &func.name,
                    &func.params,
                    Some(func.return_type),
                    &func.body,
                )?,
            }
        }

        self.emit(Instr::Section {
            kind: SectionKind::Main,
            name: None,
            params: Vec::new(),
            return_type: None,
        });
        self.lower_block(&program.main)?;
        self.emit(Instr::EndSection {
            kind: SectionKind::Main,
            name: None,
        });
        Ok(())
    }

    fn lower_routine(
        &mut self,
        kind: SectionKind,
        name: &Ident,
        params: &[Param],
        return_type: Option<Type>,
        body: &Block,
    ) -> GenResult<()> {
        tracing::debug!(%kind, routine = %name.name, "lowering section");
        self.emit(Instr::Section {
            kind,
            name: Some(name.name.clone()),
            params: flatten_params(params)
                .map(|(param, ty)| (param.name.clone(), ty))
                .collect(),
            return_type,
        });
        self.lower_block(body)?;
        self.emit(Instr::EndSection {
            kind,
            name: Some(name.name.clone()),
        });
        Ok(())
    }

    fn lower_block(&mut self, block: &Block) -> GenResult<()> {
        block
            .statements
            .iter()
            .try_for_each(|stmt| self.lower_stmt(stmt))
    }

    // ── Statements ──────────────────────────────────────────────────

    fn lower_stmt(&mut self, stmt: &Stmt) -> GenResult<()> {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let arg = self.lower_expr(value);
                self.emit(Instr::Assign {
                    target: target.name.clone(),
                    arg,
                });
            }

            StmtKind::Call(call) => {
                // The result temp is allocated but nothing reads it.
                self.lower_call(call);
            }

            StmtKind::Return(value) => {
                let arg = value.as_ref().map(|expr| self.lower_expr(expr));
                self.emit(Instr::Return { arg });
            }

            StmtKind::If {
                cond,
                then_block,
                else_block: None,
            } => {
                let cond = self.lower_expr(cond);
                // L_then_ is allocated even though this shape never emits it.
                let _ = self.ctx.new_label("L_then_");
                let end = self.ctx.new_label("L_end_");
                self.emit(Instr::IfNotGoto {
                    cond,
                    label: end.clone(),
                });
                self.lower_block(then_block)?;
                self.label(&end);
            }

            StmtKind::If {
                cond,
                then_block,
                else_block: Some(else_block),
            } => {
                let cond = self.lower_expr(cond);
                let then_label = self.ctx.new_label("L_then_");
                let else_label = self.ctx.new_label("L_else_");
                let end = self.ctx.new_label("L_end_");

                self.emit(Instr::IfGoto {
                    cond,
                    label: then_label.clone(),
                });
                self.goto(&else_label);
                self.label(&then_label);
                self.lower_block(then_block)?;
                self.goto(&end);
                self.label(&else_label);
                self.lower_block(else_block)?;
                self.label(&end);
            }

            StmtKind::While { cond, body } => self.lower_while(cond, body)?,

            StmtKind::Break => {
                let target = self.innermost_loop(stmt.span, true)?.end.clone();
                self.goto(&target);
            }

            StmtKind::Continue => {
                let target = self.innermost_loop(stmt.span, false)?.start.clone();
                self.goto(&target);
            }

            StmtKind::Write(args) => {
                for arg in args {
                    let arg = self.lower_expr(arg);
                    self.emit(Instr::Print { arg });
                }
            }
        }
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) -> GenResult<()> {
        let start = self.ctx.new_label("L_while_start_");
        let end = self.ctx.new_label("L_while_end_");

        self.label(&start);
        let cond = self.lower_expr(cond);
        self.emit(Instr::IfNotGoto {
            cond,
            label: end.clone(),
        });

        self.ctx.loops.push(LoopLabels {
            start: start.clone(),
            end: end.clone(),
        });
        let result = self.lower_block(body);
        self.ctx.loops.pop();
        result?;

        self.goto(&start);
        self.label(&end);
        Ok(())
    }

    fn innermost_loop(&self, span: Span, is_break: bool) -> GenResult<&LoopLabels> {
        self.ctx.loops.last().ok_or(if is_break {
            GenError::BreakOutsideLoop { span }
        } else {
            GenError::ContinueOutsideLoop { span }
        })
    }

    // ── Expressions ─────────────────────────────────────────────────

    /// Lower an expression and return the place holding its value.
    fn lower_expr(&mut self, expr: &Expr) -> Place {
        match &expr.kind {
            ExprKind::IntLit(n) => self.lower_const(Literal::Int(*n)),

            ExprKind::BoolLit(b) => self.lower_const(Literal::Bool(*b)),

            ExprKind::Ident(name) => name.clone(),

            ExprKind::Paren(inner) => self.lower_expr(inner),

            ExprKind::Not(operand) => {
                let arg = self.lower_expr(operand);
                let target = self.ctx.new_temp();
                self.emit(Instr::Not {
                    target: target.clone(),
                    arg,
                });
                target
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                let target = self.ctx.new_temp();
                self.emit(Instr::Binary {
                    op: *op,
                    target: target.clone(),
                    left,
                    right,
                });
                target
            }

            ExprKind::Call(call) => self.lower_call(call),
        }
    }

    fn lower_const(&mut self, value: Literal) -> Place {
        let target = self.ctx.new_temp();
        self.emit(Instr::Const {
            target: target.clone(),
            value,
        });
        target
    }

    /// Arguments are evaluated left to right before the call.
    fn lower_call(&mut self, call: &Call) -> Place {
        let args = call.args.iter().map(|arg| self.lower_expr(arg)).collect();
        let target = self.ctx.new_temp();
        self.emit(Instr::Call {
            target: target.clone(),
            callee: call.callee.name.clone(),
            args,
        });
        target
    }
}
