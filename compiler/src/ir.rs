//! Three-address-code instruction set and its textual projections.
//!
//! A program lowers to one flat `Vec<Instr>`: global `decl`s, then one
//! `section`/`endsection` pair per routine, then the main section.
//! Operands are places, i.e. variable names or generator temporaries
//! (`t1`, `t2`, ...). Literals only appear in `Const`.
//!
//! Two renderings are derived from the same list without regenerating it:
//! [`render_tac`] prints classic three-address code, [`render_list`] a
//! structured one-record-per-instruction listing.

use std::fmt::{self, Write};

use crate::ast::{BinOp, Type};

/// A variable name or a temporary.
pub type Place = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Procedure,
    Function,
    Main,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Procedure => write!(f, "procedure"),
            SectionKind::Function => write!(f, "function"),
            SectionKind::Main => write!(f, "main"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

impl Literal {
    /// Numeric value as stored at runtime; booleans are 1 and 0.
    pub fn value(self) -> i64 {
        match self {
            Literal::Int(n) => n,
            Literal::Bool(b) => i64::from(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Global variable declaration; metadata only.
    Decl { names: Vec<String>, ty: Type },

    /// Start of a routine or of the main program.
    Section {
        kind: SectionKind,
        name: Option<String>,
        params: Vec<(String, Type)>,
        return_type: Option<Type>,
    },

    EndSection {
        kind: SectionKind,
        name: Option<String>,
    },

    /// `target := literal`
    Const { target: Place, value: Literal },

    /// `target := arg`
    Assign { target: Place, arg: Place },

    /// `target := left op right`
    Binary {
        op: BinOp,
        target: Place,
        left: Place,
        right: Place,
    },

    /// `target := not arg`
    Not { target: Place, arg: Place },

    /// `target := call callee(args)`
    Call {
        target: Place,
        callee: String,
        args: Vec<Place>,
    },

    /// Print one value.
    Print { arg: Place },

    Return { arg: Option<Place> },

    Label { label: String },

    Goto { label: String },

    /// Jump to `label` when `cond` is true.
    IfGoto { cond: Place, label: String },

    /// Jump to `label` when `cond` is false.
    IfNotGoto { cond: Place, label: String },
}

// ── Three-address code ──────────────────────────────────────────────

/// Render instructions as three-address code, one statement per line.
pub fn render_tac(code: &[Instr]) -> String {
    let mut out = String::new();
    for instr in code {
        // Writing into a String cannot fail.
        let _ = write_tac(&mut out, instr);
    }
    out
}

fn write_tac(out: &mut String, instr: &Instr) -> fmt::Result {
    match instr {
        Instr::Decl { .. } => Ok(()),
        Instr::Section {
            kind,
            name,
            return_type,
            ..
        } => match kind {
            SectionKind::Main => writeln!(out, ".entry"),
            SectionKind::Procedure => {
                writeln!(out, ".func {} returns void", name.as_deref().unwrap_or(""))
            }
            SectionKind::Function => writeln!(
                out,
                ".func {} returns {}",
                name.as_deref().unwrap_or(""),
                return_type.unwrap_or(Type::Integer)
            ),
        },
        Instr::EndSection { kind, .. } => match kind {
            SectionKind::Main => writeln!(out, "return"),
            SectionKind::Procedure | SectionKind::Function => writeln!(out, ".endfunc"),
        },
        Instr::Const { target, value } => writeln!(out, "{} := {}", target, value.value()),
        Instr::Assign { target, arg } => writeln!(out, "{} := {}", target, arg),
        Instr::Binary {
            op,
            target,
            left,
            right,
        } => writeln!(out, "{} := {} {} {}", target, left, op, right),
        Instr::Not { target, arg } => writeln!(out, "{} := not {}", target, arg),
        Instr::Call {
            target,
            callee,
            args,
        } => {
            for arg in args {
                writeln!(out, "param {}", arg)?;
            }
            writeln!(out, "{} := call {}, {}", target, callee, args.len())
        }
        Instr::Print { arg } => {
            writeln!(out, "param {}", arg)?;
            writeln!(out, "call writeln, 1")
        }
        Instr::Return { arg: Some(arg) } => writeln!(out, "return {}", arg),
        Instr::Return { arg: None } => writeln!(out, "return"),
        Instr::Label { label } => writeln!(out, "{}:", label),
        Instr::Goto { label } => writeln!(out, "goto {}", label),
        Instr::IfGoto { cond, label } => writeln!(out, "if {} goto {}", cond, label),
        Instr::IfNotGoto { cond, label } => writeln!(out, "ifnot {} goto {}", cond, label),
    }
}

// ── Structured listing ──────────────────────────────────────────────

/// One instruction as an `(op, args, result)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub op: &'static str,
    pub args: Vec<String>,
    pub result: Option<String>,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ op: '{}', args: [ ", self.op)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}'", arg)?;
        }
        write!(f, " ]")?;
        if let Some(result) = &self.result {
            write!(f, ", result: '{}'", result)?;
        }
        write!(f, " }}")
    }
}

fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Eq => "eq",
        BinOp::Neq => "neq",
        BinOp::Lt => "lt",
        BinOp::Lte => "le",
        BinOp::Gt => "gt",
        BinOp::Gte => "ge",
    }
}

impl Instr {
    /// Project an instruction onto the listing record.
    pub fn record(&self) -> Record {
        let (op, args, result) = match self {
            Instr::Decl { names, ty } => {
                let mut args = names.clone();
                args.push(format!(":{}", ty));
                ("decl", args, None)
            }
            Instr::Section { kind, name, .. } => ("section", section_args(*kind, name), None),
            Instr::EndSection { kind, name } => ("endsection", section_args(*kind, name), None),
            Instr::Const { target, value } => {
                ("const", vec![value.value().to_string()], Some(target.clone()))
            }
            Instr::Assign { target, arg } => ("mov", vec![arg.clone(), target.clone()], None),
            Instr::Binary {
                op,
                target,
                left,
                right,
            } => (
                binop_name(*op),
                vec![left.clone(), right.clone()],
                Some(target.clone()),
            ),
            Instr::Not { target, arg } => ("not", vec![arg.clone()], Some(target.clone())),
            Instr::Call {
                target,
                callee,
                args,
            } => {
                let mut all = vec![callee.clone()];
                all.extend(args.iter().cloned());
                ("call", all, Some(target.clone()))
            }
            Instr::Print { arg } => ("print", vec![arg.clone()], None),
            Instr::Return { arg } => ("ret", arg.iter().cloned().collect(), None),
            Instr::Label { label } => ("label", vec![label.clone()], None),
            Instr::Goto { label } => ("jmp", vec![label.clone()], None),
            Instr::IfGoto { cond, label } => ("br", vec![cond.clone(), label.clone()], None),
            Instr::IfNotGoto { cond, label } => {
                ("brfalse", vec![cond.clone(), label.clone()], None)
            }
        };
        Record { op, args, result }
    }
}

fn section_args(kind: SectionKind, name: &Option<String>) -> Vec<String> {
    let mut args = vec![kind.to_string()];
    args.extend(name.iter().cloned());
    args
}

/// Render instructions as a `code: [ ... ]` listing of records.
pub fn render_list(code: &[Instr]) -> String {
    let mut out = String::from("code: [\n");
    for instr in code {
        let _ = writeln!(out, "  {},", instr.record());
    }
    out.push_str("]\n");
    out
}
