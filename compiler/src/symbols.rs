//! Scoped symbol table.
//!
//! A stack of scopes, innermost last. The global scope at the bottom is
//! created with the table and never popped. Each scope keeps its symbols
//! in declaration order.

use indexmap::IndexMap;

use crate::ast::Type;
use crate::errors::SymbolError;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Procedure,
    Function,
}

impl SymbolKind {
    /// Variables and parameters hold values; routines do not.
    pub fn is_storage(self) -> bool {
        matches!(self, SymbolKind::Variable | SymbolKind::Parameter)
    }

    pub fn is_routine(self) -> bool {
        matches!(self, SymbolKind::Procedure | SymbolKind::Function)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Value type for variables and parameters, return type for functions,
    /// `None` for procedures.
    pub ty: Option<Type>,
    /// Parameter types of a routine, in order.
    pub params: Vec<Type>,
    /// Set once a variable or parameter has been assigned to.
    pub assigned: bool,
    pub span: Span,
}

impl Symbol {
    pub fn variable(ty: Type, span: Span) -> Self {
        Self {
            kind: SymbolKind::Variable,
            ty: Some(ty),
            params: Vec::new(),
            assigned: false,
            span,
        }
    }

    pub fn parameter(ty: Type, span: Span) -> Self {
        Self {
            kind: SymbolKind::Parameter,
            // Parameters arrive with a value.
            assigned: true,
            ..Self::variable(ty, span)
        }
    }

    pub fn procedure(params: Vec<Type>, span: Span) -> Self {
        Self {
            kind: SymbolKind::Procedure,
            ty: None,
            params,
            assigned: false,
            span,
        }
    }

    pub fn function(params: Vec<Type>, return_type: Type, span: Span) -> Self {
        Self {
            kind: SymbolKind::Function,
            ty: Some(return_type),
            ..Self::procedure(params, span)
        }
    }
}

/// Fields to merge into an existing symbol; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct SymbolUpdate {
    pub assigned: Option<bool>,
}

impl SymbolUpdate {
    fn apply(self, symbol: &mut Symbol) {
        if let Some(assigned) = self.assigned {
            symbol.assigned = assigned;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<IndexMap<String, Symbol>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![IndexMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(IndexMap::new());
        tracing::trace!(depth = self.depth(), "enter scope");
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "exit_scope called on the global scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
        tracing::trace!(depth = self.depth(), "exit scope");
    }

    /// Number of scopes on the stack, global included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare `name` in the innermost scope.
    pub fn declare_symbol(&mut self, name: &str, symbol: Symbol) -> Result<(), SymbolError> {
        let scope = self.innermost_mut();
        if scope.contains_key(name) {
            return Err(SymbolError::AlreadyDeclared(name.to_string()));
        }
        scope.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Find `name`, searching from the innermost scope outward.
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Find `name` in the innermost scope only.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// Merge `update` into the nearest visible binding of `name`.
    pub fn update_symbol(&mut self, name: &str, update: SymbolUpdate) -> Result<(), SymbolError> {
        let symbol = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| SymbolError::NotFound(name.to_string()))?;
        update.apply(symbol);
        Ok(())
    }

    /// Symbols of the global scope, in declaration order.
    pub fn global_symbols(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.scopes[0].iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    fn innermost_mut(&mut self) -> &mut IndexMap<String, Symbol> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}
