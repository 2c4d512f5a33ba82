use std::collections::HashMap;

use thiserror::Error;

use crate::lexer::Position;

use super::Ty;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("cannot exit the global scope")]
    ScopeUnderflow,
    #[error("variable '{name}' is already declared in this scope ({previous})")]
    DuplicateDeclaration { name: String, previous: Position },
    #[error("variable '{name}' is not declared")]
    Undeclared { name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: Ty,
    pub pos: Position,
    /// Unique storage name, `name` or `name.N` when the name was declared before.
    pub slot: String,
}

/// Scoped name bindings. The global scope is created once and never popped.
///
/// Besides the scope stack, the table keeps every symbol ever declared (in
/// declaration order) and the symbol each identifier occurrence resolved to,
/// so that later stages can find the storage slot of any variable after the
/// nested scopes are gone.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, SymbolId>>,
    symbols: Vec<Symbol>,
    bindings: HashMap<Position, SymbolId>,
    name_counts: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            symbols: vec![],
            bindings: HashMap::new(),
            name_counts: HashMap::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) -> Result<(), ScopeError> {
        if self.scopes.len() <= 1 {
            return Err(ScopeError::ScopeUnderflow);
        }
        self.scopes.pop();
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declares `name` in the innermost scope.
    pub fn declare(&mut self, name: &str, ty: Ty, pos: Position) -> Result<SymbolId, ScopeError> {
        let current = self.scopes.len() - 1;
        if let Some(&id) = self.scopes[current].get(name) {
            return Err(ScopeError::DuplicateDeclaration {
                name: name.to_string(),
                previous: self.symbols[id.0].pos,
            });
        }

        let count = self.name_counts.entry(name.to_string()).or_insert(0);
        let slot = if *count == 0 {
            name.to_string()
        } else {
            format!("{}.{}", name, count)
        };
        *count += 1;

        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            ty,
            pos,
            slot,
        });
        self.scopes[current].insert(name.to_string(), id);
        self.bindings.insert(pos, id);
        Ok(id)
    }

    /// Nearest visible declaration of `name`, innermost scope first.
    pub fn lookup(&self, name: &str) -> Result<&Symbol, ScopeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|id| self.get(*id))
            .ok_or_else(|| ScopeError::Undeclared {
                name: name.to_string(),
            })
    }

    /// Records that the identifier at `pos` refers to `id`.
    pub fn bind(&mut self, pos: Position, id: SymbolId) {
        self.bindings.insert(pos, id);
    }

    /// Symbol the identifier at `pos` was bound to during analysis.
    pub fn resolve(&self, pos: Position) -> Option<&Symbol> {
        self.bindings.get(&pos).map(|id| self.get(*id))
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Every declared symbol, in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
