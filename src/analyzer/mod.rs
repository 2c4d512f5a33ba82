mod error;
mod semantic_visitor;
mod symbol_table;
mod ty;

pub use error::*;
pub use semantic_visitor::*;
pub use symbol_table::*;
pub use ty::*;

use crate::parser::Program;

/// Type-checks `program`, returning the populated symbol table or every
/// diagnostic found, in source order.
pub fn analyze(program: &Program) -> Result<SymbolTable, Vec<SemanticError>> {
    let mut table = SymbolTable::new();
    let mut visitor = SemanticVisitor::new();
    visitor.visit_program(&mut table, program);

    let errors = visitor.into_errors();
    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}
