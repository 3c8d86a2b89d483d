mod error;
mod semantic_visitor;
mod symbol_table;
mod ty;

pub use error::*;
pub use semantic_visitor::*;
pub use symbol_table::*;
pub use ty::*;

use crate::ast::Node;

/// Runs a fresh analyzer over `program`, handing back the diagnostics and
/// the scopes it built for the generator.
pub fn analyze(program: &Node) -> (Analysis, SymbolTable) {
    let mut visitor = SemanticVisitor::new();
    let analysis = visitor.analyze(program);
    (analysis, visitor.into_symbol_table())
}
