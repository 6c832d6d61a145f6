//! LR(1) parse table generator.
//!
//! The tables are built from the canonical collection of LR(1) item sets and
//! consumed by the parser in `synan-runtime`.

pub mod build;
pub mod first_sets;
pub mod lr1;
pub mod table;

pub use crate::table::GeneratedTables;

use synan_runtime::grammar::Grammar;

/// Compute the canonical LR(1) parse tables of `grammar`.
pub fn compute(grammar: &Grammar) -> GeneratedTables {
    GeneratedTables::generate(grammar)
}
