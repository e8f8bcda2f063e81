//! Compiles graph patterns into SQL over a triple table and a node table, and turns the rows of
//! the compiled statements back into solutions.
//!
//! The [`SqlCompiler`] takes a pattern of the [`triplesql_model::algebra`] and produces a
//! [`CompiledQuery`]. The [`sparql`] module rewrites SPARQL queries into such patterns, and the
//! [`results`] module reads the rows an executor returns for a compiled statement.

pub mod compiler;
pub mod results;
pub mod sparql;

pub use compiler::{ColumnKind, CompiledQuery, OutputColumn, SqlCompiler, ValueType};
