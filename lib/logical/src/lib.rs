//! Rewrites that bring a graph pattern into the shape the SQL compiler expects, and analyses
//! over patterns that the compiler relies on.

mod normalizer;
pub mod rules;
mod variables;

pub use normalizer::Normalizer;
pub use variables::{aggregate_variables, expression_variables, visible_variables};
