//! The graph-pattern algebra accepted by the compiler.
//!
//! The algebra is close to the one produced by a SPARQL parser, but it is not tied to a single
//! query language. Triple patterns carry an optional context, and projections can produce multiple
//! rows per solution (used for CONSTRUCT templates).

mod expression;
mod pattern;

pub use expression::*;
pub use pattern::*;
pub use spargebra::algebra::PropertyPathExpression;
