//! A small SQL syntax tree that covers the statements produced by the compiler, together with a
//! renderer for the supported dialects.
//!
//! The tree is built bottom-up by the compiler and rendered once at the end. Rendering never
//! fails: dialect capabilities are checked when the tree is built (see [`Capability`]).

mod ast;
mod dialect;
mod render;

pub use ast::*;
pub use dialect::{Capability, DialectExt};
pub use render::ToSql;
