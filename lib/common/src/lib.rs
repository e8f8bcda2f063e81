mod blank_node_mode;
mod config;
pub mod error;
mod executor;
mod node_access;
pub mod schema;

pub use blank_node_mode::BlankNodeMatchingMode;
pub use config::{CastPolicy, CompilerOptions, SqlDialect, UnknownOptionError};
pub use executor::{SqlExecutor, SqlRow, SqlRowStream, SqlValue};
pub use node_access::{NodeLoader, NodeResolver};

pub type CompileResult<T> = Result<T, error::CompileError>;
