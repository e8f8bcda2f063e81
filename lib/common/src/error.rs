use crate::SqlDialect;
use std::error::Error;
use std::io;
use triplesql_model::NodeId;

/// An error raised while translating a graph pattern into SQL.
///
/// All of these errors are detected before any SQL is handed to a database.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The construct has no SQL translation.
    #[error("The construct '{construct}' cannot be translated to SQL")]
    Unsupported { construct: String },
    /// An operand does not have the type an operator requires.
    #[error("Type mismatch: {0}")]
    TypeContract(String),
    /// The construct has a translation, but not in the target dialect.
    #[error("The function {function} is not available in the {dialect} dialect")]
    DialectGap {
        function: String,
        dialect: SqlDialect,
    },
    /// Resolving a constant against the node table failed.
    #[error(transparent)]
    Resolver(#[from] StorageError),
    /// A compiler invariant does not hold.
    #[error("An internal error that likely indicates a bug in the compiler: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn unsupported<T>(construct: impl Into<String>) -> Result<T, Self> {
        Err(Self::Unsupported {
            construct: construct.into(),
        })
    }

    pub fn type_contract<T>(message: impl Into<String>) -> Result<T, Self> {
        Err(Self::TypeContract(message.into()))
    }

    pub fn dialect_gap<T>(function: impl Into<String>, dialect: SqlDialect) -> Result<T, Self> {
        Err(Self::DialectGap {
            function: function.into(),
            dialect,
        })
    }

    pub fn internal<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(Self::Internal(cause.into()))
    }
}

/// An error related to storage operations (reads, writes, lookups).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Error related to data corruption.
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            StorageError::Corruption(error) => error.into(),
            StorageError::Other(error) => Self::other(error),
        }
    }
}

/// An error returned if some content in the node table is inconsistent.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct CorruptionError(#[from] CorruptionErrorKind);

#[derive(Debug, thiserror::Error)]
enum CorruptionErrorKind {
    #[error("{0}")]
    Msg(String),
    #[error("The node {0} does not exist")]
    UnknownNode(NodeId),
}

impl CorruptionError {
    /// Builds an error from a printable error message.
    #[inline]
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(CorruptionErrorKind::Msg(msg.into()))
    }

    /// Builds an error for a node id that is referenced but not stored.
    #[inline]
    pub fn unknown_node(id: NodeId) -> Self {
        Self(CorruptionErrorKind::UnknownNode(id))
    }
}

impl From<CorruptionError> for io::Error {
    #[inline]
    fn from(error: CorruptionError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

/// An error raised while running compiled SQL or while turning its rows into solutions.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The database rejected the statement or failed while running it.
    #[error("The SQL engine failed: {0}")]
    Engine(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// A row does not have the shape the compiled query announced.
    #[error("Unexpected result row: {0}")]
    Decoding(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExecutionError {
    pub fn engine(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Engine(error.into())
    }

    pub fn decoding<T>(message: impl Into<String>) -> Result<T, Self> {
        Err(Self::Decoding(message.into()))
    }
}
