use oxrdfio::RdfParseError;
use std::convert::Infallible;
use std::io;
use triplesql_common::error::{CompileError, ExecutionError, StorageError};
use triplesql_engine::sparql::SparqlSyntaxError;

/// An error raised while answering a SPARQL query with a [`Store`](crate::store::Store).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// The query could not be translated to SQL.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// An error from the storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An error while running the statement or reading its rows.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// An error returned during results serialization.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    /// Graph results were requested from a query that returns solutions.
    #[error("The query results are not an RDF graph")]
    NotAGraph,
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}

impl From<QueryEvaluationError> for io::Error {
    #[inline]
    fn from(error: QueryEvaluationError) -> Self {
        match error {
            QueryEvaluationError::Parsing(error) => Self::new(io::ErrorKind::InvalidData, error),
            QueryEvaluationError::Storage(error) => error.into(),
            QueryEvaluationError::ResultsSerialization(error) => error,
            QueryEvaluationError::Compile(error) => {
                Self::new(io::ErrorKind::Unsupported, error)
            }
            QueryEvaluationError::Execution(error) => Self::other(error),
            QueryEvaluationError::NotAGraph => {
                Self::new(io::ErrorKind::InvalidInput, error.to_string())
            }
        }
    }
}

/// An error raised while loading a file into a [`Store`](crate::store::Store).
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// An error raised while reading the file.
    #[error(transparent)]
    Parsing(#[from] RdfParseError),
}

impl From<LoaderError> for io::Error {
    #[inline]
    fn from(error: LoaderError) -> Self {
        match error {
            LoaderError::Parsing(error) => error.into(),
        }
    }
}
