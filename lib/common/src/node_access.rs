use crate::error::StorageError;
use triplesql_model::{NodeId, Term, TermRef};

/// Looks up the node id of a constant term.
pub trait NodeResolver: Send + Sync {
    /// Returns `None` if the term is not stored.
    fn resolve(&self, term: TermRef<'_>) -> Result<Option<NodeId>, StorageError>;
}

/// Loads a stored node by its id.
pub trait NodeLoader: Send + Sync {
    fn load(&self, id: NodeId) -> Result<Term, StorageError>;
}
