use crate::node_table::MemNodeTable;
use crate::triple_table::{EncodedTriple, MemTripleTable};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use std::sync::Arc;
use triplesql_common::error::StorageError;
use triplesql_common::{NodeLoader, NodeResolver};
use triplesql_model::{GraphNameRef, NodeId, QuadRef, Term, TermRef};

/// An in-memory quad store laid out as a triple table and a node table.
///
/// Quads in the default graph are stored with a `NULL` context.
#[derive(Debug, Default)]
pub struct MemStorage {
    nodes: Arc<MemNodeTable>,
    triples: MemTripleTable,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node table of this store.
    pub fn nodes(&self) -> &Arc<MemNodeTable> {
        &self.nodes
    }

    /// Returns `true` if the quad was not already present.
    pub fn insert(&self, quad: QuadRef<'_>) -> bool {
        let triple = EncodedTriple {
            subject: self.nodes.intern(quad.subject.into()),
            predicate: self.nodes.intern(quad.predicate.into()),
            object: self.nodes.intern(quad.object),
            context: match quad.graph_name {
                GraphNameRef::NamedNode(node) => Some(self.nodes.intern(node.into())),
                GraphNameRef::BlankNode(node) => Some(self.nodes.intern(node.into())),
                GraphNameRef::DefaultGraph => None,
            },
        };
        self.triples.insert(triple)
    }

    /// Returns `true` if the quad was present.
    pub fn remove(&self, quad: QuadRef<'_>) -> bool {
        self.encode(quad)
            .is_some_and(|triple| self.triples.remove(&triple))
    }

    pub fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.encode(quad)
            .is_some_and(|triple| self.triples.contains(&triple))
    }

    /// The number of quads in the store.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Copies both tables into record batches. The first batch holds the triples.
    pub fn snapshot(&self) -> Result<(RecordBatch, RecordBatch), ArrowError> {
        Ok((
            self.triples.to_record_batch()?,
            self.nodes.to_record_batch()?,
        ))
    }

    /// Looks up the ids of an existing quad without storing new nodes.
    fn encode(&self, quad: QuadRef<'_>) -> Option<EncodedTriple> {
        let context = match quad.graph_name {
            GraphNameRef::NamedNode(node) => Some(self.nodes.get(node.into())?),
            GraphNameRef::BlankNode(node) => Some(self.nodes.get(node.into())?),
            GraphNameRef::DefaultGraph => None,
        };
        Some(EncodedTriple {
            subject: self.nodes.get(quad.subject.into())?,
            predicate: self.nodes.get(quad.predicate.into())?,
            object: self.nodes.get(quad.object)?,
            context,
        })
    }
}

impl NodeResolver for MemStorage {
    fn resolve(&self, term: TermRef<'_>) -> Result<Option<NodeId>, StorageError> {
        self.nodes.resolve(term)
    }
}

impl NodeLoader for MemStorage {
    fn load(&self, id: NodeId) -> Result<Term, StorageError> {
        self.nodes.load(id)
    }
}
