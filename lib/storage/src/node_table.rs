use dashmap::DashMap;
use datafusion::arrow::array::{
    ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampMicrosecondBuilder,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};
use triplesql_common::error::{CorruptionError, StorageError};
use triplesql_common::schema::NodeColumn;
use triplesql_common::{NodeLoader, NodeResolver};
use triplesql_model::{NodeContent, NodeId, Term, TermRef};

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

/// The Arrow schema of the node table.
pub static NODES_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let field = |column: NodeColumn, data_type: DataType, nullable: bool| {
        Field::new(column.name(), data_type, nullable)
    };
    Arc::new(Schema::new(vec![
        field(NodeColumn::Id, DataType::Int64, false),
        field(NodeColumn::Kind, DataType::Utf8, false),
        field(NodeColumn::Uri, DataType::Utf8, true),
        field(NodeColumn::Content, DataType::Utf8, false),
        field(NodeColumn::IntContent, DataType::Int64, true),
        field(NodeColumn::DoubleContent, DataType::Float64, true),
        field(
            NodeColumn::DateContent,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        field(NodeColumn::AnonId, DataType::Utf8, true),
        field(NodeColumn::ContentHash, DataType::Int64, true),
        field(NodeColumn::Language, DataType::Utf8, true),
        field(NodeColumn::Datatype, DataType::Utf8, true),
    ]))
});

/// Interns RDF terms as rows of the node table.
///
/// Every distinct term is stored once. Node ids are allocated from a counter and are never
/// reused, even if no triple references the node anymore.
#[derive(Debug)]
pub struct MemNodeTable {
    /// Contains the next free node id.
    next_id: AtomicI64,
    term2id: FxDashMap<Term, NodeId>,
    id2node: FxDashMap<NodeId, (Term, NodeContent)>,
}

impl Default for MemNodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemNodeTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            term2id: DashMap::with_hasher(BuildHasherDefault::default()),
            id2node: DashMap::with_hasher(BuildHasherDefault::default()),
        }
    }

    /// Returns the id of `term`, storing it first if it is new.
    pub fn intern(&self, term: TermRef<'_>) -> NodeId {
        let term = term.into_owned();
        if let Some(id) = self.term2id.get(&term) {
            return *id;
        }
        *self
            .term2id
            .entry(term.clone())
            .or_insert_with(|| {
                let id = NodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                let content = NodeContent::from_term(term.as_ref());
                self.id2node.insert(id, (term, content));
                id
            })
            .value()
    }

    /// Returns the id of `term` if it is stored.
    pub fn get(&self, term: TermRef<'_>) -> Option<NodeId> {
        self.term2id.get(&term.into_owned()).map(|id| *id)
    }

    pub fn term(&self, id: NodeId) -> Option<Term> {
        self.id2node.get(&id).map(|entry| entry.0.clone())
    }

    pub fn len(&self) -> usize {
        self.id2node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2node.is_empty()
    }

    /// Copies the table into a single [`RecordBatch`] with the schema [`NODES_SCHEMA`].
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let mut rows = self
            .id2node
            .iter()
            .map(|entry| (*entry.key(), entry.value().1.clone()))
            .collect::<Vec<_>>();
        rows.sort_unstable_by_key(|(id, _)| *id);

        let mut id = Int64Builder::with_capacity(rows.len());
        let mut kind = StringBuilder::new();
        let mut uri = StringBuilder::new();
        let mut content = StringBuilder::new();
        let mut int_content = Int64Builder::with_capacity(rows.len());
        let mut double_content = Float64Builder::with_capacity(rows.len());
        let mut date_content = TimestampMicrosecondBuilder::with_capacity(rows.len());
        let mut anon_id = StringBuilder::new();
        let mut content_hash = Int64Builder::with_capacity(rows.len());
        let mut language = StringBuilder::new();
        let mut datatype = StringBuilder::new();
        for (node_id, node) in rows {
            id.append_value(node_id.as_i64());
            kind.append_value(node.kind.as_str());
            uri.append_option(node.uri);
            content.append_value(node.content);
            int_content.append_option(node.int_content);
            double_content.append_option(node.double_content);
            date_content.append_option(node.date_content);
            anon_id.append_option(node.anon_id);
            content_hash.append_option(node.content_hash);
            language.append_option(node.language);
            datatype.append_option(node.datatype);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(id.finish()),
            Arc::new(kind.finish()),
            Arc::new(uri.finish()),
            Arc::new(content.finish()),
            Arc::new(int_content.finish()),
            Arc::new(double_content.finish()),
            Arc::new(date_content.finish()),
            Arc::new(anon_id.finish()),
            Arc::new(content_hash.finish()),
            Arc::new(language.finish()),
            Arc::new(datatype.finish()),
        ];
        RecordBatch::try_new(Arc::clone(&NODES_SCHEMA), columns)
    }
}

impl NodeResolver for MemNodeTable {
    fn resolve(&self, term: TermRef<'_>) -> Result<Option<NodeId>, StorageError> {
        Ok(self.get(term))
    }
}

impl NodeLoader for MemNodeTable {
    fn load(&self, id: NodeId) -> Result<Term, StorageError> {
        self.term(id)
            .ok_or_else(|| CorruptionError::unknown_node(id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triplesql_model::{Literal, NamedNode};

    #[test]
    fn terms_are_interned_once() {
        let table = MemNodeTable::new();
        let a = NamedNode::new_unchecked("http://e/a");
        let first = table.intern(a.as_ref().into());
        let second = table.intern(a.as_ref().into());
        let other = table.intern(Literal::from(1).as_ref().into());
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a.as_ref().into()), Some(first));
        assert_eq!(table.load(first).unwrap(), Term::from(a));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let table = MemNodeTable::new();
        assert!(table.load(NodeId::new(42)).is_err());
        assert_eq!(
            table
                .resolve(NamedNode::new_unchecked("http://e/a").as_ref().into())
                .unwrap(),
            None
        );
    }

    #[test]
    fn record_batch_has_one_row_per_node() {
        let table = MemNodeTable::new();
        table.intern(NamedNode::new_unchecked("http://e/a").as_ref().into());
        table.intern(Literal::from(3).as_ref().into());
        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), Arc::clone(&NODES_SCHEMA));
    }
}
