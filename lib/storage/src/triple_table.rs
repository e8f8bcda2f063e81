use dashmap::DashMap;
use datafusion::arrow::array::{ArrayRef, BooleanBuilder, Int64Builder};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};
use triplesql_common::schema::{
    CONTEXT_ID, DELETED, OBJECT_ID, PREDICATE_ID, SUBJECT_ID, TRIPLE_ID,
};
use triplesql_model::NodeId;

/// The Arrow schema of the triple table.
pub static TRIPLES_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(TRIPLE_ID, DataType::Int64, false),
        Field::new(SUBJECT_ID, DataType::Int64, false),
        Field::new(PREDICATE_ID, DataType::Int64, false),
        Field::new(OBJECT_ID, DataType::Int64, false),
        Field::new(CONTEXT_ID, DataType::Int64, true),
        Field::new(DELETED, DataType::Boolean, false),
    ]))
});

/// A triple encoded as node ids. A `None` context is the default graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedTriple {
    pub subject: NodeId,
    pub predicate: NodeId,
    pub object: NodeId,
    pub context: Option<NodeId>,
}

#[derive(Clone, Copy, Debug)]
struct TripleRow {
    id: i64,
    deleted: bool,
}

/// Stores triples with a soft-delete flag.
///
/// Removing a triple only marks its row as deleted. Inserting it again clears the flag and keeps
/// the row id.
#[derive(Debug)]
pub struct MemTripleTable {
    next_id: AtomicI64,
    rows: DashMap<EncodedTriple, TripleRow, BuildHasherDefault<FxHasher>>,
}

impl Default for MemTripleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTripleTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: DashMap::with_hasher(BuildHasherDefault::default()),
        }
    }

    /// Returns `true` if the triple was not visible before.
    pub fn insert(&self, triple: EncodedTriple) -> bool {
        let mut inserted = false;
        self.rows
            .entry(triple)
            .and_modify(|row| {
                inserted = row.deleted;
                row.deleted = false;
            })
            .or_insert_with(|| {
                inserted = true;
                TripleRow {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    deleted: false,
                }
            });
        inserted
    }

    /// Returns `true` if the triple was visible before.
    pub fn remove(&self, triple: &EncodedTriple) -> bool {
        match self.rows.get_mut(triple) {
            Some(mut row) if !row.deleted => {
                row.deleted = true;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, triple: &EncodedTriple) -> bool {
        self.rows.get(triple).is_some_and(|row| !row.deleted)
    }

    /// The number of triples that are not deleted.
    pub fn len(&self) -> usize {
        self.rows.iter().filter(|row| !row.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies all rows, including the deleted ones, into a [`RecordBatch`] with the schema
    /// [`TRIPLES_SCHEMA`].
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let mut rows = self
            .rows
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect::<Vec<_>>();
        rows.sort_unstable_by_key(|(_, row)| row.id);

        let mut id = Int64Builder::with_capacity(rows.len());
        let mut subject = Int64Builder::with_capacity(rows.len());
        let mut predicate = Int64Builder::with_capacity(rows.len());
        let mut object = Int64Builder::with_capacity(rows.len());
        let mut context = Int64Builder::with_capacity(rows.len());
        let mut deleted = BooleanBuilder::with_capacity(rows.len());
        for (triple, row) in rows {
            id.append_value(row.id);
            subject.append_value(triple.subject.as_i64());
            predicate.append_value(triple.predicate.as_i64());
            object.append_value(triple.object.as_i64());
            context.append_option(triple.context.map(NodeId::as_i64));
            deleted.append_value(row.deleted);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(id.finish()),
            Arc::new(subject.finish()),
            Arc::new(predicate.finish()),
            Arc::new(object.finish()),
            Arc::new(context.finish()),
            Arc::new(deleted.finish()),
        ];
        RecordBatch::try_new(Arc::clone(&TRIPLES_SCHEMA), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{AsArray, BooleanArray};

    fn triple(context: Option<i64>) -> EncodedTriple {
        EncodedTriple {
            subject: NodeId::new(1),
            predicate: NodeId::new(2),
            object: NodeId::new(3),
            context: context.map(NodeId::new),
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let table = MemTripleTable::new();
        assert!(table.insert(triple(None)));
        assert!(!table.insert(triple(None)));
        assert!(table.insert(triple(Some(4))));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn remove_marks_row_as_deleted() {
        let table = MemTripleTable::new();
        table.insert(triple(None));
        assert!(table.remove(&triple(None)));
        assert!(!table.remove(&triple(None)));
        assert!(!table.contains(&triple(None)));
        assert!(table.is_empty());

        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        let deleted = batch.column(5).as_boolean();
        assert_eq!(deleted, &BooleanArray::from(vec![true]));
    }

    #[test]
    fn reinsert_keeps_row_id() {
        let table = MemTripleTable::new();
        table.insert(triple(None));
        table.remove(&triple(None));
        assert!(table.insert(triple(None)));

        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        let ids = batch
            .column(0)
            .as_primitive::<datafusion::arrow::datatypes::Int64Type>();
        assert_eq!(ids.value(0), 1);
    }
}
