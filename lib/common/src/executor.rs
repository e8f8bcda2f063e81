use crate::error::ExecutionError;
use crate::SqlDialect;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use triplesql_model::NodeId;

/// A single value of a result row.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reads the value as a node id. Node id columns are always integers.
    pub fn as_node_id(&self) -> Option<NodeId> {
        match self {
            Self::Integer(id) => Some(NodeId::new(*id)),
            _ => None,
        }
    }
}

/// A row returned by a [`SqlExecutor`]. Values are addressed by the column alias of the
/// statement.
#[derive(Clone, Debug, PartialEq)]
pub struct SqlRow {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

/// A stream of result rows. Dropping the stream releases the underlying cursor.
pub type SqlRowStream = Pin<Box<dyn Stream<Item = Result<SqlRow, ExecutionError>> + Send>>;

/// Runs SQL statements against a database holding the triple and node tables.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// The dialect statements for this executor must be compiled for.
    fn dialect(&self) -> SqlDialect;

    /// Starts running `sql`. Rows are produced lazily.
    async fn execute(&self, sql: &str) -> Result<SqlRowStream, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_alias() {
        let row = SqlRow::new(
            Arc::from(vec!["s".to_owned(), "o".to_owned()]),
            vec![SqlValue::Integer(3), SqlValue::Null],
        );
        assert_eq!(row.get("s").and_then(SqlValue::as_node_id), Some(NodeId::new(3)));
        assert_eq!(row.get("o"), Some(&SqlValue::Null));
        assert_eq!(row.get("p"), None);
    }
}
