use crate::storage::MemStorage;
use async_trait::async_trait;
use datafusion::arrow::array::{Array, ArrayRef, AsArray};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{
    DataType, Float64Type, Int64Type, TimeUnit, TimestampMicrosecondType,
};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::error::DataFusionError;
use datafusion::prelude::SessionContext;
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use triplesql_common::error::ExecutionError;
use triplesql_common::schema::{NODES_TABLE, TRIPLES_TABLE};
use triplesql_common::{SqlDialect, SqlExecutor, SqlRow, SqlRowStream, SqlValue};

/// Runs statements with [DataFusion](https://datafusion.apache.org/) against a snapshot of a
/// [`MemStorage`].
///
/// Every statement sees the tables as they were when it started.
#[derive(Debug, Clone)]
pub struct DataFusionExecutor {
    storage: Arc<MemStorage>,
}

impl DataFusionExecutor {
    pub fn new(storage: Arc<MemStorage>) -> Self {
        Self { storage }
    }

    fn session(&self) -> Result<SessionContext, DataFusionError> {
        let (triples, nodes) = self.storage.snapshot()?;
        let ctx = SessionContext::new();
        ctx.register_batch(TRIPLES_TABLE, triples)?;
        ctx.register_batch(NODES_TABLE, nodes)?;
        Ok(ctx)
    }
}

#[async_trait]
impl SqlExecutor for DataFusionExecutor {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSql
    }

    async fn execute(&self, sql: &str) -> Result<SqlRowStream, ExecutionError> {
        tracing::debug!(sql, "Executing statement");
        let ctx = self.session().map_err(ExecutionError::engine)?;
        let batches = ctx
            .sql(sql)
            .await
            .map_err(ExecutionError::engine)?
            .execute_stream()
            .await
            .map_err(ExecutionError::engine)?;

        let rows = batches
            .map_err(ExecutionError::engine)
            .map_ok(|batch| {
                tracing::trace!(rows = batch.num_rows(), "Received batch");
                match batch_rows(&batch) {
                    Ok(rows) => stream::iter(rows.into_iter().map(Ok)).left_stream(),
                    Err(error) => stream::once(async move { Err(ExecutionError::engine(error)) })
                        .right_stream(),
                }
            })
            .try_flatten();
        Ok(Box::pin(rows))
    }
}

/// Splits a batch into rows.
fn batch_rows(batch: &RecordBatch) -> Result<Vec<SqlRow>, ArrowError> {
    let schema = batch.schema();
    let names: Arc<[String]> = schema
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    let columns = batch
        .columns()
        .iter()
        .map(column_values)
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = columns
        .into_iter()
        .map(Vec::into_iter)
        .collect::<Vec<_>>();
    let mut rows = Vec::with_capacity(batch.num_rows());
    for _ in 0..batch.num_rows() {
        let values = columns
            .iter_mut()
            .map(|column| column.next().unwrap_or(SqlValue::Null))
            .collect();
        rows.push(SqlRow::new(Arc::clone(&names), values));
    }
    Ok(rows)
}

fn column_values(array: &ArrayRef) -> Result<Vec<SqlValue>, ArrowError> {
    let values: Vec<SqlValue> = match array.data_type() {
        DataType::Null => vec![SqlValue::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|value| value.map_or(SqlValue::Null, SqlValue::Boolean))
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => cast(array, &DataType::Int64)?
            .as_primitive::<Int64Type>()
            .iter()
            .map(|value| value.map_or(SqlValue::Null, SqlValue::Integer))
            .collect(),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            cast(array, &DataType::Float64)?
                .as_primitive::<Float64Type>()
                .iter()
                .map(|value| value.map_or(SqlValue::Null, SqlValue::Double))
                .collect()
        }
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => cast(
            array,
            &DataType::Timestamp(TimeUnit::Microsecond, None),
        )?
        .as_primitive::<TimestampMicrosecondType>()
        .iter()
        .map(|value| value.map_or(SqlValue::Null, SqlValue::Timestamp))
        .collect(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            cast(array, &DataType::Utf8)?
                .as_string::<i32>()
                .iter()
                .map(|value| value.map_or(SqlValue::Null, |v| SqlValue::String(v.to_owned())))
                .collect()
        }
        _ => (0..array.len())
            .map(|idx| {
                if array.is_null(idx) {
                    Ok(SqlValue::Null)
                } else {
                    array_value_to_string(array, idx).map(SqlValue::String)
                }
            })
            .collect::<Result<_, _>>()?,
    };
    Ok(values)
}
