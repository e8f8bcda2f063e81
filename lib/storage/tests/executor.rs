use futures::TryStreamExt;
use insta::assert_snapshot;
use std::sync::Arc;
use triplesql_common::{SqlDialect, SqlExecutor, SqlRow, SqlValue};
use triplesql_model::{GraphName, Literal, NamedNode, Quad};
use triplesql_storage::{DataFusionExecutor, MemStorage};

fn quad(subject: &str, object: Literal, graph_name: GraphName) -> Quad {
    Quad::new(
        NamedNode::new_unchecked(format!("http://e/{subject}")),
        NamedNode::new_unchecked("http://e/p"),
        object,
        graph_name,
    )
}

fn example_storage() -> Arc<MemStorage> {
    let storage = MemStorage::new();
    storage.insert(quad("a", Literal::from(1), GraphName::DefaultGraph).as_ref());
    storage.insert(quad("b", Literal::from("two"), GraphName::DefaultGraph).as_ref());
    storage.insert(
        quad(
            "c",
            Literal::from(3.5),
            NamedNode::new_unchecked("http://e/g").into(),
        )
        .as_ref(),
    );
    Arc::new(storage)
}

async fn run(executor: &DataFusionExecutor, sql: &str) -> Vec<SqlRow> {
    executor
        .execute(sql)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

fn render(rows: &[SqlRow]) -> String {
    rows.iter()
        .map(|row| {
            row.values()
                .iter()
                .map(|value| match value {
                    SqlValue::Null => "NULL".to_owned(),
                    SqlValue::Boolean(value) => value.to_string(),
                    SqlValue::Integer(value) => value.to_string(),
                    SqlValue::Double(value) => value.to_string(),
                    SqlValue::String(value) => value.clone(),
                    SqlValue::Timestamp(value) => format!("ts:{value}"),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn executor_uses_postgres_dialect() {
    let executor = DataFusionExecutor::new(example_storage());
    assert_eq!(executor.dialect(), SqlDialect::PostgreSql);
}

#[tokio::test]
async fn triples_join_nodes() {
    let executor = DataFusionExecutor::new(example_storage());
    let rows = run(
        &executor,
        "SELECT s.uri AS \"s\", o.node_kind AS \"kind\", o.content AS \"o\" \
         FROM triples t1 \
         INNER JOIN nodes s ON s.id = t1.subject_id \
         INNER JOIN nodes o ON o.id = t1.object_id \
         WHERE t1.context_id IS NULL \
         ORDER BY s.uri",
    )
    .await;

    assert_eq!(rows[0].columns(), ["s", "kind", "o"]);
    assert_snapshot!(render(&rows), @r"
    http://e/a | int | 1
    http://e/b | string | two
    ");
}

#[tokio::test]
async fn deleted_rows_are_flagged() {
    let storage = example_storage();
    storage.remove(quad("a", Literal::from(1), GraphName::DefaultGraph).as_ref());
    let executor = DataFusionExecutor::new(Arc::clone(&storage));

    let rows = run(
        &executor,
        "SELECT t1.deleted AS \"deleted\", COUNT(*) AS \"n\" FROM triples t1 \
         GROUP BY t1.deleted ORDER BY t1.deleted",
    )
    .await;
    assert_snapshot!(render(&rows), @r"
    false | 2
    true | 1
    ");
}

#[tokio::test]
async fn numeric_node_columns_keep_their_type() {
    let executor = DataFusionExecutor::new(example_storage());
    let rows = run(
        &executor,
        "SELECT n.int_content AS \"i\", n.double_content AS \"d\" FROM nodes n \
         WHERE n.node_kind IN ('int', 'double') ORDER BY n.id",
    )
    .await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("i"), Some(&SqlValue::Integer(1)));
    assert_eq!(rows[0].get("d"), Some(&SqlValue::Null));
    assert_eq!(rows[1].get("i"), Some(&SqlValue::Null));
    assert_eq!(rows[1].get("d"), Some(&SqlValue::Double(3.5)));
}

#[tokio::test]
async fn statements_see_a_snapshot() {
    let storage = example_storage();
    let executor = DataFusionExecutor::new(Arc::clone(&storage));
    let stream = executor
        .execute("SELECT t1.id AS \"id\" FROM triples t1")
        .await
        .unwrap();
    storage.insert(quad("d", Literal::from(4), GraphName::DefaultGraph).as_ref());

    let rows: Vec<SqlRow> = stream.try_collect().await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn invalid_statements_are_engine_errors() {
    let executor = DataFusionExecutor::new(example_storage());
    let error = match executor.execute("SELECT missing FROM triples").await {
        Ok(_) => panic!("the statement should be rejected"),
        Err(error) => error,
    };
    assert!(matches!(
        error,
        triplesql_common::error::ExecutionError::Engine(_)
    ));
}
