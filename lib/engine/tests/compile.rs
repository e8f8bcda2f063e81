use std::collections::HashMap;
use std::sync::Arc;
use triplesql_common::error::{CompileError, CorruptionError, StorageError};
use triplesql_common::{
    CastPolicy, CompilerOptions, NodeLoader, NodeResolver, SqlDialect, SqlRow, SqlValue,
};
use triplesql_engine::results::RowUnpacker;
use triplesql_engine::sparql::Query;
use triplesql_engine::{ColumnKind, SqlCompiler, ValueType};
use triplesql_model::algebra::{
    Expression, Function, GraphPattern, OrderExpression, PropertyPathExpression, QuadPattern,
};
use triplesql_model::{Literal, NamedNode, NodeId, NodeKind, Term, TermRef, Variable};

fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

fn iri(value: &str) -> NamedNode {
    NamedNode::new_unchecked(value)
}

fn quad(subject: &str, predicate: &str, object: &str) -> GraphPattern {
    GraphPattern::quad(QuadPattern::new(
        var(subject),
        iri(predicate),
        var(object),
    ))
}

fn options() -> CompilerOptions {
    CompilerOptions::default()
        .with_preloaded_constants(false)
        .with_deleted_triples(true)
}

fn compile(pattern: &GraphPattern, options: CompilerOptions) -> String {
    SqlCompiler::new(options)
        .compile(pattern, None)
        .unwrap()
        .sql()
        .to_owned()
}

fn compile_err(pattern: &GraphPattern, options: CompilerOptions) -> CompileError {
    SqlCompiler::new(options).compile(pattern, None).unwrap_err()
}

#[derive(Default)]
struct Nodes {
    ids: HashMap<Term, NodeId>,
    terms: HashMap<NodeId, Term>,
}

impl Nodes {
    fn with(mut self, id: i64, term: impl Into<Term>) -> Self {
        let term = term.into();
        self.ids.insert(term.clone(), NodeId::new(id));
        self.terms.insert(NodeId::new(id), term);
        self
    }
}

impl NodeResolver for Nodes {
    fn resolve(&self, term: TermRef<'_>) -> Result<Option<NodeId>, StorageError> {
        Ok(self.ids.get(&term.into_owned()).copied())
    }
}

impl NodeLoader for Nodes {
    fn load(&self, id: NodeId) -> Result<Term, StorageError> {
        self.terms
            .get(&id)
            .cloned()
            .ok_or_else(|| CorruptionError::unknown_node(id).into())
    }
}

#[test]
fn select_all_variables_of_a_triple_pattern() {
    let pattern = GraphPattern::quad(QuadPattern::new(var("s"), var("p"), var("o")));
    insta::assert_snapshot!(
        compile(&pattern, CompilerOptions::default()),
        @r#"SELECT t1.subject_id AS "s", t1.predicate_id AS "p", t1.object_id AS "o" FROM triples AS t1 WHERE t1.deleted = FALSE"#
    );
}

#[test]
fn repeated_variable_shares_one_source_column() {
    let pattern = GraphPattern::join(
        quad("s", "http://e/p", "o"),
        quad("o", "http://e/q", "x"),
    );
    let sql = compile(&pattern, options());
    assert!(sql.contains("t2.subject_id = t1.object_id"), "{sql}");
    assert!(sql.contains(r#"t1.object_id AS "o""#), "{sql}");
    assert!(!sql.contains("t2.subject_id AS"), "{sql}");
}

#[test]
fn preloaded_constants_are_inlined() {
    let nodes = Nodes::default().with(7, iri("http://e/p"));
    let compiler = SqlCompiler::new(CompilerOptions::default().with_deleted_triples(true));
    let query = compiler
        .compile(&quad("s", "http://e/p", "o"), Some(&nodes))
        .unwrap();
    insta::assert_snapshot!(
        query.sql(),
        @r#"SELECT t1.subject_id AS "s", t1.object_id AS "o" FROM triples AS t1 WHERE t1.predicate_id = 7"#
    );
}

#[test]
fn union_branches_are_padded_with_null() {
    let pattern = GraphPattern::project(
        GraphPattern::union(quad("s", "http://e/p", "x"), quad("s", "http://e/q", "y")),
        vec![var("x"), var("y")],
    );
    let sql = compile(&pattern, options());
    assert!(sql.starts_with("SELECT * FROM ("), "{sql}");
    assert!(sql.contains(" UNION ALL "), "{sql}");
    assert!(sql.contains(r#"NULL AS "y""#), "{sql}");
    assert!(sql.contains(r#"NULL AS "x""#), "{sql}");
    assert!(sql.contains(r#"t1.object_id AS "x""#), "{sql}");
}

#[test]
fn node_equality_is_false_for_differing_kinds() {
    let pattern = GraphPattern::filter(
        GraphPattern::join(quad("s", "http://e/p", "a"), quad("s", "http://e/q", "b")),
        Expression::equal(Expression::variable("a"), Expression::variable("b")),
    );
    let sql = compile(&pattern, options());
    for kind in NodeKind::ALL {
        let same_kind = format!(
            "v1.node_kind = '{kind}' AND v2.node_kind = '{kind}'",
            kind = kind.as_str()
        );
        assert!(sql.contains(&same_kind), "missing {kind} in {sql}");
    }
    assert!(sql.contains("ELSE FALSE END"), "{sql}");
}

#[test]
fn distinct_with_order_is_a_single_statement() {
    let pattern = GraphPattern::distinct(GraphPattern::project(
        GraphPattern::order_by(
            quad("s", "http://e/p", "o"),
            vec![OrderExpression::Asc(Expression::variable("o"))],
        ),
        vec![var("s"), var("o")],
    ));
    let sql = compile(&pattern, options());
    assert!(sql.starts_with("SELECT DISTINCT "), "{sql}");
    assert!(sql.contains(r#" ORDER BY "_sort0_0""#), "{sql}");
    assert_eq!(sql.matches("SELECT").count(), 1, "{sql}");
}

#[test]
fn distinct_with_order_over_a_set_operation_selects_the_derived_table() {
    let pattern = GraphPattern::distinct(GraphPattern::project(
        GraphPattern::order_by(
            GraphPattern::union(quad("s", "http://e/p", "x"), quad("s", "http://e/q", "x")),
            vec![OrderExpression::Desc(Expression::variable("x"))],
        ),
        vec![var("x")],
    ));
    let sql = compile(&pattern, options());
    assert!(sql.starts_with("SELECT DISTINCT * FROM ("), "{sql}");
    assert!(sql.contains(r#"ORDER BY u1."_sort0_0" DESC"#), "{sql}");
}

#[test]
fn distinct_ordered_by_an_unprojected_variable_groups_the_projection() {
    let pattern = GraphPattern::distinct(GraphPattern::project(
        GraphPattern::order_by(
            quad("s", "http://e/p", "o"),
            vec![OrderExpression::Desc(Expression::variable("o"))],
        ),
        vec![var("s")],
    ));
    let sql = compile(&pattern, options());
    assert!(sql.starts_with(r#"SELECT s1."s" AS "s" FROM (SELECT "#), "{sql}");
    assert!(!sql.contains("DISTINCT"), "{sql}");
    assert!(sql.contains(r#") AS s1 GROUP BY s1."s" ORDER BY "#), "{sql}");
    assert!(
        sql.ends_with(r#"MAX("_sort0_0") DESC, MAX("_sort0_1") DESC, MAX("_sort0_2") DESC"#),
        "{sql}"
    );
}

#[test]
fn distinct_over_a_set_operation_ordered_by_an_unprojected_variable() {
    let pattern = GraphPattern::distinct(GraphPattern::project(
        GraphPattern::order_by(
            GraphPattern::union(quad("s", "http://e/p", "x"), quad("s", "http://e/q", "x")),
            vec![OrderExpression::Asc(Expression::variable("x"))],
        ),
        vec![var("s")],
    ));
    let sql = compile(&pattern, options());
    assert!(sql.starts_with(r#"SELECT s1."s" AS "s" FROM (SELECT * FROM ("#), "{sql}");
    assert!(sql.contains(r#"GROUP BY s1."s" ORDER BY MIN("_sort0_0")"#), "{sql}");
}

#[test]
fn slices_become_limit_and_offset() {
    let pattern = GraphPattern::slice(quad("s", "http://e/p", "o"), 2, Some(5));
    let sql = compile(&pattern, options());
    assert!(sql.ends_with(" LIMIT 5 OFFSET 2"), "{sql}");
}

#[test]
fn unsupported_constructs_name_the_operator() {
    let path = GraphPattern::Path {
        subject: var("s").into(),
        path: PropertyPathExpression::ZeroOrMore(Box::new(PropertyPathExpression::NamedNode(
            iri("http://e/p"),
        ))),
        object: var("o").into(),
    };
    let values = GraphPattern::Values {
        variables: vec![var("x")],
        bindings: vec![vec![Some(Literal::from(1).into())]],
    };
    for (pattern, name) in [(path, "property path"), (values, "VALUES")] {
        let error = compile_err(&pattern, options());
        let CompileError::Unsupported { construct } = &error else {
            panic!("unexpected error {error}");
        };
        assert_eq!(construct, name);
    }
}

#[test]
fn boolean_arithmetic_violates_the_type_contract() {
    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::Greater(
            Box::new(Expression::Add(
                Box::new(Expression::Bound(var("o"))),
                Box::new(Expression::Literal(Literal::from(1))),
            )),
            Box::new(Expression::Literal(Literal::from(0))),
        ),
    );
    let error = compile_err(&pattern, options());
    assert!(matches!(error, CompileError::TypeContract(_)), "{error}");
}

#[test]
fn connectives_require_boolean_operands() {
    let node_operand = Expression::And(
        Box::new(Expression::variable("o")),
        Box::new(Expression::Bound(var("o"))),
    );
    let string_operand = Expression::Not(Box::new(Expression::call(
        Function::Str,
        [Expression::variable("o")],
    )));
    for expression in [node_operand, string_operand] {
        let pattern = GraphPattern::filter(quad("s", "http://e/p", "o"), expression);
        let error = compile_err(&pattern, options());
        assert!(matches!(error, CompileError::TypeContract(_)), "{error}");
    }

    let negated_bound = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::Or(
            Box::new(Expression::Not(Box::new(Expression::Bound(var("o"))))),
            Box::new(Expression::Literal(Literal::from(true))),
        ),
    );
    let sql = compile(&negated_bound, options());
    assert!(sql.contains("NOT (t1.object_id IS NOT NULL) OR TRUE"), "{sql}");
}

#[test]
fn type_predicates_require_a_variable_or_constant() {
    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::call(
            Function::IsIri,
            [Expression::call(Function::Str, [Expression::variable("o")])],
        ),
    );
    let error = compile_err(&pattern, options());
    assert!(matches!(error, CompileError::TypeContract(_)), "{error}");

    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::call(Function::IsIri, [Expression::variable("o")]),
    );
    let sql = compile(&pattern, options());
    assert!(sql.contains("v1.node_kind IN ('uri')"), "{sql}");
}

#[test]
fn negated_equality_requires_both_operands_to_be_bound() {
    let pattern = GraphPattern::filter(
        GraphPattern::left_join(
            quad("s", "http://e/p", "x"),
            quad("s", "http://e/q", "y"),
            None,
        ),
        Expression::Not(Box::new(Expression::equal(
            Expression::variable("x"),
            Expression::variable("y"),
        ))),
    );
    let sql = compile(&pattern, options());
    assert!(
        sql.contains("t1.object_id IS NOT NULL AND t2.object_id IS NOT NULL AND NOT CASE"),
        "{sql}"
    );
}

#[test]
fn regex_needs_vendor_support() {
    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::call(
            Function::Regex,
            [
                Expression::variable("o"),
                Expression::Literal(Literal::new_simple_literal("a.*b")),
            ],
        ),
    );
    let error = compile_err(&pattern, options());
    let CompileError::DialectGap { function, dialect } = &error else {
        panic!("unexpected error {error}");
    };
    assert_eq!(function, "REGEX");
    assert_eq!(*dialect, SqlDialect::Baseline);

    let sql = compile(&pattern, options().with_dialect(SqlDialect::PostgreSql));
    assert!(sql.contains("~ 'a.*b'"), "{sql}");
}

#[test]
fn hashes_are_missing_in_h2() {
    let pattern = GraphPattern::extend(
        quad("s", "http://e/p", "o"),
        var("h"),
        Expression::call(Function::Md5, [Expression::variable("o")]),
    );
    let error = compile_err(&pattern, options().with_dialect(SqlDialect::H2));
    assert!(matches!(error, CompileError::DialectGap { .. }), "{error}");
    let query = SqlCompiler::new(options().with_dialect(SqlDialect::MySql))
        .compile(&pattern, None)
        .unwrap();
    assert_eq!(
        query.extension_types().get(&var("h")),
        Some(&ValueType::String)
    );
}

#[test]
fn cast_policy_controls_numeric_coercion() {
    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::Greater(
            Box::new(Expression::variable("o")),
            Box::new(Expression::Literal(Literal::from(3))),
        ),
    );
    let strict = compile(&pattern, options().with_cast_policy(CastPolicy::Strict));
    assert!(
        strict.contains("CASE WHEN v1.node_kind = 'double' THEN v1.double_content "),
        "{strict}"
    );
    assert!(
        strict.contains("WHEN v1.node_kind = 'int' THEN CAST(v1.int_content AS DOUBLE) END > "),
        "{strict}"
    );
    assert!(strict.contains("END > CAST(3 AS DOUBLE)"), "{strict}");
    assert!(!strict.contains("AS BIGINT"), "{strict}");
    let loose = compile(&pattern, options().with_cast_policy(CastPolicy::Loose));
    let coalesced = "COALESCE(v1.double_content, CAST(v1.int_content AS DOUBLE))";
    assert!(loose.contains(&format!("{coalesced} > CAST(3 AS DOUBLE)")), "{loose}");
    let none = compile(&pattern, options().with_cast_policy(CastPolicy::None));
    assert!(none.contains("v1.int_content > 3"), "{none}");
}

#[test]
fn unknown_constant_under_not_exists_keeps_outer_rows() {
    let nodes = Nodes::default().with(1, iri("http://e/p"));
    let pattern = GraphPattern::filter(
        quad("s", "http://e/p", "o"),
        Expression::Not(Box::new(Expression::Exists(Box::new(quad(
            "s",
            "http://e/unknown",
            "x",
        ))))),
    );
    let query = SqlCompiler::new(CompilerOptions::default().with_deleted_triples(true))
        .compile(&pattern, Some(&nodes))
        .unwrap();
    let sql = query.sql();
    assert!(sql.contains("t1.predicate_id = 1"), "{sql}");
    assert!(sql.contains("NOT EXISTS (SELECT 1 FROM triples AS t2 WHERE "), "{sql}");
    assert!(sql.contains("FALSE"), "{sql}");
}

#[test]
fn unknown_constant_under_minus_keeps_outer_rows() {
    let nodes = Nodes::default().with(1, iri("http://e/p"));
    let pattern = GraphPattern::difference(
        quad("s", "http://e/p", "o"),
        quad("s", "http://e/unknown", "o"),
    );
    let query = SqlCompiler::new(CompilerOptions::default().with_deleted_triples(true))
        .compile(&pattern, Some(&nodes))
        .unwrap();
    let sql = query.sql();
    assert!(sql.contains("NOT EXISTS (SELECT 1 FROM triples AS t2 WHERE "), "{sql}");
    assert!(sql.contains("FALSE"), "{sql}");
}

#[test]
fn minus_is_correlated_on_shared_variables_only() {
    let pattern = GraphPattern::difference(
        quad("s", "http://e/p", "o"),
        quad("s", "http://e/type", "t"),
    );
    let sql = compile(&pattern, options());
    assert!(sql.contains("NOT EXISTS (SELECT 1 FROM triples AS t2"), "{sql}");
    assert!(sql.contains("t2.subject_id = t1.subject_id"), "{sql}");
    assert!(!sql.contains("t2.object_id = "), "{sql}");
    assert!(!sql.contains(" EXCEPT "), "{sql}");

    let disjoint = GraphPattern::difference(
        quad("s", "http://e/p", "o"),
        quad("x", "http://e/type", "y"),
    );
    let sql = compile(&disjoint, options());
    assert!(!sql.contains("EXISTS"), "{sql}");
}

#[test]
fn construct_rows_hold_one_solution_per_template_triple() {
    let prepared = Query::parse(
        "CONSTRUCT { ?s <http://e/q> ?o . ?o <http://e/q> ?s } WHERE { ?s <http://e/p> ?o }",
        None,
    )
    .unwrap()
    .prepare()
    .unwrap();
    let query = SqlCompiler::new(options())
        .compile(prepared.pattern(), None)
        .unwrap();
    assert!(query.is_multi_branch());
    let predicate = query
        .columns()
        .iter()
        .find(|column| column.column == "b0_predicate")
        .unwrap();
    assert_eq!(predicate.kind, ColumnKind::Value(ValueType::Uri));

    let nodes = Arc::new(
        Nodes::default()
            .with(1, iri("http://e/a"))
            .with(2, iri("http://e/b")),
    );
    let columns: Arc<[String]> = query
        .columns()
        .iter()
        .map(|column| column.column.clone())
        .collect();
    let values = query
        .columns()
        .iter()
        .map(|column| match (column.branch, column.variable.as_str()) {
            (_, "predicate") => SqlValue::String("http://e/q".to_owned()),
            (Some(0), "subject") | (Some(1), "object") => SqlValue::Integer(1),
            _ => SqlValue::Integer(2),
        })
        .collect();
    let unpacker = RowUnpacker::new(Arc::new(query), nodes);
    let solutions = unpacker.unpack(&SqlRow::new(columns, values)).unwrap();

    assert_eq!(solutions.len(), 2);
    assert_eq!(solutions[0].get("subject"), Some(&Term::from(iri("http://e/a"))));
    assert_eq!(solutions[0].get("predicate"), Some(&Term::from(iri("http://e/q"))));
    assert_eq!(solutions[1].get("subject"), Some(&Term::from(iri("http://e/b"))));
    assert_eq!(solutions[1].get("object"), Some(&Term::from(iri("http://e/a"))));
}

#[test]
fn unbound_optional_columns_stay_unbound() {
    let pattern = GraphPattern::left_join(
        quad("s", "http://e/p", "o"),
        quad("s", "http://e/q", "x"),
        None,
    );
    let query = SqlCompiler::new(options()).compile(&pattern, None).unwrap();
    assert!(query.sql().contains(" LEFT OUTER JOIN "), "{}", query.sql());

    let nodes = Arc::new(Nodes::default().with(1, iri("http://e/a")).with(2, Literal::from(3)));
    let columns: Arc<[String]> = query
        .columns()
        .iter()
        .map(|column| column.column.clone())
        .collect();
    let values = query
        .columns()
        .iter()
        .map(|column| match column.variable.as_str() {
            "s" => SqlValue::Integer(1),
            "o" => SqlValue::Integer(2),
            _ => SqlValue::Null,
        })
        .collect();
    let unpacker = RowUnpacker::new(Arc::new(query), nodes);
    let solutions = unpacker.unpack(&SqlRow::new(columns, values)).unwrap();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].get("o"), Some(&Term::from(Literal::from(3))));
    assert_eq!(solutions[0].get("x"), None);
}
