use triplesql_logical::rules::{PatternRewriteRule, SetOperationPushDownRule};
use triplesql_logical::Normalizer;
use triplesql_model::algebra::{
    Expression, GraphPattern, ProjectionElem, QuadPattern, TaggedColumn,
};
use triplesql_model::{NamedNode, Variable};

fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

fn quad(s: &str, p: &str, o: &str) -> GraphPattern {
    QuadPattern::new(
        var(s),
        NamedNode::new_unchecked(format!("http://example.com/{p}")),
        var(o),
    )
    .into()
}

/// True if no set operation is a direct child of a join or the left child of an optional join.
fn is_normalized(pattern: &GraphPattern) -> bool {
    match pattern {
        GraphPattern::Join { left, right } => {
            !left.is_set_operation()
                && !right.is_set_operation()
                && is_normalized(left)
                && is_normalized(right)
        }
        GraphPattern::LeftJoin { left, right, .. } => {
            !left.is_set_operation() && is_normalized(left) && is_normalized(right)
        }
        GraphPattern::Union { left, right }
        | GraphPattern::Intersection { left, right }
        | GraphPattern::Difference { left, right } => is_normalized(left) && is_normalized(right),
        GraphPattern::Filter { inner, .. }
        | GraphPattern::Extend { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::OrderBy { inner, .. } => is_normalized(inner),
        _ => true,
    }
}

#[test]
fn join_with_union_on_the_left_is_distributed() {
    let pattern = GraphPattern::join(
        GraphPattern::union(quad("s", "a", "o"), quad("s", "b", "o")),
        quad("s", "c", "x"),
    );

    let normalized = Normalizer::default().normalize(pattern);

    assert_eq!(
        normalized,
        GraphPattern::union(
            GraphPattern::join(quad("s", "a", "o"), quad("s", "c", "x")),
            GraphPattern::join(quad("s", "b", "o"), quad("s", "c", "x")),
        )
    );
}

#[test]
fn join_with_union_on_the_right_is_distributed() {
    let pattern = GraphPattern::join(
        quad("s", "c", "x"),
        GraphPattern::difference(quad("s", "a", "o"), quad("s", "b", "o")),
    );

    let normalized = Normalizer::default().normalize(pattern);

    assert_eq!(
        normalized,
        GraphPattern::difference(
            GraphPattern::join(quad("s", "c", "x"), quad("s", "a", "o")),
            GraphPattern::join(quad("s", "c", "x"), quad("s", "b", "o")),
        )
    );
}

#[test]
fn optional_keeps_its_filter_in_every_branch() {
    let filter = Expression::Bound(var("x"));
    let pattern = GraphPattern::left_join(
        GraphPattern::union(quad("s", "a", "o"), quad("s", "b", "o")),
        quad("s", "c", "x"),
        Some(filter.clone()),
    );

    let normalized = Normalizer::default().normalize(pattern);

    assert_eq!(
        normalized,
        GraphPattern::union(
            GraphPattern::left_join(quad("s", "a", "o"), quad("s", "c", "x"), Some(filter.clone())),
            GraphPattern::left_join(quad("s", "b", "o"), quad("s", "c", "x"), Some(filter)),
        )
    );
}

#[test]
fn optional_union_on_the_right_is_kept() {
    let pattern = GraphPattern::left_join(
        quad("s", "a", "o"),
        GraphPattern::union(quad("s", "b", "x"), quad("s", "c", "x")),
        None,
    );

    let normalized = Normalizer::default().normalize(pattern.clone());

    assert_eq!(normalized, pattern);
}

#[test]
fn nested_unions_are_fully_distributed() {
    let pattern = GraphPattern::project(
        GraphPattern::join(
            GraphPattern::union(quad("s", "a", "o"), quad("s", "b", "o")),
            GraphPattern::union(quad("s", "c", "x"), quad("s", "d", "x")),
        ),
        vec![var("s")],
    );

    let normalized = Normalizer::default().normalize(pattern);

    assert!(is_normalized(&normalized));
    let GraphPattern::Project { inner, .. } = &normalized else {
        panic!("Projection must stay on top: {normalized:?}");
    };
    let GraphPattern::Union { left, right } = inner.as_ref() else {
        panic!("Expected a union below the projection: {inner:?}");
    };
    assert!(left.is_set_operation(), "Expected a nested union: {left:?}");
    assert!(right.is_set_operation(), "Expected a nested union: {right:?}");
}

#[test]
fn normalization_is_idempotent() {
    let patterns = [
        GraphPattern::join(
            GraphPattern::union(quad("s", "a", "o"), quad("s", "b", "o")),
            GraphPattern::intersection(quad("s", "c", "x"), quad("s", "d", "x")),
        ),
        GraphPattern::left_join(
            GraphPattern::join(
                quad("s", "a", "o"),
                GraphPattern::union(quad("s", "b", "o"), quad("o", "b", "s")),
            ),
            quad("s", "c", "x"),
            None,
        ),
        GraphPattern::filter(
            GraphPattern::join(quad("s", "a", "o"), quad("o", "b", "x")),
            Expression::Bound(var("x")),
        ),
    ];

    let normalizer = Normalizer::default();
    for pattern in patterns {
        let once = normalizer.normalize(pattern);
        assert!(is_normalized(&once), "Not normalized: {once:?}");
        let twice = SetOperationPushDownRule::new().rewrite(once.clone());
        assert_eq!(once, twice);
    }
}

#[test]
fn multi_projection_is_tagged() {
    let projections = vec![
        vec![
            ProjectionElem {
                source: var("s"),
                target: var("subject"),
            },
            ProjectionElem {
                source: var("o"),
                target: var("object"),
            },
        ],
        vec![ProjectionElem {
            source: var("o"),
            target: var("subject"),
        }],
    ];
    let pattern = GraphPattern::MultiProject {
        inner: Box::new(quad("s", "a", "o")),
        projections,
    };

    let normalized = Normalizer::default().normalize(pattern);

    assert_eq!(
        normalized,
        GraphPattern::TaggedProject {
            inner: Box::new(quad("s", "a", "o")),
            columns: vec![
                TaggedColumn {
                    branch: 0,
                    source: var("s"),
                    target: var("subject"),
                },
                TaggedColumn {
                    branch: 0,
                    source: var("o"),
                    target: var("object"),
                },
                TaggedColumn {
                    branch: 1,
                    source: var("o"),
                    target: var("subject"),
                },
            ],
        }
    );
}
