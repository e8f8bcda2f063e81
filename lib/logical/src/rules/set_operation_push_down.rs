use crate::rules::{map_children, PatternRewriteRule};
use triplesql_model::algebra::GraphPattern;

/// Moves union, intersection, and difference above the joins they are nested in.
///
/// `Join(Union(A, B), C)` becomes `Union(Join(A, C), Join(B, C))`, and likewise for the right
/// operand of a join and the left operand of an optional join. The compiler can then emit each
/// branch as a flat join chain.
///
/// The right operand of an optional join is left in place: `A OPTIONAL (B UNION C)` differs from
/// `(A OPTIONAL B) UNION (A OPTIONAL C)` for every row of `A` that matches only one branch.
#[derive(Debug, Default)]
pub struct SetOperationPushDownRule;

impl SetOperationPushDownRule {
    pub fn new() -> Self {
        Self
    }
}

impl PatternRewriteRule for SetOperationPushDownRule {
    fn name(&self) -> &str {
        "set-operation-push-down"
    }

    fn rewrite(&self, pattern: GraphPattern) -> GraphPattern {
        push_down(pattern)
    }
}

fn push_down(pattern: GraphPattern) -> GraphPattern {
    match map_children(pattern, &mut push_down) {
        GraphPattern::Join { left, right } if left.is_set_operation() => {
            distribute(*left, |branch| GraphPattern::join(branch, (*right).clone()))
        }
        GraphPattern::Join { left, right } if right.is_set_operation() => {
            distribute(*right, |branch| GraphPattern::join((*left).clone(), branch))
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } if left.is_set_operation() => distribute(*left, |branch| {
            GraphPattern::left_join(branch, (*right).clone(), expression.clone())
        }),
        pattern => pattern,
    }
}

/// Applies `wrap` to both operands of `set_operation` and normalizes the results again, as
/// they may contain further set operations.
fn distribute(
    set_operation: GraphPattern,
    wrap: impl Fn(GraphPattern) -> GraphPattern,
) -> GraphPattern {
    match set_operation {
        GraphPattern::Union { left, right } => {
            GraphPattern::union(push_down(wrap(*left)), push_down(wrap(*right)))
        }
        GraphPattern::Intersection { left, right } => {
            GraphPattern::intersection(push_down(wrap(*left)), push_down(wrap(*right)))
        }
        GraphPattern::Difference { left, right } => {
            GraphPattern::difference(push_down(wrap(*left)), push_down(wrap(*right)))
        }
        other => wrap(other),
    }
}
