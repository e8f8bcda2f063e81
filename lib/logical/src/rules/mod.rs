mod multi_projection_tagging;
mod set_operation_push_down;

pub use multi_projection_tagging::MultiProjectionTaggingRule;
pub use set_operation_push_down::SetOperationPushDownRule;

use triplesql_model::algebra::GraphPattern;

/// A rewrite of a whole graph pattern.
pub trait PatternRewriteRule: Send + Sync {
    fn name(&self) -> &str;

    /// Rewrites `pattern`. Applying a rule to its own output must not change it.
    fn rewrite(&self, pattern: GraphPattern) -> GraphPattern;
}

/// Applies `f` to every direct child pattern of `pattern`.
pub(crate) fn map_children(
    pattern: GraphPattern,
    f: &mut impl FnMut(GraphPattern) -> GraphPattern,
) -> GraphPattern {
    let mut apply = |p: Box<GraphPattern>| Box::new(f(*p));
    match pattern {
        GraphPattern::Join { left, right } => GraphPattern::Join {
            left: apply(left),
            right: apply(right),
        },
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => GraphPattern::LeftJoin {
            left: apply(left),
            right: apply(right),
            expression,
        },
        GraphPattern::Filter { inner, expression } => GraphPattern::Filter {
            inner: apply(inner),
            expression,
        },
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => GraphPattern::Extend {
            inner: apply(inner),
            variable,
            expression,
        },
        GraphPattern::Union { left, right } => GraphPattern::Union {
            left: apply(left),
            right: apply(right),
        },
        GraphPattern::Intersection { left, right } => GraphPattern::Intersection {
            left: apply(left),
            right: apply(right),
        },
        GraphPattern::Difference { left, right } => GraphPattern::Difference {
            left: apply(left),
            right: apply(right),
        },
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => GraphPattern::Group {
            inner: apply(inner),
            variables,
            aggregates,
        },
        GraphPattern::Distinct { inner } => GraphPattern::Distinct {
            inner: apply(inner),
        },
        GraphPattern::Reduced { inner } => GraphPattern::Reduced {
            inner: apply(inner),
        },
        GraphPattern::OrderBy { inner, expression } => GraphPattern::OrderBy {
            inner: apply(inner),
            expression,
        },
        GraphPattern::Slice {
            inner,
            start,
            length,
        } => GraphPattern::Slice {
            inner: apply(inner),
            start,
            length,
        },
        GraphPattern::Project { inner, variables } => GraphPattern::Project {
            inner: apply(inner),
            variables,
        },
        GraphPattern::MultiProject { inner, projections } => GraphPattern::MultiProject {
            inner: apply(inner),
            projections,
        },
        GraphPattern::TaggedProject { inner, columns } => GraphPattern::TaggedProject {
            inner: apply(inner),
            columns,
        },
        GraphPattern::Service {
            name,
            inner,
            silent,
        } => GraphPattern::Service {
            name,
            inner: apply(inner),
            silent,
        },
        GraphPattern::Quad(_)
        | GraphPattern::Path { .. }
        | GraphPattern::Values { .. }
        | GraphPattern::EmptySet
        | GraphPattern::SingletonSet => pattern,
    }
}
