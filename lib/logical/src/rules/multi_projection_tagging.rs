use crate::rules::{map_children, PatternRewriteRule};
use triplesql_model::algebra::{GraphPattern, TaggedColumn};

/// Flattens every [`GraphPattern::MultiProject`] into a [`GraphPattern::TaggedProject`] whose
/// columns remember the projection they came from.
#[derive(Debug, Default)]
pub struct MultiProjectionTaggingRule;

impl MultiProjectionTaggingRule {
    pub fn new() -> Self {
        Self
    }
}

impl PatternRewriteRule for MultiProjectionTaggingRule {
    fn name(&self) -> &str {
        "multi-projection-tagging"
    }

    fn rewrite(&self, pattern: GraphPattern) -> GraphPattern {
        tag(pattern)
    }
}

fn tag(pattern: GraphPattern) -> GraphPattern {
    match map_children(pattern, &mut tag) {
        GraphPattern::MultiProject { inner, projections } => GraphPattern::TaggedProject {
            inner,
            columns: projections
                .into_iter()
                .enumerate()
                .flat_map(|(branch, projection)| {
                    projection.into_iter().map(move |elem| TaggedColumn {
                        branch,
                        source: elem.source,
                        target: elem.target,
                    })
                })
                .collect(),
        },
        pattern => pattern,
    }
}
