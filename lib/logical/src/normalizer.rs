use crate::rules::{MultiProjectionTaggingRule, PatternRewriteRule, SetOperationPushDownRule};
use std::sync::Arc;
use triplesql_model::algebra::GraphPattern;

/// Runs a fixed sequence of [`PatternRewriteRule`]s over a graph pattern.
#[derive(Clone)]
pub struct Normalizer {
    rules: Vec<Arc<dyn PatternRewriteRule>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(SetOperationPushDownRule::new()),
            Arc::new(MultiProjectionTaggingRule::new()),
        ])
    }
}

impl Normalizer {
    pub fn new(rules: Vec<Arc<dyn PatternRewriteRule>>) -> Self {
        Self { rules }
    }

    pub fn normalize(&self, pattern: GraphPattern) -> GraphPattern {
        self.rules.iter().fold(pattern, |pattern, rule| {
            tracing::trace!(rule = rule.name(), "Applying rewrite rule");
            rule.rewrite(pattern)
        })
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
