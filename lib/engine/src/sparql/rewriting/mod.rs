mod expression_rewriter;
mod graph_pattern_rewriter;

pub use graph_pattern_rewriter::GraphPatternRewriter;
pub(crate) use graph_pattern_rewriter::rewrite_term_pattern;
