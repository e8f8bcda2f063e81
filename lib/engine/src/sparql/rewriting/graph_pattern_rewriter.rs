use crate::sparql::rewriting::expression_rewriter::ExpressionRewriter;
use spargebra::algebra::{GraphPattern, OrderExpression, PropertyPathExpression};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
use std::cell::{Cell, RefCell};
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_model::algebra::{self, QuadPattern};
use triplesql_model::{Term, Variable};

/// Rewrites the algebra produced by the SPARQL parser into the algebra of the compiler.
///
/// Patterns inside `GRAPH` are restricted to the context of the graph. Outside of `GRAPH`, triple
/// patterns match every context.
pub struct GraphPatternRewriter {
    state: RefCell<RewritingState>,
    /// The number of variables introduced for intermediate nodes of property paths.
    path_variables: Cell<usize>,
}

impl GraphPatternRewriter {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(RewritingState::default()),
            path_variables: Cell::new(0),
        }
    }

    /// Rewrites a [GraphPattern].
    pub fn rewrite_graph_pattern(
        &self,
        pattern: &GraphPattern,
    ) -> CompileResult<algebra::GraphPattern> {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                let quads = patterns
                    .iter()
                    .map(|pattern| self.rewrite_triple_pattern(pattern))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(join_all(quads.into_iter().map(algebra::GraphPattern::quad)))
            }
            GraphPattern::Path {
                subject,
                path,
                object,
            } => self.rewrite_path(
                rewrite_term_pattern(subject)?,
                path,
                rewrite_term_pattern(object)?,
            ),
            GraphPattern::Join { left, right } => Ok(algebra::GraphPattern::join(
                self.rewrite_graph_pattern(left)?,
                self.rewrite_graph_pattern(right)?,
            )),
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let left = self.rewrite_graph_pattern(left)?;
                let right = self.rewrite_graph_pattern(right)?;
                let expression = expression
                    .as_ref()
                    .map(|expression| self.rewrite_expression(expression))
                    .transpose()?;
                Ok(algebra::GraphPattern::left_join(left, right, expression))
            }
            GraphPattern::Filter { expr, inner } => Ok(algebra::GraphPattern::filter(
                self.rewrite_graph_pattern(inner)?,
                self.rewrite_expression(expr)?,
            )),
            GraphPattern::Union { left, right } => Ok(algebra::GraphPattern::union(
                self.rewrite_graph_pattern(left)?,
                self.rewrite_graph_pattern(right)?,
            )),
            GraphPattern::Graph { name, inner } => {
                let graph = match name {
                    NamedNodePattern::NamedNode(node) => algebra::TermPattern::from(node.clone()),
                    NamedNodePattern::Variable(variable) => variable.clone().into(),
                };
                let new_state = self.state.borrow().with_active_graph(graph);
                let old_state = self.state.replace(new_state);
                let result = self.rewrite_graph_pattern(inner);
                self.state.replace(old_state);
                result
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => Ok(algebra::GraphPattern::extend(
                self.rewrite_graph_pattern(inner)?,
                variable.clone(),
                self.rewrite_expression(expression)?,
            )),
            GraphPattern::Minus { left, right } => Ok(algebra::GraphPattern::difference(
                self.rewrite_graph_pattern(left)?,
                self.rewrite_graph_pattern(right)?,
            )),
            GraphPattern::Values {
                variables,
                bindings,
            } => {
                let bindings = bindings
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|value| value.as_ref().map(rewrite_ground_term).transpose())
                            .collect::<CompileResult<Vec<_>>>()
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(algebra::GraphPattern::Values {
                    variables: variables.clone(),
                    bindings,
                })
            }
            GraphPattern::OrderBy { inner, expression } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                let expression = expression
                    .iter()
                    .map(|expression| self.rewrite_order_expression(expression))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(algebra::GraphPattern::order_by(inner, expression))
            }
            GraphPattern::Project { inner, variables } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                let mut variables = variables.clone();
                // The solutions of a sub-select inside GRAPH ?g stay bound to their graph.
                if let Some(variable) = self.graph_variable_goes_out_of_scope(&variables) {
                    variables.push(variable);
                }
                Ok(algebra::GraphPattern::project(inner, variables))
            }
            GraphPattern::Distinct { inner } => Ok(algebra::GraphPattern::distinct(
                self.rewrite_graph_pattern(inner)?,
            )),
            GraphPattern::Reduced { inner } => Ok(algebra::GraphPattern::Reduced {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
            }),
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => Ok(algebra::GraphPattern::slice(
                self.rewrite_graph_pattern(inner)?,
                *start,
                *length,
            )),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                let expression_rewriter = ExpressionRewriter::new(self);
                let aggregates = aggregates
                    .iter()
                    .map(|(variable, aggregate)| {
                        expression_rewriter
                            .rewrite_aggregate(aggregate)
                            .map(|aggregate| (variable.clone(), aggregate))
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(algebra::GraphPattern::Group {
                    inner: Box::new(inner),
                    variables: variables.clone(),
                    aggregates,
                })
            }
            GraphPattern::Service {
                name,
                inner,
                silent,
            } => {
                let name = match name {
                    NamedNodePattern::NamedNode(node) => algebra::TermPattern::from(node.clone()),
                    NamedNodePattern::Variable(variable) => variable.clone().into(),
                };
                Ok(algebra::GraphPattern::Service {
                    name,
                    inner: Box::new(self.rewrite_graph_pattern(inner)?),
                    silent: *silent,
                })
            }
            #[allow(unreachable_patterns, reason = "Reachable with optional spargebra features")]
            _ => CompileError::unsupported(format!("{pattern}")),
        }
    }

    /// Rewrites a property path. Predicates, inverse predicates and sequences become triple
    /// patterns. Every other path is kept and rejected by the compiler.
    fn rewrite_path(
        &self,
        subject: algebra::TermPattern,
        path: &PropertyPathExpression,
        object: algebra::TermPattern,
    ) -> CompileResult<algebra::GraphPattern> {
        match path {
            PropertyPathExpression::NamedNode(predicate) => Ok(algebra::GraphPattern::quad(
                self.in_active_graph(QuadPattern::new(subject, predicate.clone(), object)),
            )),
            PropertyPathExpression::Reverse(inner) => self.rewrite_path(object, inner, subject),
            PropertyPathExpression::Sequence(first, second) => {
                let middle = algebra::TermPattern::from(self.fresh_path_variable());
                Ok(algebra::GraphPattern::join(
                    self.rewrite_path(subject, first, middle.clone())?,
                    self.rewrite_path(middle, second, object)?,
                ))
            }
            _ => Ok(algebra::GraphPattern::Path {
                subject,
                path: path.clone(),
                object,
            }),
        }
    }

    fn rewrite_triple_pattern(&self, pattern: &TriplePattern) -> CompileResult<QuadPattern> {
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => algebra::TermPattern::from(node.clone()),
            NamedNodePattern::Variable(variable) => variable.clone().into(),
        };
        Ok(self.in_active_graph(QuadPattern::new(
            rewrite_term_pattern(&pattern.subject)?,
            predicate,
            rewrite_term_pattern(&pattern.object)?,
        )))
    }

    fn in_active_graph(&self, pattern: QuadPattern) -> QuadPattern {
        match &self.state.borrow().active_graph {
            Some(graph) => pattern.in_context(graph.clone()),
            None => pattern,
        }
    }

    fn fresh_path_variable(&self) -> Variable {
        let id = self.path_variables.get() + 1;
        self.path_variables.set(id);
        Variable::new_unchecked(format!("_path{id}"))
    }

    /// Returns the graph variable if a projection to `variables` would drop it.
    fn graph_variable_goes_out_of_scope(&self, variables: &[Variable]) -> Option<Variable> {
        let state = self.state.borrow();
        match &state.active_graph {
            Some(algebra::TermPattern::Variable(v)) if !variables.contains(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Rewrites an [Expression](spargebra::algebra::Expression).
    pub fn rewrite_expression(
        &self,
        expression: &spargebra::algebra::Expression,
    ) -> CompileResult<algebra::Expression> {
        ExpressionRewriter::new(self).rewrite(expression)
    }

    /// Rewrites an [OrderExpression].
    fn rewrite_order_expression(
        &self,
        expression: &OrderExpression,
    ) -> CompileResult<algebra::OrderExpression> {
        Ok(match expression {
            OrderExpression::Asc(inner) => {
                algebra::OrderExpression::Asc(self.rewrite_expression(inner)?)
            }
            OrderExpression::Desc(inner) => {
                algebra::OrderExpression::Desc(self.rewrite_expression(inner)?)
            }
        })
    }
}

impl Default for GraphPatternRewriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
struct RewritingState {
    /// The context of the innermost `GRAPH`, if any.
    active_graph: Option<algebra::TermPattern>,
}

impl RewritingState {
    #[allow(clippy::unused_self)]
    fn with_active_graph(&self, active_graph: algebra::TermPattern) -> RewritingState {
        RewritingState {
            active_graph: Some(active_graph),
        }
    }
}

/// Joins all patterns. No pattern yields the pattern with a single empty solution.
fn join_all(patterns: impl IntoIterator<Item = algebra::GraphPattern>) -> algebra::GraphPattern {
    patterns
        .into_iter()
        .reduce(algebra::GraphPattern::join)
        .unwrap_or(algebra::GraphPattern::SingletonSet)
}

pub(crate) fn rewrite_term_pattern(term: &TermPattern) -> CompileResult<algebra::TermPattern> {
    Ok(match term {
        TermPattern::NamedNode(node) => node.clone().into(),
        TermPattern::BlankNode(node) => node.clone().into(),
        TermPattern::Literal(literal) => literal.clone().into(),
        TermPattern::Variable(variable) => variable.clone().into(),
        #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
        _ => return CompileError::unsupported("quoted triple pattern"),
    })
}

fn rewrite_ground_term(term: &GroundTerm) -> CompileResult<Term> {
    Ok(match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
        #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
        _ => return CompileError::unsupported("quoted triple"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spargebra::Query;

    fn rewrite(query: &str) -> algebra::GraphPattern {
        let Query::Select { pattern, .. } = Query::parse(query, None).unwrap() else {
            panic!("expected a SELECT query");
        };
        GraphPatternRewriter::new()
            .rewrite_graph_pattern(&pattern)
            .unwrap()
    }

    fn inner_of_projection(pattern: algebra::GraphPattern) -> algebra::GraphPattern {
        match pattern {
            algebra::GraphPattern::Project { inner, .. } => *inner,
            other => panic!("expected a projection, got {other:?}"),
        }
    }

    #[test]
    fn basic_graph_pattern_becomes_joined_quads() {
        let pattern = inner_of_projection(rewrite(
            "SELECT * WHERE { ?s <http://e/p> ?o . ?o <http://e/q> ?x }",
        ));
        let algebra::GraphPattern::Join { left, right } = pattern else {
            panic!("expected a join");
        };
        assert!(matches!(*left, algebra::GraphPattern::Quad(_)));
        assert!(matches!(*right, algebra::GraphPattern::Quad(_)));
    }

    #[test]
    fn graph_sets_the_context_of_nested_patterns() {
        let pattern = inner_of_projection(rewrite(
            "SELECT * WHERE { GRAPH ?g { ?s ?p ?o } }",
        ));
        let algebra::GraphPattern::Quad(quad) = pattern else {
            panic!("expected a quad, got {pattern:?}");
        };
        assert_eq!(
            quad.context,
            Some(algebra::TermPattern::Variable(Variable::new_unchecked("g")))
        );
    }

    #[test]
    fn sequence_paths_are_joined_through_a_fresh_variable() {
        let pattern = inner_of_projection(rewrite(
            "SELECT ?s ?o WHERE { ?s <http://e/p>/^<http://e/q> ?o }",
        ));
        let algebra::GraphPattern::Join { left, right } = pattern else {
            panic!("expected a join, got {pattern:?}");
        };
        let (algebra::GraphPattern::Quad(first), algebra::GraphPattern::Quad(second)) =
            (*left, *right)
        else {
            panic!("expected two quads");
        };
        let middle = algebra::TermPattern::Variable(Variable::new_unchecked("_path1"));
        assert_eq!(first.object, middle);
        // The inverse step swaps subject and object.
        assert_eq!(second.subject, algebra::TermPattern::Variable(Variable::new_unchecked("o")));
        assert_eq!(second.object, middle);
    }

    #[test]
    fn other_paths_are_kept() {
        let pattern = inner_of_projection(rewrite(
            "SELECT * WHERE { ?s <http://e/p>* ?o }",
        ));
        assert!(matches!(pattern, algebra::GraphPattern::Path { .. }));
    }

    #[test]
    fn minus_becomes_difference() {
        let pattern = inner_of_projection(rewrite(
            "SELECT * WHERE { ?s <http://e/p> ?o MINUS { ?s <http://e/q> ?o } }",
        ));
        assert!(matches!(pattern, algebra::GraphPattern::Difference { .. }));
    }

    #[test]
    fn sub_select_in_graph_keeps_the_graph_variable() {
        let pattern = inner_of_projection(rewrite(
            "SELECT * WHERE { GRAPH ?g { SELECT ?s WHERE { ?s ?p ?o } } }",
        ));
        let algebra::GraphPattern::Project { variables, .. } = pattern else {
            panic!("expected a projection, got {pattern:?}");
        };
        assert_eq!(
            variables,
            vec![Variable::new_unchecked("s"), Variable::new_unchecked("g")]
        );
    }
}
