//! [SPARQL](https://www.w3.org/TR/sparql11-query/) front-end.
//!
//! Queries are parsed with [`spargebra`] and rewritten into the algebra of the
//! [`SqlCompiler`](crate::SqlCompiler). `SELECT`, `ASK` and `CONSTRUCT` queries are supported.
//!
//! ```
//! # use triplesql_engine::sparql::{Query, QueryForm};
//! let query = Query::parse("ASK { ?s ?p ?o }", None).unwrap();
//! let prepared = query.prepare().unwrap();
//! assert_eq!(prepared.form(), QueryForm::Ask);
//! ```

mod rewriting;

use crate::results::CONSTRUCT_VARIABLES;
use crate::sparql::rewriting::{rewrite_term_pattern, GraphPatternRewriter};
pub use spargebra::SparqlSyntaxError;
use spargebra::term::{NamedNodePattern, TriplePattern};
use std::fmt;
use std::str::FromStr;
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_model::algebra::{Expression, GraphPattern, ProjectionElem, TermPattern};
use triplesql_model::{Term, Variable};

/// A parsed SPARQL query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Query {
    inner: spargebra::Query,
}

impl Query {
    /// Parses a SPARQL query, resolving relative IRIs against `base_iri`.
    pub fn parse(query: &str, base_iri: Option<&str>) -> Result<Self, SparqlSyntaxError> {
        let inner = spargebra::Query::parse(query, base_iri)?;
        Ok(Self { inner })
    }

    pub fn form(&self) -> QueryForm {
        match &self.inner {
            spargebra::Query::Select { .. } => QueryForm::Select,
            spargebra::Query::Ask { .. } => QueryForm::Ask,
            spargebra::Query::Construct { .. } => QueryForm::Construct,
            spargebra::Query::Describe { .. } => QueryForm::Describe,
        }
    }

    /// Rewrites the query into a graph pattern for the compiler.
    pub fn prepare(&self) -> CompileResult<PreparedQuery> {
        let rewriter = GraphPatternRewriter::new();
        let (dataset, pattern) = match &self.inner {
            spargebra::Query::Select {
                dataset, pattern, ..
            } => (dataset, rewriter.rewrite_graph_pattern(pattern)?),
            spargebra::Query::Ask {
                dataset, pattern, ..
            } => (
                dataset,
                GraphPattern::slice(rewriter.rewrite_graph_pattern(pattern)?, 0, Some(1)),
            ),
            spargebra::Query::Construct {
                template,
                dataset,
                pattern,
                ..
            } => (
                dataset,
                construct_pattern(template, rewriter.rewrite_graph_pattern(pattern)?)?,
            ),
            spargebra::Query::Describe { .. } => return CompileError::unsupported("DESCRIBE"),
        };
        if dataset.is_some() {
            return CompileError::unsupported("dataset clause");
        }
        Ok(PreparedQuery {
            form: self.form(),
            pattern,
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for Query {
    type Err = SparqlSyntaxError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        Self::parse(query, None)
    }
}

impl TryFrom<&str> for Query {
    type Error = SparqlSyntaxError;

    fn try_from(query: &str) -> Result<Self, Self::Error> {
        Self::from_str(query)
    }
}

impl TryFrom<&String> for Query {
    type Error = SparqlSyntaxError;

    fn try_from(query: &String) -> Result<Self, Self::Error> {
        Self::from_str(query)
    }
}

impl From<spargebra::Query> for Query {
    fn from(inner: spargebra::Query) -> Self {
        Self { inner }
    }
}

/// The form of a SPARQL query, which decides how its solutions are returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryForm {
    Select,
    Ask,
    Construct,
    Describe,
}

/// A query rewritten into the algebra of the compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedQuery {
    form: QueryForm,
    pattern: GraphPattern,
}

impl PreparedQuery {
    pub fn form(&self) -> QueryForm {
        self.form
    }

    pub fn pattern(&self) -> &GraphPattern {
        &self.pattern
    }

    pub fn into_pattern(self) -> GraphPattern {
        self.pattern
    }
}

/// Builds the multi-projection that produces one row per template triple and solution.
///
/// Constants of the template are bound to fresh variables so that every position of a triple
/// is a projected variable.
fn construct_pattern(
    template: &[TriplePattern],
    inner: GraphPattern,
) -> CompileResult<GraphPattern> {
    let targets = CONSTRUCT_VARIABLES.map(Variable::new_unchecked);
    let mut constants: Vec<(Term, Variable)> = Vec::new();
    let mut inner = inner;
    let mut projections = Vec::with_capacity(template.len());
    for triple in template {
        let predicate = match &triple.predicate {
            NamedNodePattern::NamedNode(node) => TermPattern::from(node.clone()),
            NamedNodePattern::Variable(variable) => variable.clone().into(),
        };
        let positions = [
            rewrite_term_pattern(&triple.subject)?,
            predicate,
            rewrite_term_pattern(&triple.object)?,
        ];
        let mut projection = Vec::with_capacity(3);
        for (position, target) in positions.into_iter().zip(&targets) {
            let source = match position {
                TermPattern::Variable(variable) => variable,
                TermPattern::BlankNode(_) => {
                    return CompileError::unsupported("blank node in CONSTRUCT template")
                }
                TermPattern::NamedNode(node) => {
                    constant_variable(&mut constants, &mut inner, node.into())
                }
                TermPattern::Literal(literal) => {
                    constant_variable(&mut constants, &mut inner, literal.into())
                }
            };
            projection.push(ProjectionElem {
                source,
                target: target.clone(),
            });
        }
        projections.push(projection);
    }
    Ok(GraphPattern::MultiProject {
        inner: Box::new(inner),
        projections,
    })
}

fn constant_variable(
    constants: &mut Vec<(Term, Variable)>,
    inner: &mut GraphPattern,
    term: Term,
) -> Variable {
    if let Some((_, variable)) = constants.iter().find(|(constant, _)| *constant == term) {
        return variable.clone();
    }
    let variable = Variable::new_unchecked(format!("_const{}", constants.len() + 1));
    let expression = match &term {
        Term::NamedNode(node) => Expression::NamedNode(node.clone()),
        Term::Literal(literal) => Expression::Literal(literal.clone()),
        _ => Expression::Literal(triplesql_model::Literal::new_simple_literal(term.to_string())),
    };
    let pattern = std::mem::replace(inner, GraphPattern::EmptySet);
    *inner = GraphPattern::extend(pattern, variable.clone(), expression);
    constants.push((term, variable.clone()));
    variable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_is_limited_to_one_solution() {
        let prepared = Query::parse("ASK { ?s ?p ?o }", None)
            .unwrap()
            .prepare()
            .unwrap();
        assert!(matches!(
            prepared.pattern(),
            GraphPattern::Slice {
                start: 0,
                length: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn construct_binds_template_constants() {
        let prepared = Query::parse(
            "CONSTRUCT { ?s <http://e/q> ?o . ?o <http://e/q> ?s } WHERE { ?s <http://e/p> ?o }",
            None,
        )
        .unwrap()
        .prepare()
        .unwrap();
        assert_eq!(prepared.form(), QueryForm::Construct);
        let GraphPattern::MultiProject { inner, projections } = prepared.pattern() else {
            panic!("expected a multi projection");
        };
        let GraphPattern::Extend {
            variable,
            expression,
            ..
        } = inner.as_ref()
        else {
            panic!("expected an extension");
        };
        assert_eq!(variable.as_str(), "_const1");
        assert_eq!(
            *expression,
            Expression::NamedNode(triplesql_model::NamedNode::new_unchecked("http://e/q"))
        );
        assert_eq!(projections.len(), 2);
        assert_eq!(projections[0][1].source, projections[1][1].source);
        assert_eq!(projections[1][0].source.as_str(), "o");
        assert_eq!(projections[1][0].target.as_str(), "subject");
    }

    #[test]
    fn template_blank_nodes_are_rejected() {
        let query = "CONSTRUCT { _:b <http://e/p> ?o } WHERE { ?s <http://e/p> ?o }";
        let error = Query::parse(query, None)
            .unwrap()
            .prepare()
            .unwrap_err();
        assert!(matches!(error, CompileError::Unsupported { .. }));
    }

    #[test]
    fn describe_is_rejected() {
        let error = Query::parse("DESCRIBE <http://e/a>", None)
            .unwrap()
            .prepare()
            .unwrap_err();
        assert!(matches!(error, CompileError::Unsupported { .. }));
    }
}
