//! Results of a query, either streamed or already decided.

use crate::error::QueryEvaluationError;
use futures::StreamExt;
use oxrdfio::{RdfFormat, RdfSerializer};
use sparesults::{QueryResultsFormat, QueryResultsSerializer};
use std::io::Write;
use triplesql_engine::results::CONSTRUCT_VARIABLES;
pub use triplesql_engine::results::{QuerySolution, QuerySolutionStream, QueryTripleStream};
use triplesql_model::{Triple, VariableRef};

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
pub enum QueryResults {
    /// Results of a [SELECT](https://www.w3.org/TR/sparql11-query/#select) query.
    Solutions(QuerySolutionStream),
    /// Result of a [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(bool),
    /// Results of a [CONSTRUCT](https://www.w3.org/TR/sparql11-query/#construct) query.
    Graph(QueryTripleStream),
}

impl QueryResults {
    /// Writes the query results.
    ///
    /// Graph results are written as solutions binding `?subject`, `?predicate` and `?object`.
    pub async fn write<W: Write>(
        self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, QueryEvaluationError> {
        let serializer = QueryResultsSerializer::from_format(format);
        match self {
            Self::Boolean(value) => serializer.serialize_boolean_to_writer(writer, value),
            Self::Solutions(mut solutions) => {
                let mut serializer = serializer
                    .serialize_solutions_to_writer(writer, solutions.variables().to_vec())
                    .map_err(QueryEvaluationError::ResultsSerialization)?;
                while let Some(solution) = solutions.next().await {
                    serializer
                        .serialize(&solution?)
                        .map_err(QueryEvaluationError::ResultsSerialization)?;
                }
                serializer.finish()
            }
            Self::Graph(mut triples) => {
                let [s, p, o] = CONSTRUCT_VARIABLES.map(VariableRef::new_unchecked);
                let mut serializer = serializer
                    .serialize_solutions_to_writer(
                        writer,
                        vec![s.into_owned(), p.into_owned(), o.into_owned()],
                    )
                    .map_err(QueryEvaluationError::ResultsSerialization)?;
                while let Some(triple) = triples.next().await {
                    let Triple {
                        subject,
                        predicate,
                        object,
                    } = triple?;
                    serializer
                        .serialize([
                            (s, &subject.into()),
                            (p, &predicate.into()),
                            (o, &object),
                        ])
                        .map_err(QueryEvaluationError::ResultsSerialization)?;
                }
                serializer.finish()
            }
        }
        .map_err(QueryEvaluationError::ResultsSerialization)
    }

    /// Writes the triples of a CONSTRUCT query.
    ///
    /// This method fails if it is called on the `Solutions` or `Boolean` results.
    pub async fn write_graph<W: Write>(
        self,
        writer: W,
        format: impl Into<RdfFormat>,
    ) -> Result<W, QueryEvaluationError> {
        let Self::Graph(mut triples) = self else {
            return Err(QueryEvaluationError::NotAGraph);
        };
        let mut serializer = RdfSerializer::from_format(format.into()).for_writer(writer);
        while let Some(triple) = triples.next().await {
            serializer
                .serialize_triple(&triple?)
                .map_err(QueryEvaluationError::ResultsSerialization)?;
        }
        serializer
            .finish()
            .map_err(QueryEvaluationError::ResultsSerialization)
    }
}

impl From<QuerySolutionStream> for QueryResults {
    #[inline]
    fn from(value: QuerySolutionStream) -> Self {
        Self::Solutions(value)
    }
}

impl From<QueryTripleStream> for QueryResults {
    #[inline]
    fn from(value: QueryTripleStream) -> Self {
        Self::Graph(value)
    }
}
