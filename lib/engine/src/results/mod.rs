//! Streams that turn the rows of a compiled statement into solutions or triples.

mod unpacker;

use futures::{Stream, StreamExt};
use rustc_hash::FxHashSet;
pub use sparesults::QuerySolution;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use triplesql_common::error::ExecutionError;
use triplesql_common::SqlRowStream;
use triplesql_model::{Subject, Term, Triple, Variable};
pub use unpacker::RowUnpacker;

/// The names of the variables a CONSTRUCT statement binds per triple.
pub const CONSTRUCT_VARIABLES: [&str; 3] = ["subject", "predicate", "object"];

/// A stream over [`QuerySolution`]s.
pub struct QuerySolutionStream {
    unpacker: RowUnpacker,
    /// `None` once the rows are exhausted.
    inner: Option<SqlRowStream>,
    /// The solutions of the current row that have not been returned yet.
    current: Option<std::vec::IntoIter<QuerySolution>>,
}

impl QuerySolutionStream {
    pub fn new(unpacker: RowUnpacker, inner: SqlRowStream) -> Self {
        Self {
            unpacker,
            inner: Some(inner),
            current: None,
        }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.unpacker.variables()
    }

    fn poll_inner(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<QuerySolution, ExecutionError>>> {
        loop {
            if let Some(current) = &mut self.current {
                if let Some(solution) = current.next() {
                    return Poll::Ready(Some(Ok(solution)));
                }
                self.current = None;
            }
            let Some(inner) = &mut self.inner else {
                return Poll::Ready(None);
            };
            match ready!(inner.poll_next_unpin(cx)) {
                None => self.inner = None,
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                Some(Ok(row)) => match self.unpacker.unpack(&row) {
                    Ok(solutions) => self.current = Some(solutions.into_iter()),
                    Err(error) => return Poll::Ready(Some(Err(error))),
                },
            }
        }
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, ExecutionError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_inner(cx)
    }
}

/// A stream over the distinct triples of a CONSTRUCT query.
///
/// Solutions that do not form a valid triple, for example because the subject is a literal,
/// are skipped.
pub struct QueryTripleStream {
    inner: QuerySolutionStream,
    emitted: FxHashSet<Triple>,
}

impl QueryTripleStream {
    pub fn new(inner: QuerySolutionStream) -> Self {
        Self {
            inner,
            emitted: FxHashSet::default(),
        }
    }

    fn poll_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Triple, ExecutionError>>> {
        loop {
            let solution = match ready!(self.inner.poll_next_unpin(cx)) {
                None => return Poll::Ready(None),
                Some(Ok(solution)) => solution,
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
            };
            let Some(triple) = solution_triple(&solution) else {
                continue;
            };
            if self.emitted.insert(triple.clone()) {
                return Poll::Ready(Some(Ok(triple)));
            }
        }
    }
}

impl Stream for QueryTripleStream {
    type Item = Result<Triple, ExecutionError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_inner(cx)
    }
}

fn solution_triple(solution: &QuerySolution) -> Option<Triple> {
    let [subject, predicate, object] = CONSTRUCT_VARIABLES;
    let subject = match solution.get(subject)? {
        Term::NamedNode(node) => Subject::from(node.clone()),
        Term::BlankNode(node) => Subject::from(node.clone()),
        _ => return None,
    };
    let Term::NamedNode(predicate) = solution.get(predicate)? else {
        return None;
    };
    Some(Triple::new(
        subject,
        predicate.clone(),
        solution.get(object)?.clone(),
    ))
}

/// Collects all solutions of a stream.
pub async fn collect_solutions(
    mut stream: QuerySolutionStream,
) -> Result<(Arc<[Variable]>, Vec<QuerySolution>), ExecutionError> {
    let variables: Arc<[Variable]> = stream.variables().into();
    let mut solutions = Vec::new();
    while let Some(solution) = stream.next().await {
        solutions.push(solution?);
    }
    Ok((variables, solutions))
}
