//! An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) that is
//! queried by compiling SPARQL to SQL.
//!
//! The entry point of the module is the [`Store`] struct.
//!
//! Usage example:
//! ```
//! use triplesql::model::*;
//! use triplesql::results::QueryResults;
//! use triplesql::store::Store;
//! use futures::StreamExt;
//!
//! # tokio_test::block_on(async {
//! let store = Store::default();
//!
//! // insertion
//! let ex = NamedNode::new("http://example.com")?;
//! let quad = Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph);
//! store.insert(&quad);
//!
//! // SPARQL query
//! if let QueryResults::Solutions(mut solutions) = store.query("SELECT ?s WHERE { ?s ?p ?o }").await? {
//!     assert_eq!(solutions.next().await.unwrap()?.get("s"), Some(&ex.into()));
//! };
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! # }).unwrap();
//! ```

use crate::error::{LoaderError, QueryEvaluationError};
use crate::results::QueryResults;
use futures::StreamExt;
use oxrdfio::RdfParser;
use std::io::Read;
use std::sync::Arc;
use triplesql_common::error::CompileError;
use triplesql_common::{CompilerOptions, NodeLoader, SqlExecutor};
use triplesql_engine::results::{QuerySolutionStream, QueryTripleStream, RowUnpacker};
use triplesql_engine::sparql::{PreparedQuery, Query, QueryForm};
use triplesql_engine::{CompiledQuery, SqlCompiler};
use triplesql_model::{Quad, QuadRef};
use triplesql_storage::{DataFusionExecutor, MemStorage};

/// An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) store.
///
/// The quads live in a triple table and a node table. Queries are compiled into a single SQL
/// statement each and run by [DataFusion](https://datafusion.apache.org/).
#[derive(Clone)]
pub struct Store {
    storage: Arc<MemStorage>,
    executor: Arc<dyn SqlExecutor>,
    compiler: SqlCompiler,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

impl Store {
    /// Creates an empty [Store] that compiles queries with `options`.
    ///
    /// The dialect of `options` is replaced by the one the executor understands.
    pub fn new(options: CompilerOptions) -> Self {
        let storage = Arc::new(MemStorage::new());
        let executor = Arc::new(DataFusionExecutor::new(Arc::clone(&storage)));
        let options = options.with_dialect(executor.dialect());
        Self {
            storage,
            executor,
            compiler: SqlCompiler::new(options),
        }
    }

    /// Returns the options queries are compiled with.
    pub fn options(&self) -> &CompilerOptions {
        self.compiler.options()
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &Arc<MemStorage> {
        &self.storage
    }

    /// Executes a [SPARQL](https://www.w3.org/TR/sparql11-query/) query.
    ///
    /// Usage example:
    /// ```
    /// use triplesql::model::*;
    /// use triplesql::results::QueryResults;
    /// use triplesql::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::default();
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// store.insert(QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph));
    ///
    /// let QueryResults::Boolean(found) = store.query("ASK { ?s ?p ?o }").await? else {
    ///     panic!("ASK returns a boolean");
    /// };
    /// assert!(found);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub async fn query(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let query = query.try_into().map_err(Into::into)?;
        let prepared = query.prepare()?;
        let compiled = Arc::new(self.compile(&prepared)?);
        let rows = self.executor.execute(compiled.sql()).await?;
        let loader: Arc<dyn NodeLoader> = self.storage.clone();
        let solutions = QuerySolutionStream::new(RowUnpacker::new(compiled, loader), rows);

        Ok(match prepared.form() {
            QueryForm::Select => QueryResults::Solutions(solutions),
            QueryForm::Ask => {
                let mut solutions = solutions;
                let found = solutions.next().await.transpose()?.is_some();
                QueryResults::Boolean(found)
            }
            QueryForm::Construct => QueryResults::Graph(QueryTripleStream::new(solutions)),
            QueryForm::Describe => {
                return Err(CompileError::Unsupported {
                    construct: "DESCRIBE".to_owned(),
                }
                .into())
            }
        })
    }

    /// Compiles a query without running it.
    ///
    /// Usage example:
    /// ```
    /// use triplesql::store::Store;
    ///
    /// let store = Store::default();
    /// let compiled = store.explain("SELECT ?s WHERE { ?s ?p ?o }")?;
    /// assert!(compiled.sql().starts_with("SELECT "));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn explain(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<CompiledQuery, QueryEvaluationError> {
        let query = query.try_into().map_err(Into::into)?;
        self.compile(&query.prepare()?)
    }

    fn compile(&self, prepared: &PreparedQuery) -> Result<CompiledQuery, QueryEvaluationError> {
        let compiled = self
            .compiler
            .compile(prepared.pattern(), Some(self.storage.as_ref()))?;
        tracing::debug!(form = ?prepared.form(), sql = compiled.sql(), "Prepared query");
        Ok(compiled)
    }

    /// Loads an RDF file into the store.
    ///
    /// Returns the number of quads that were not already in the store.
    ///
    /// Usage example:
    /// ```
    /// use triplesql::model::*;
    /// use triplesql::store::Store;
    /// use oxrdfio::RdfFormat;
    ///
    /// let store = Store::default();
    /// let file = b"<http://example.com> <http://example.com> <http://example.com> <http://example.com/g> .";
    /// assert_eq!(store.load_from_reader(RdfFormat::NQuads, file.as_ref())?, 1);
    ///
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// assert!(store.contains(QuadRef::new(ex, ex, ex, NamedNodeRef::new("http://example.com/g")?)));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn load_from_reader(
        &self,
        parser: impl Into<RdfParser>,
        reader: impl Read,
    ) -> Result<usize, LoaderError> {
        let quads = parser
            .into()
            .rename_blank_nodes()
            .for_reader(reader)
            .collect::<Result<Vec<_>, _>>()?;
        let inserted = self.extend(quads);
        tracing::debug!(inserted, "Loaded quads");
        Ok(inserted)
    }

    /// Adds a quad to this store.
    ///
    /// Returns `true` if the quad was not already in the store.
    pub fn insert<'a>(&self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.storage.insert(quad.into())
    }

    /// Adds a set of quads to this store and returns how many were new.
    pub fn extend(&self, quads: impl IntoIterator<Item = impl Into<Quad>>) -> usize {
        quads
            .into_iter()
            .map(Into::into)
            .filter(|quad: &Quad| self.storage.insert(quad.as_ref()))
            .count()
    }

    /// Removes a quad from this store.
    ///
    /// The row of the quad stays in the triple table and is only marked as deleted. Returns
    /// `true` if the quad was in the store.
    pub fn remove<'a>(&self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.storage.remove(quad.into())
    }

    pub fn contains<'a>(&self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.storage.contains(quad.into())
    }

    /// Returns the number of quads in the store.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
