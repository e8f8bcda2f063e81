//! Translation of graph patterns into SQL over the triple and node tables.
//!
//! Triple patterns become scans of the triple table. The node table is only joined where a
//! value of a node is needed, for example to compare it in a filter or to sort by it. Result
//! columns carry node ids, which are turned back into terms by the
//! [`RowUnpacker`](crate::results::RowUnpacker).

mod aggregates;
mod compilation;
mod constants;
mod context;
mod expression;
mod fragment;
mod functions;
mod pattern;
mod scope;
mod select;
mod set_operation;
mod types;

pub use select::{ColumnKind, OutputColumn};
pub use types::ValueType;

use crate::compiler::compilation::{Compilation, PreloadedConstants};
use crate::compiler::select::SelectPlan;
use std::collections::HashMap;
use triplesql_common::{CompileResult, CompilerOptions, NodeResolver, SqlDialect};
use triplesql_logical::Normalizer;
use triplesql_model::algebra::GraphPattern;
use triplesql_model::Variable;
use triplesql_sql::{Query, ToSql};

/// Compiles graph patterns into SQL statements.
///
/// ```
/// # use triplesql_common::CompilerOptions;
/// # use triplesql_engine::SqlCompiler;
/// # use triplesql_model::algebra::{GraphPattern, QuadPattern};
/// # use triplesql_model::Variable;
/// let compiler = SqlCompiler::new(CompilerOptions::default());
/// let pattern = GraphPattern::quad(QuadPattern::new(
///     Variable::new_unchecked("s"),
///     Variable::new_unchecked("p"),
///     Variable::new_unchecked("o"),
/// ));
/// let query = compiler.compile(&pattern, None).unwrap();
/// assert_eq!(
///     query.sql(),
///     r#"SELECT t1.subject_id AS "s", t1.predicate_id AS "p", t1.object_id AS "o" FROM triples AS t1 WHERE t1.deleted = FALSE"#
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqlCompiler {
    options: CompilerOptions,
    normalizer: Normalizer,
}

impl SqlCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            normalizer: Normalizer::default(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles `pattern`.
    ///
    /// If constants are preloaded, the `resolver` is asked for the node id of every constant of
    /// the pattern and the ids are inlined into the statement. Without a resolver, constants are
    /// matched by joining the node table.
    pub fn compile(
        &self,
        pattern: &GraphPattern,
        resolver: Option<&dyn NodeResolver>,
    ) -> CompileResult<CompiledQuery> {
        let pattern = self.normalizer.normalize(pattern.clone());
        let constants = match resolver {
            Some(resolver) if self.options.preload_constants => {
                self.preload_constants(&pattern, resolver)?
            }
            _ => PreloadedConstants::default(),
        };

        let mut compilation = Compilation::new(&self.options, constants);
        let SelectPlan {
            query,
            variables,
            columns,
        } = compilation.build_query(&pattern)?;
        let sql = query.to_sql(self.options.dialect);
        tracing::debug!(dialect = %self.options.dialect, %sql, "Compiled graph pattern");
        Ok(CompiledQuery {
            statement: query,
            sql,
            dialect: self.options.dialect,
            variables,
            columns,
        })
    }

    fn preload_constants(
        &self,
        pattern: &GraphPattern,
        resolver: &dyn NodeResolver,
    ) -> CompileResult<PreloadedConstants> {
        let mut preloaded = PreloadedConstants::default();
        for term in constants::pattern_constants(pattern, self.options.blank_node_mode) {
            let id = resolver.resolve(term.as_ref())?;
            tracing::trace!(%term, ?id, "Preloaded constant");
            preloaded.insert(term, id);
        }
        Ok(preloaded)
    }
}

/// A compiled statement together with the information needed to read its rows.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    statement: Query,
    sql: String,
    dialect: SqlDialect,
    variables: Vec<Variable>,
    columns: Vec<OutputColumn>,
}

impl CompiledQuery {
    /// The syntax tree of the statement.
    pub fn statement(&self) -> &Query {
        &self.statement
    }

    /// The statement rendered in [`Self::dialect`].
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// The variables of the solutions, in projection order. Variables without a column are
    /// never bound.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    /// Whether every row carries multiple solutions.
    pub fn is_multi_branch(&self) -> bool {
        self.columns.iter().any(|column| column.branch.is_some())
    }

    /// The types of the variables bound to computed values.
    pub fn extension_types(&self) -> HashMap<&Variable, ValueType> {
        self.columns
            .iter()
            .filter_map(|column| match column.kind {
                ColumnKind::Value(ty) => Some((&column.variable, ty)),
                ColumnKind::Node => None,
            })
            .collect()
    }
}
