use crate::compiler::compilation::Compilation;
use crate::compiler::context::CompileContext;
use crate::compiler::scope::Binding;
use crate::compiler::set_operation::sort_column_name;
use crate::compiler::types::ValueType;
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_logical::{expression_variables, visible_variables};
use triplesql_model::algebra::{GraphPattern, OrderExpression, TaggedColumn};
use triplesql_model::Variable;
use triplesql_sql::{
    AggregateFunction, Ident, OrderByExpr, Query, Select, SelectItem, SqlExpr, TableRef,
};

/// How the values of an output column are turned back into terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// The column holds node ids.
    Node,
    /// The column holds a computed value of the given type.
    Value(ValueType),
}

/// A column of the compiled statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputColumn {
    /// The variable the column binds.
    pub variable: Variable,
    /// The alias of the column in the statement.
    pub column: String,
    pub kind: ColumnKind,
    /// The projection branch for statements that produce multiple solutions per row.
    pub branch: Option<usize>,
}

/// A compiled query together with the description of its columns.
pub(crate) struct SelectPlan {
    pub query: Query,
    pub variables: Vec<Variable>,
    pub columns: Vec<OutputColumn>,
}

/// The projection of the outermost SELECT.
enum Projection<'a> {
    Variables(Vec<Variable>),
    Tagged(&'a [TaggedColumn]),
}

impl Compilation<'_> {
    /// Compiles a pattern with its solution modifiers into a complete query.
    ///
    /// The modifiers are expected in the order a SPARQL query produces them: slice, then
    /// distinct or reduced, then projection, then ORDER BY.
    pub(crate) fn build_query(&mut self, pattern: &GraphPattern) -> CompileResult<SelectPlan> {
        let mut current = pattern;
        let mut slice = None;
        if let GraphPattern::Slice {
            inner,
            start,
            length,
        } = current
        {
            slice = Some((*start, *length));
            current = inner;
        }
        let mut distinct = false;
        match current {
            GraphPattern::Distinct { inner } => {
                distinct = true;
                current = inner;
            }
            GraphPattern::Reduced { inner } => {
                distinct = self.options.reduced_as_distinct;
                current = inner;
            }
            _ => {}
        }
        let projection = match current {
            GraphPattern::Project { inner, variables } => {
                current = inner;
                Projection::Variables(variables.clone())
            }
            GraphPattern::TaggedProject { inner, columns } => {
                current = inner;
                Projection::Tagged(columns)
            }
            GraphPattern::MultiProject { .. } => {
                return CompileError::internal("multi-projection must be tagged before compiling")
            }
            _ => Projection::Variables(visible_variables(current)),
        };
        let mut order: &[OrderExpression] = &[];
        if let GraphPattern::OrderBy { inner, expression } = current {
            order = expression;
            current = inner;
        }

        let projected: Vec<Variable> = match &projection {
            Projection::Variables(variables) => variables.clone(),
            Projection::Tagged(columns) => columns.iter().map(|c| c.source.clone()).collect(),
        };
        let order_variables: Vec<Variable> = order
            .iter()
            .flat_map(|key| expression_variables(key.expression()))
            .collect();
        let context = CompileContext::requiring(projected.iter().chain(&order_variables));
        let context = if current.is_set_operation() {
            context.with_order(order)
        } else {
            context
        };
        // DISTINCT over rows that also carry sort keys of unprojected variables would keep
        // duplicates of the projection.
        let grouped = distinct
            && !order_variables
                .iter()
                .all(|variable| projected.contains(variable));
        let mut fragment = self.compile_pattern(current, &context)?;

        // A plain projection of a set operation selects its derived table as is.
        if let (Some(sort_columns), Projection::Variables(variables)) =
            (fragment.sort_columns.take(), &projection)
        {
            let columns = self.output_columns(variables, &fragment.variables);
            let select = fragment.into_select(vec![SelectItem::Wildcard]);
            let query = if grouped && !columns.is_empty() {
                let order_by = order
                    .iter()
                    .zip(sort_columns)
                    .enumerate()
                    .flat_map(|(key, (expression, parts))| {
                        let ascending = expression.is_ascending();
                        (0..parts.len()).map(move |part| OrderByExpr {
                            expr: unqualified(sort_column_name(key, part)),
                            ascending,
                        })
                    })
                    .collect();
                self.distinct_by_groups(Query::select(select), &columns, order_by)
            } else {
                let order_by = order
                    .iter()
                    .zip(sort_columns)
                    .flat_map(|(key, columns)| {
                        let ascending = key.is_ascending();
                        columns
                            .into_iter()
                            .map(move |expr| OrderByExpr { expr, ascending })
                    })
                    .collect();
                Query {
                    order_by,
                    ..Query::select(Select { distinct, ..select })
                }
            };
            return Ok(SelectPlan {
                query: with_slice(query, slice),
                variables: variables.clone(),
                columns,
            });
        }

        let mut order_by = Vec::new();
        let mut sort_items = Vec::new();
        for (key, expression) in order.iter().enumerate() {
            let ascending = expression.is_ascending();
            let exprs = self.sort_exprs(expression.expression(), &mut fragment)?;
            for (part, expr) in exprs.into_iter().enumerate() {
                if distinct {
                    // With DISTINCT, ORDER BY may only use projected columns.
                    let alias = sort_column_name(key, part);
                    sort_items.push(SelectItem::aliased(expr, Ident::quoted(&alias)));
                    order_by.push(OrderByExpr {
                        expr: unqualified(alias),
                        ascending,
                    });
                } else {
                    order_by.push(OrderByExpr { expr, ascending });
                }
            }
        }

        let mut items = Vec::new();
        let mut columns = Vec::new();
        let variables = match projection {
            Projection::Variables(variables) => {
                for variable in &variables {
                    if let Some((expr, kind)) = self.column_source(variable) {
                        items.push(SelectItem::aliased(expr, Ident::quoted(variable.as_str())));
                        columns.push(OutputColumn {
                            variable: variable.clone(),
                            column: variable.as_str().to_owned(),
                            kind,
                            branch: None,
                        });
                    }
                }
                variables
            }
            Projection::Tagged(tagged) => {
                let mut variables: Vec<Variable> = Vec::new();
                for column in tagged {
                    if !variables.contains(&column.target) {
                        variables.push(column.target.clone());
                    }
                    let name = format!("b{}_{}", column.branch, column.target.as_str());
                    let (expr, kind) = self
                        .column_source(&column.source)
                        .unwrap_or((SqlExpr::null(), ColumnKind::Node));
                    items.push(SelectItem::aliased(expr, Ident::quoted(&name)));
                    columns.push(OutputColumn {
                        variable: column.target.clone(),
                        column: name,
                        kind,
                        branch: Some(column.branch),
                    });
                }
                variables
            }
        };
        items.extend(sort_items);

        let select = fragment.into_select(items);
        let query = if grouped && !columns.is_empty() {
            self.distinct_by_groups(Query::select(select), &columns, order_by)
        } else {
            Query {
                order_by,
                ..Query::select(Select { distinct, ..select })
            }
        };
        Ok(SelectPlan {
            query: with_slice(query, slice),
            variables,
            columns,
        })
    }

    /// Removes duplicates of the output columns by grouping on them. Each group is ordered by
    /// the smallest (or, for descending keys, the largest) of its sort keys.
    fn distinct_by_groups(
        &mut self,
        inner: Query,
        columns: &[OutputColumn],
        order_by: Vec<OrderByExpr>,
    ) -> Query {
        let alias = self.next_alias("s");
        let column = |name: &str| SqlExpr::quoted_column(&alias, name);
        let projection = columns
            .iter()
            .map(|output| {
                SelectItem::aliased(column(&output.column), Ident::quoted(&output.column))
            })
            .collect();
        let group_by = columns.iter().map(|output| column(&output.column)).collect();
        let order_by = order_by
            .into_iter()
            .map(|key| OrderByExpr {
                expr: SqlExpr::Aggregate {
                    function: if key.ascending {
                        AggregateFunction::Min
                    } else {
                        AggregateFunction::Max
                    },
                    arg: Some(Box::new(key.expr)),
                    distinct: false,
                },
                ascending: key.ascending,
            })
            .collect();
        let select = Select {
            projection,
            from: Some(TableRef::derived(inner, &alias)),
            group_by,
            ..Select::default()
        };
        Query {
            order_by,
            ..Query::select(select)
        }
    }

    /// The expression and kind of the column that exports `variable`.
    fn column_source(&self, variable: &Variable) -> Option<(SqlExpr, ColumnKind)> {
        match self.scope.resolve(variable)? {
            Binding::Node(node) => Some((node.id.clone(), ColumnKind::Node)),
            Binding::Extension(scalar) => {
                Some((scalar.expr.clone(), ColumnKind::Value(scalar.ty)))
            }
        }
    }

    /// The columns of a set operation's derived table that are projected.
    fn output_columns(&self, projected: &[Variable], bound: &[Variable]) -> Vec<OutputColumn> {
        projected
            .iter()
            .filter(|variable| bound.contains(variable))
            .filter_map(|variable| {
                let (_, kind) = self.column_source(variable)?;
                Some(OutputColumn {
                    variable: variable.clone(),
                    column: variable.as_str().to_owned(),
                    kind,
                    branch: None,
                })
            })
            .collect()
    }
}

/// A column of the statement's own output, referenced by its alias.
fn unqualified(alias: impl Into<String>) -> SqlExpr {
    SqlExpr::Column {
        table: None,
        column: Ident::quoted(alias),
    }
}

fn with_slice(mut query: Query, slice: Option<(usize, Option<usize>)>) -> Query {
    if let Some((start, length)) = slice {
        query.offset = u64::try_from(start).ok().filter(|start| *start > 0);
        query.limit = length.and_then(|length| u64::try_from(length).ok());
    }
    query
}
