use crate::compiler::compilation::Compilation;
use crate::compiler::context::CompileContext;
use crate::compiler::expression::{term_scalar, Comparison};
use crate::compiler::fragment::{Grouping, JoinFragment};
use crate::compiler::scope::{Binding, NodeRef, ScopeKind};
use crate::compiler::select::ColumnKind;
use crate::compiler::types::{Scalar, Value, ValueType};
use triplesql_common::error::CompileError;
use triplesql_common::schema::{quad_column, NodeColumn, DELETED, TRIPLES_TABLE};
use triplesql_common::{BlankNodeMatchingMode, CompileResult};
use triplesql_logical::{aggregate_variables, expression_variables, visible_variables};
use triplesql_model::algebra::{
    AggregateExpression, GraphPattern, QuadPattern, QuadPosition, TermPattern,
};
use triplesql_model::Variable;
use triplesql_sql::{Ident, Query, SelectItem, SqlExpr, SqlFunction, TableRef};

impl Compilation<'_> {
    /// Compiles a graph pattern into a fragment of the current frame. The variables the pattern
    /// binds are registered in the scope.
    pub(crate) fn compile_pattern(
        &mut self,
        pattern: &GraphPattern,
        context: &CompileContext,
    ) -> CompileResult<JoinFragment> {
        match pattern {
            GraphPattern::Quad(quad) => self.compile_quad(quad),
            GraphPattern::Join { left, right } => {
                let left_context = context
                    .with_required(&visible_variables(right))
                    .without_order();
                let right_context = context
                    .with_required(&visible_variables(left))
                    .without_order();
                let left = self.compile_pattern(left, &left_context)?;
                let left = self.ungroup(left);
                let right = self.compile_pattern(right, &right_context)?;
                let right = self.ungroup(right);
                Ok(left.join(right))
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let filter_variables = expression
                    .as_ref()
                    .map(expression_variables)
                    .unwrap_or_default();
                let left_context = context
                    .with_required(visible_variables(right).iter().chain(&filter_variables))
                    .without_order();
                let right_context = context
                    .with_required(visible_variables(left).iter().chain(&filter_variables))
                    .without_order();

                let left = self.compile_pattern(left, &left_context)?;
                let left = self.ungroup(left);
                let (right, on) = {
                    let mut optional = self.enter_optional();
                    let right = optional.compile_pattern(right, &right_context)?;
                    let mut right = optional.ungroup(right);
                    let on = match expression {
                        Some(expression) => {
                            vec![optional.compile_condition(expression, &mut right)?]
                        }
                        None => Vec::new(),
                    };
                    (right, on)
                };
                let unit = self.unit_table();
                Ok(left.left_join(right, on, unit))
            }
            GraphPattern::Filter { inner, expression } => {
                let inner_context = context.with_required(&expression_variables(expression));
                let mut fragment = self.compile_pattern(inner, &inner_context)?;
                let condition = self.compile_condition(expression, &mut fragment)?;
                fragment.add_filter(condition);
                Ok(fragment)
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner_context = context
                    .with_required(&expression_variables(expression))
                    .without_order();
                let mut fragment = self.compile_pattern(inner, &inner_context)?;
                let binding = match self.compile_value(expression, &mut fragment)? {
                    Value::Node(node) => Binding::Node(NodeRef {
                        origin: Some(variable.clone()),
                        ..node
                    }),
                    Value::Term(term) => Binding::Extension(term_scalar(&term)),
                    Value::Scalar(scalar) => Binding::Extension(scalar),
                    Value::Condition(condition) => {
                        Binding::Extension(Scalar::new(condition, ValueType::Boolean))
                    }
                };
                self.scope.bind(variable.clone(), binding);
                fragment.add_variable(variable);
                fragment.sort_columns = None;
                Ok(fragment)
            }
            GraphPattern::Union { .. } | GraphPattern::Intersection { .. } => {
                self.compile_set_operation(pattern, context)
            }
            GraphPattern::Difference { left, right } => self.compile_minus(left, right, context),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => self.compile_group(inner, variables, aggregates),
            GraphPattern::Distinct { .. }
            | GraphPattern::Reduced { .. }
            | GraphPattern::OrderBy { .. }
            | GraphPattern::Slice { .. }
            | GraphPattern::Project { .. } => self.compile_subselect(pattern),
            GraphPattern::MultiProject { .. } | GraphPattern::TaggedProject { .. } => {
                CompileError::unsupported("nested multi-projection")
            }
            GraphPattern::Path { .. } => CompileError::unsupported("property path"),
            GraphPattern::Values { .. } => CompileError::unsupported("VALUES"),
            GraphPattern::Service { .. } => CompileError::unsupported("SERVICE"),
            GraphPattern::EmptySet => {
                let mut fragment = JoinFragment::new(self.current_frame());
                fragment.conditions.push(SqlExpr::boolean(false));
                Ok(fragment)
            }
            GraphPattern::SingletonSet => Ok(JoinFragment::new(self.current_frame())),
        }
    }

    /// Scans the triple table once and constrains each position.
    fn compile_quad(&mut self, quad: &QuadPattern) -> CompileResult<JoinFragment> {
        let frame = self.current_frame();
        let alias = self.next_alias("t");
        let mut fragment = JoinFragment::new(frame);
        fragment.push_table(TableRef::table(TRIPLES_TABLE, &alias));
        if !self.options.include_deleted {
            fragment
                .conditions
                .push(SqlExpr::column(&alias, DELETED).eq(SqlExpr::boolean(false)));
        }

        for (position, term) in quad.positions() {
            let column = SqlExpr::column(&alias, quad_column(position));
            match self.pattern_variable(term) {
                Some(variable) => match self.scope.resolve(&variable).cloned() {
                    Some(Binding::Node(node)) if node.nullable => {
                        let condition = self.join_nullable(&mut fragment, &variable, node, column);
                        fragment.conditions.push(condition);
                    }
                    Some(Binding::Node(node)) => fragment.conditions.push(column.eq(node.id)),
                    Some(Binding::Extension(scalar)) => {
                        let node = NodeRef::new(column, frame);
                        let condition = self.compare_values(
                            Comparison::Eq,
                            Value::Node(node),
                            Value::Scalar(scalar),
                            &mut fragment,
                        )?;
                        fragment.conditions.push(condition);
                    }
                    None => {
                        if position == QuadPosition::Context {
                            fragment.conditions.push(column.clone().is_not_null());
                        }
                        let node = NodeRef::new(column, frame).bound_to(&variable);
                        fragment.add_variable(&variable);
                        self.scope.bind(variable, Binding::Node(node));
                    }
                },
                None => {
                    let id = term
                        .as_term()
                        .and_then(|term| self.constant_id(term, &mut fragment));
                    match id {
                        Some(id) => fragment.conditions.push(column.eq(id)),
                        None => fragment.conditions.push(SqlExpr::boolean(false)),
                    }
                }
            }
        }
        Ok(fragment)
    }

    /// The variable a pattern position stands for. Blank nodes are variables unless they are
    /// matched as constants.
    fn pattern_variable(&self, term: &TermPattern) -> Option<Variable> {
        match term {
            TermPattern::Variable(variable) => Some(variable.clone()),
            TermPattern::BlankNode(node)
                if self.options.blank_node_mode == BlankNodeMatchingMode::Variable =>
            {
                Some(blank_node_variable(node.as_str()))
            }
            _ => None,
        }
    }

    /// Compiles MINUS as an anti-join. A solution of `left` is removed if a solution of `right`
    /// agrees with it on the variables both sides share. Without shared variables nothing is
    /// removed.
    fn compile_minus(
        &mut self,
        left: &GraphPattern,
        right: &GraphPattern,
        context: &CompileContext,
    ) -> CompileResult<JoinFragment> {
        let right_variables = visible_variables(right);
        let shared: Vec<Variable> = visible_variables(left)
            .into_iter()
            .filter(|variable| right_variables.contains(variable))
            .collect();
        let left_context = context.with_required(&shared).without_order();
        let fragment = self.compile_pattern(left, &left_context)?;
        if shared.is_empty() {
            return Ok(fragment);
        }

        let mut fragment = self.ungroup(fragment);
        let excluded = {
            let mut sub = self.enter_scope(ScopeKind::Correlated);
            sub.scope.retain(|variable| shared.contains(variable));
            let inner = sub.compile_pattern(right, &CompileContext::unrestricted())?;
            let select = inner.into_select(vec![SelectItem::Expr {
                expr: SqlExpr::integer(1),
                alias: None,
            }]);
            SqlExpr::Exists {
                query: Box::new(Query::select(select)),
                negated: true,
            }
        };
        fragment.add_filter(excluded);
        Ok(fragment)
    }

    fn compile_group(
        &mut self,
        inner: &GraphPattern,
        variables: &[Variable],
        aggregates: &[(Variable, AggregateExpression)],
    ) -> CompileResult<JoinFragment> {
        let aggregated: Vec<Variable> = aggregates
            .iter()
            .flat_map(|(_, aggregate)| aggregate_variables(aggregate))
            .collect();
        let inner_context = CompileContext::requiring(variables.iter().chain(&aggregated));
        let fragment = self.compile_pattern(inner, &inner_context)?;
        let mut fragment = self.ungroup(fragment);

        let mut keys = Vec::new();
        for variable in variables {
            match self.scope.resolve(variable).cloned() {
                Some(Binding::Node(node)) => {
                    let alias = self.node_alias(&node, &mut fragment);
                    keys.push(node.id.clone());
                    keys.extend(
                        NodeColumn::ALL
                            .iter()
                            .filter(|column| **column != NodeColumn::Id)
                            .map(|column| SqlExpr::column(&alias, column.name())),
                    );
                }
                Some(Binding::Extension(scalar)) => keys.push(scalar.expr),
                None => {}
            }
        }

        let mut values = Vec::with_capacity(aggregates.len());
        for (variable, aggregate) in aggregates {
            values.push((variable, self.compile_aggregate(aggregate, &mut fragment)?));
        }

        for variable in std::mem::take(&mut fragment.variables) {
            if variables.contains(&variable) {
                fragment.variables.push(variable);
            } else {
                self.scope.unbind(&variable);
            }
        }
        for (variable, scalar) in values {
            self.scope.bind(variable.clone(), Binding::Extension(scalar));
            fragment.add_variable(variable);
        }
        fragment.grouping = Some(Grouping {
            keys,
            having: Vec::new(),
        });
        fragment.sort_columns = None;
        Ok(fragment)
    }

    /// Compiles a pattern with solution modifiers as a derived table.
    fn compile_subselect(&mut self, pattern: &GraphPattern) -> CompileResult<JoinFragment> {
        let plan = {
            let mut sub = self.enter_scope(ScopeKind::Isolated);
            sub.build_query(pattern)?
        };
        if plan.columns.iter().any(|column| column.branch.is_some()) {
            return CompileError::unsupported("nested multi-projection");
        }

        let frame = self.current_frame();
        let alias = self.next_alias("s");
        let mut fragment = JoinFragment::new(frame);
        fragment.push_table(TableRef::derived(plan.query, &alias));
        for column in plan.columns {
            let expr = SqlExpr::quoted_column(&alias, &column.column);
            let binding = match column.kind {
                ColumnKind::Node => {
                    Binding::Node(NodeRef::new(expr, frame).bound_to(&column.variable))
                }
                ColumnKind::Value(ty) => Binding::Extension(Scalar::new(expr, ty)),
            };
            self.bind_derived(&mut fragment, &column.variable, binding)?;
        }
        Ok(fragment)
    }

    /// Binds a variable exported by a derived table. A variable that is already bound is joined
    /// on equality instead.
    pub(crate) fn bind_derived(
        &mut self,
        fragment: &mut JoinFragment,
        variable: &Variable,
        binding: Binding,
    ) -> CompileResult<()> {
        let Some(existing) = self.scope.resolve(variable).cloned() else {
            self.scope.bind(variable.clone(), binding);
            fragment.add_variable(variable);
            return Ok(());
        };
        let condition = match (existing, binding) {
            (Binding::Node(existing), Binding::Node(derived)) if existing.nullable => {
                self.join_nullable(fragment, variable, existing, derived.id)
            }
            (Binding::Node(existing), Binding::Node(derived)) => existing.id.eq(derived.id),
            (existing, derived) => {
                self.compare_values(Comparison::Eq, value(existing), value(derived), fragment)?
            }
        };
        fragment.conditions.push(condition);
        Ok(())
    }

    /// Joins a node that may be NULL because it was bound by an optional part. Rows where the
    /// node is unbound are kept and the variable is rebound to whichever id is present.
    fn join_nullable(
        &mut self,
        fragment: &mut JoinFragment,
        variable: &Variable,
        existing: NodeRef,
        id: SqlExpr,
    ) -> SqlExpr {
        let condition = existing
            .id
            .clone()
            .is_null()
            .or(id.clone().eq(existing.id.clone()));
        let merged = SqlExpr::function(SqlFunction::Coalesce, vec![existing.id, id]);
        let node = NodeRef::new(merged, self.current_frame()).bound_to(variable);
        self.scope.bind(variable.clone(), Binding::Node(node));
        fragment.add_variable(variable);
        condition
    }

    /// Wraps a grouped fragment in a derived table so that it can be joined.
    pub(crate) fn ungroup(&mut self, fragment: JoinFragment) -> JoinFragment {
        if fragment.is_grouped() {
            self.derive(fragment)
        } else {
            fragment
        }
    }

    fn derive(&mut self, mut fragment: JoinFragment) -> JoinFragment {
        self.forget_constants(&mut fragment);
        let frame = fragment.frame;
        let alias = self.next_alias("s");
        let variables = std::mem::take(&mut fragment.variables);
        let back_joins = std::mem::take(&mut fragment.back_joins);

        let mut projection = Vec::with_capacity(variables.len());
        let mut bindings = Vec::with_capacity(variables.len());
        for variable in &variables {
            let column = SqlExpr::quoted_column(&alias, variable.as_str());
            let (expr, binding) = match self.scope.resolve(variable) {
                Some(Binding::Node(node)) => (
                    node.id.clone(),
                    Binding::Node(NodeRef::new(column, frame).bound_to(variable)),
                ),
                Some(Binding::Extension(scalar)) => (
                    scalar.expr.clone(),
                    Binding::Extension(Scalar::new(column, scalar.ty)),
                ),
                None => continue,
            };
            projection.push(SelectItem::aliased(expr, Ident::quoted(variable.as_str())));
            bindings.push((variable, binding));
        }

        let select = fragment.into_select(projection);
        let mut derived = JoinFragment::new(frame);
        derived.push_table(TableRef::derived(Query::select(select), alias));
        derived.back_joins = back_joins;
        for (variable, binding) in bindings {
            self.scope.bind(variable.clone(), binding);
            derived.add_variable(variable);
        }
        derived
    }
}

/// The variable standing for a blank node of a pattern.
pub(crate) fn blank_node_variable(label: &str) -> Variable {
    Variable::new_unchecked(format!("_bnode_{label}"))
}

fn value(binding: Binding) -> Value {
    match binding {
        Binding::Node(node) => Value::Node(node),
        Binding::Extension(scalar) => Value::Scalar(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compilation::PreloadedConstants;
    use triplesql_common::CompilerOptions;
    use triplesql_model::algebra::Expression;
    use triplesql_common::SqlDialect;
    use triplesql_model::NamedNode;
    use triplesql_sql::ToSql;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(value)
    }

    fn compile(pattern: &GraphPattern, options: &CompilerOptions) -> String {
        let mut compilation = Compilation::new(options, PreloadedConstants::default());
        let fragment = compilation
            .compile_pattern(pattern, &CompileContext::unrestricted())
            .unwrap();
        Query::select(fragment.into_select(vec![SelectItem::Wildcard])).to_sql(SqlDialect::Baseline)
    }

    #[test]
    fn shared_variable_becomes_a_join_condition() {
        let options = CompilerOptions::default()
            .with_preloaded_constants(false)
            .with_deleted_triples(true);
        let pattern = GraphPattern::join(
            GraphPattern::quad(QuadPattern::new(var("s"), iri("http://e/p"), var("o"))),
            GraphPattern::quad(QuadPattern::new(var("o"), iri("http://e/p"), var("x"))),
        );
        insta::assert_snapshot!(compile(&pattern, &options), @"SELECT * FROM triples AS t1 CROSS JOIN nodes AS c1 CROSS JOIN triples AS t2 WHERE c1.node_kind = 'uri' AND c1.uri = 'http://e/p' AND t1.predicate_id = c1.id AND t2.subject_id = t1.object_id AND t2.predicate_id = c1.id");
    }

    #[test]
    fn deleted_triples_are_skipped_by_default() {
        let options = CompilerOptions::default();
        let pattern = GraphPattern::quad(QuadPattern::new(var("s"), var("p"), var("o")));
        insta::assert_snapshot!(compile(&pattern, &options), @"SELECT * FROM triples AS t1 WHERE t1.deleted = FALSE");
    }

    #[test]
    fn graph_variable_requires_a_named_graph() {
        let options = CompilerOptions::default().with_deleted_triples(true);
        let pattern = GraphPattern::quad(
            QuadPattern::new(var("s"), var("p"), var("o")).in_context(var("g")),
        );
        insta::assert_snapshot!(compile(&pattern, &options), @"SELECT * FROM triples AS t1 WHERE t1.context_id IS NOT NULL");
    }

    #[test]
    fn unknown_constant_matches_nothing() {
        let options = CompilerOptions::default().with_deleted_triples(true);
        let p = iri("http://e/unknown");
        let mut constants = PreloadedConstants::default();
        constants.insert(p.clone().into(), None);
        let mut compilation = Compilation::new(&options, constants);
        let pattern = GraphPattern::quad(QuadPattern::new(var("s"), p, var("o")));
        let fragment = compilation
            .compile_pattern(&pattern, &CompileContext::unrestricted())
            .unwrap();
        assert_eq!(fragment.conditions, vec![SqlExpr::boolean(false)]);
    }

    #[test]
    fn optional_filter_goes_into_the_on_clause() {
        let options = CompilerOptions::default()
            .with_preloaded_constants(false)
            .with_deleted_triples(true);
        let pattern = GraphPattern::left_join(
            GraphPattern::quad(QuadPattern::new(var("s"), var("p"), var("o"))),
            GraphPattern::quad(QuadPattern::new(var("s"), var("q"), var("x"))),
            Some(Expression::Bound(var("x"))),
        );
        insta::assert_snapshot!(compile(&pattern, &options), @"SELECT * FROM triples AS t1 LEFT OUTER JOIN triples AS t2 ON t2.subject_id = t1.subject_id AND t2.object_id IS NOT NULL");
    }

    #[test]
    fn variable_of_an_optional_part_may_be_unbound_in_later_joins() {
        let options = CompilerOptions::default().with_deleted_triples(true);
        let pattern = GraphPattern::join(
            GraphPattern::left_join(
                GraphPattern::quad(QuadPattern::new(var("s"), var("p"), var("o"))),
                GraphPattern::quad(QuadPattern::new(var("s"), var("q"), var("x"))),
                None,
            ),
            GraphPattern::quad(QuadPattern::new(var("x"), var("r"), var("y"))),
        );
        let sql = compile(&pattern, &options);
        assert!(
            sql.contains("t2.object_id IS NULL OR t3.subject_id = t2.object_id"),
            "{sql}"
        );
    }

    #[test]
    fn blank_nodes_act_as_variables() {
        let options = CompilerOptions::default().with_deleted_triples(true);
        let b = triplesql_model::BlankNode::new_unchecked("b");
        let pattern = GraphPattern::join(
            GraphPattern::quad(QuadPattern::new(b.clone(), var("p"), var("o"))),
            GraphPattern::quad(QuadPattern::new(b, var("q"), var("x"))),
        );
        insta::assert_snapshot!(compile(&pattern, &options), @"SELECT * FROM triples AS t1 CROSS JOIN triples AS t2 WHERE t2.subject_id = t1.subject_id");
    }

    #[test]
    fn paths_are_unsupported() {
        let options = CompilerOptions::default();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::Path {
            subject: var("s").into(),
            path: triplesql_model::algebra::PropertyPathExpression::NamedNode(iri("http://e/p")),
            object: var("o").into(),
        };
        let error = compilation
            .compile_pattern(&pattern, &CompileContext::unrestricted())
            .unwrap_err();
        assert!(matches!(error, CompileError::Unsupported { .. }));
    }
}
