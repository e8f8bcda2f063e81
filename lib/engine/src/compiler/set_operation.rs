use crate::compiler::compilation::Compilation;
use crate::compiler::context::CompileContext;
use crate::compiler::fragment::JoinFragment;
use crate::compiler::scope::{Binding, NodeRef, ScopeKind};
use crate::compiler::types::{Scalar, ValueType};
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_logical::{expression_variables, visible_variables};
use triplesql_model::algebra::GraphPattern;
use triplesql_model::Variable;
use triplesql_sql::{
    Ident, Query, Select, SelectItem, SetExpr, SetOperator, SqlExpr, SqlType, TableRef,
};

/// The number of sort columns every branch exports per ORDER BY key.
const SORT_COLUMNS_PER_KEY: usize = 3;

/// The name of a sort column exported by the branches of a set operation.
pub(crate) fn sort_column_name(key: usize, part: usize) -> String {
    format!("_sort{key}_{part}")
}

/// What a branch exports for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnShape {
    Node,
    Value(ValueType),
    Null,
}

struct Branch {
    select: Select,
    shapes: Vec<ColumnShape>,
}

impl Compilation<'_> {
    /// Compiles a UNION or INTERSECT into a derived table.
    ///
    /// Every branch exports the same columns, padding variables it does not bind with NULL.
    /// Nested unions are flattened into one chain of `UNION ALL`.
    pub(crate) fn compile_set_operation(
        &mut self,
        pattern: &GraphPattern,
        context: &CompileContext,
    ) -> CompileResult<JoinFragment> {
        let (op, left, right) = match pattern {
            GraphPattern::Union { left, right } => (SetOperator::UnionAll, left, right),
            GraphPattern::Intersection { left, right } => (SetOperator::Intersect, left, right),
            _ => return CompileError::internal("union or intersection expected"),
        };

        let mut variables = visible_variables(left);
        for variable in visible_variables(right) {
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        variables.retain(|variable| context.is_required(variable));

        let mut branches = Vec::new();
        if op == SetOperator::UnionAll {
            self.collect_union_branches(left, &variables, context, &mut branches)?;
            self.collect_union_branches(right, &variables, context, &mut branches)?;
        } else {
            branches.push(self.compile_branch(left, &variables, context)?);
            branches.push(self.compile_branch(right, &variables, context)?);
        }

        let shapes = merge_shapes(&variables, &branches)?;
        let body = branches
            .into_iter()
            .map(|mut branch| {
                align_branch(&mut branch, &shapes);
                SetExpr::Select(Box::new(branch.select))
            })
            .reduce(|left, right| SetExpr::SetOperation {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
            .ok_or_else(|| CompileError::Internal("set operation without branches".to_owned()))?;

        let frame = self.current_frame();
        let alias = self.next_alias("u");
        let mut fragment = JoinFragment::new(frame);
        let query = Query {
            body,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        };
        fragment.push_table(TableRef::derived(query, &alias));
        for (variable, shape) in variables.iter().zip(shapes) {
            let column = SqlExpr::quoted_column(&alias, variable.as_str());
            let binding = match shape {
                ColumnShape::Value(ty) => Binding::Extension(Scalar::new(column, ty)),
                ColumnShape::Node | ColumnShape::Null => {
                    Binding::Node(NodeRef::new(column, frame).bound_to(variable))
                }
            };
            self.bind_derived(&mut fragment, variable, binding)?;
        }
        fragment.sort_columns = context.order().map(|order| {
            (0..order.len())
                .map(|key| {
                    (0..SORT_COLUMNS_PER_KEY)
                        .map(|part| SqlExpr::quoted_column(&alias, sort_column_name(key, part)))
                        .collect()
                })
                .collect()
        });
        Ok(fragment)
    }

    fn collect_union_branches(
        &mut self,
        pattern: &GraphPattern,
        variables: &[Variable],
        context: &CompileContext,
        branches: &mut Vec<Branch>,
    ) -> CompileResult<()> {
        if let GraphPattern::Union { left, right } = pattern {
            self.collect_union_branches(left, variables, context, branches)?;
            self.collect_union_branches(right, variables, context, branches)
        } else {
            branches.push(self.compile_branch(pattern, variables, context)?);
            Ok(())
        }
    }

    /// Compiles one branch in its own scope. The branch exports `variables` followed by the sort
    /// columns of the enclosing ORDER BY.
    fn compile_branch(
        &mut self,
        pattern: &GraphPattern,
        variables: &[Variable],
        context: &CompileContext,
    ) -> CompileResult<Branch> {
        let order = context.order().unwrap_or_default();
        let order_variables: Vec<Variable> = order
            .iter()
            .flat_map(|key| expression_variables(key.expression()))
            .collect();
        let branch_context = CompileContext::requiring(variables.iter().chain(&order_variables));

        let mut branch = self.enter_scope(ScopeKind::Isolated);
        let mut fragment = branch.compile_pattern(pattern, &branch_context)?;

        let mut projection =
            Vec::with_capacity(variables.len() + order.len() * SORT_COLUMNS_PER_KEY);
        let mut shapes = Vec::with_capacity(variables.len());
        for variable in variables {
            let (expr, shape) = match branch.scope.resolve(variable) {
                Some(Binding::Node(node)) => (node.id.clone(), ColumnShape::Node),
                Some(Binding::Extension(scalar)) => {
                    (scalar.expr.clone(), ColumnShape::Value(scalar.ty))
                }
                None => (SqlExpr::null(), ColumnShape::Null),
            };
            projection.push(SelectItem::aliased(expr, Ident::quoted(variable.as_str())));
            shapes.push(shape);
        }
        for (key, order) in order.iter().enumerate() {
            let exprs = branch.aligned_sort_exprs(order.expression(), &mut fragment)?;
            for (part, expr) in exprs.into_iter().enumerate() {
                projection.push(SelectItem::aliased(
                    expr,
                    Ident::quoted(sort_column_name(key, part)),
                ));
            }
        }
        Ok(Branch {
            select: fragment.into_select(projection),
            shapes,
        })
    }
}

/// The shape of each exported column over all branches. Values of different types are exported
/// as text.
fn merge_shapes(variables: &[Variable], branches: &[Branch]) -> CompileResult<Vec<ColumnShape>> {
    let mut merged = vec![ColumnShape::Null; variables.len()];
    for branch in branches {
        for (idx, shape) in branch.shapes.iter().enumerate() {
            merged[idx] = match (merged[idx], *shape) {
                (ColumnShape::Null, shape) | (shape, ColumnShape::Null) => shape,
                (ColumnShape::Node, ColumnShape::Node) => ColumnShape::Node,
                (ColumnShape::Value(left), ColumnShape::Value(right)) if left == right => {
                    ColumnShape::Value(left)
                }
                (ColumnShape::Value(_), ColumnShape::Value(_)) => {
                    ColumnShape::Value(ValueType::String)
                }
                _ => {
                    return CompileError::unsupported(format!(
                        "set operation binding {} to nodes and computed values",
                        variables[idx]
                    ))
                }
            };
        }
    }
    Ok(merged)
}

/// Casts the columns of a branch whose type differs from the merged one.
fn align_branch(branch: &mut Branch, shapes: &[ColumnShape]) {
    for (idx, (shape, merged)) in branch.shapes.iter().zip(shapes).enumerate() {
        let (ColumnShape::Value(ty), ColumnShape::Value(merged)) = (shape, merged) else {
            continue;
        };
        if ty == merged {
            continue;
        }
        if let Some(SelectItem::Expr { expr, .. }) = branch.select.projection.get_mut(idx) {
            let value = std::mem::replace(expr, SqlExpr::null());
            *expr = value.cast(SqlType::Text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compilation::PreloadedConstants;
    use triplesql_common::{CompilerOptions, SqlDialect};
    use triplesql_model::algebra::{Expression, OrderExpression, QuadPattern};
    use triplesql_model::{Literal, NamedNode};
    use triplesql_sql::ToSql;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn quad(s: &str, p: &str, o: &str) -> GraphPattern {
        GraphPattern::quad(QuadPattern::new(var(s), var(p), var(o)))
    }

    fn options() -> CompilerOptions {
        CompilerOptions::default().with_deleted_triples(true)
    }

    fn render(fragment: JoinFragment) -> String {
        Query::select(fragment.into_select(vec![SelectItem::Wildcard])).to_sql(SqlDialect::Baseline)
    }

    #[test]
    fn branches_are_padded_with_null() {
        let options = options();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::union(quad("s", "p", "o"), quad("s", "q", "x"));
        let context = CompileContext::requiring([&var("s"), &var("o"), &var("x")]);
        let fragment = compilation
            .compile_set_operation(&pattern, &context)
            .unwrap();
        insta::assert_snapshot!(render(fragment), @r#"SELECT * FROM (SELECT t1.subject_id AS "s", t1.object_id AS "o", NULL AS "x" FROM triples AS t1 UNION ALL SELECT t2.subject_id AS "s", NULL AS "o", t2.object_id AS "x" FROM triples AS t2) AS u1"#);
    }

    #[test]
    fn nested_unions_are_flattened() {
        let options = options();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::union(
            GraphPattern::union(quad("s", "p", "o"), quad("s", "p", "o")),
            quad("s", "p", "o"),
        );
        let fragment = compilation
            .compile_set_operation(&pattern, &CompileContext::requiring([&var("s")]))
            .unwrap();
        insta::assert_snapshot!(render(fragment), @r#"SELECT * FROM (SELECT t1.subject_id AS "s" FROM triples AS t1 UNION ALL SELECT t2.subject_id AS "s" FROM triples AS t2 UNION ALL SELECT t3.subject_id AS "s" FROM triples AS t3) AS u1"#);
    }

    #[test]
    fn ordered_set_operation_exports_sort_columns() {
        let options = options();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::union(quad("s", "p", "o"), quad("s", "p", "o"));
        let order = [OrderExpression::Asc(Expression::Variable(var("o")))];
        let context = CompileContext::requiring([&var("s")]).with_order(&order);
        let fragment = compilation.compile_set_operation(&pattern, &context).unwrap();
        let sort_columns = fragment.sort_columns.clone().unwrap();
        assert_eq!(sort_columns.len(), 1);
        assert_eq!(
            sort_columns[0],
            vec![
                SqlExpr::quoted_column("u1", "_sort0_0"),
                SqlExpr::quoted_column("u1", "_sort0_1"),
                SqlExpr::quoted_column("u1", "_sort0_2"),
            ]
        );
        let sql = render(fragment);
        assert_eq!(sql.matches(r#"AS "_sort0_2""#).count(), 2);
    }

    #[test]
    fn differing_value_types_are_exported_as_text() {
        let options = options();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::union(
            GraphPattern::extend(
                GraphPattern::SingletonSet,
                var("x"),
                Expression::Literal(Literal::from(1)),
            ),
            GraphPattern::extend(
                GraphPattern::SingletonSet,
                var("x"),
                Expression::Literal(Literal::new_simple_literal("a")),
            ),
        );
        let fragment = compilation
            .compile_set_operation(&pattern, &CompileContext::unrestricted())
            .unwrap();
        insta::assert_snapshot!(render(fragment), @r#"SELECT * FROM (SELECT CAST(1 AS VARCHAR) AS "x" UNION ALL SELECT 'a' AS "x") AS u1"#);
    }

    #[test]
    fn nodes_and_values_cannot_share_a_column() {
        let options = options();
        let mut compilation = Compilation::new(&options, PreloadedConstants::default());
        let pattern = GraphPattern::union(
            quad("x", "p", "o"),
            GraphPattern::extend(
                GraphPattern::SingletonSet,
                var("x"),
                Expression::NamedNode(NamedNode::new_unchecked("http://e/a")),
            ),
        );
        let error = compilation
            .compile_set_operation(&pattern, &CompileContext::requiring([&var("x")]))
            .unwrap_err();
        assert!(matches!(error, CompileError::Unsupported { .. }));
    }
}
