use crate::compiler::compilation::Compilation;
use crate::compiler::fragment::JoinFragment;
use crate::compiler::types::{Scalar, Value, ValueType};
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_model::algebra::{AggregateExpression, AggregateFunction};
use triplesql_sql::{self as sql, SqlExpr, SqlType};

impl Compilation<'_> {
    pub(crate) fn compile_aggregate(
        &mut self,
        aggregate: &AggregateExpression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Scalar> {
        let (name, expr, distinct) = match aggregate {
            AggregateExpression::CountSolutions { distinct: false } => {
                return Ok(Scalar::new(
                    aggregate_expr(sql::AggregateFunction::CountStar, None, false),
                    ValueType::Integer,
                ));
            }
            AggregateExpression::CountSolutions { distinct: true } => {
                return CompileError::unsupported("COUNT(DISTINCT *)");
            }
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => (name, expr, *distinct),
        };

        let value = self.compile_value(expr, fragment)?;
        let (function, arg, ty) = match name {
            AggregateFunction::Count => {
                let arg = match value {
                    Value::Node(node) => node.id,
                    value => self.lexical_form(value, fragment),
                };
                (sql::AggregateFunction::Count, arg, ValueType::Integer)
            }
            AggregateFunction::Sum | AggregateFunction::Avg => {
                let function = if *name == AggregateFunction::Sum {
                    sql::AggregateFunction::Sum
                } else {
                    sql::AggregateFunction::Avg
                };
                let arg = self.typed_scalar(value, ValueType::Double, fragment)?;
                (function, arg, ValueType::Double)
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let function = if *name == AggregateFunction::Min {
                    sql::AggregateFunction::Min
                } else {
                    sql::AggregateFunction::Max
                };
                match value {
                    Value::Node(node) => {
                        let [number, date, text] = self.node_sort_exprs(&node, fragment);
                        let extreme = |arg| aggregate_expr(function.clone(), Some(arg), distinct);
                        let (number, date) = (extreme(number), extreme(date));
                        let expr = SqlExpr::case(
                            vec![
                                (number.clone().is_not_null(), number.cast(SqlType::Text)),
                                (date.clone().is_not_null(), date.cast(SqlType::Text)),
                            ],
                            Some(extreme(text)),
                        );
                        return Ok(Scalar::new(expr, ValueType::String));
                    }
                    Value::Scalar(scalar) => (function, scalar.expr, scalar.ty),
                    value => (function, self.lexical_form(value, fragment), ValueType::String),
                }
            }
            AggregateFunction::GroupConcat { separator } => {
                let separator = separator.clone().unwrap_or_else(|| " ".to_owned());
                let arg = self.lexical_form(value, fragment);
                (
                    sql::AggregateFunction::GroupConcat { separator },
                    arg,
                    ValueType::String,
                )
            }
            AggregateFunction::Sample => return CompileError::unsupported("SAMPLE"),
            AggregateFunction::Custom(iri) => {
                return CompileError::unsupported(format!("aggregate <{}>", iri.as_str()))
            }
        };
        Ok(Scalar::new(aggregate_expr(function, Some(arg), distinct), ty))
    }
}

fn aggregate_expr(
    function: sql::AggregateFunction,
    arg: Option<SqlExpr>,
    distinct: bool,
) -> SqlExpr {
    SqlExpr::Aggregate {
        function,
        arg: arg.map(Box::new),
        distinct,
    }
}
