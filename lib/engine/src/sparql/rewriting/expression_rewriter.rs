use crate::sparql::rewriting::GraphPatternRewriter;
use spargebra::algebra::{AggregateExpression, AggregateFunction, Expression, Function};
use triplesql_common::error::CompileError;
use triplesql_common::CompileResult;
use triplesql_model::algebra;

pub(super) struct ExpressionRewriter<'rewriter> {
    graph_rewriter: &'rewriter GraphPatternRewriter,
}

impl<'rewriter> ExpressionRewriter<'rewriter> {
    /// Creates a new expression rewriter. `EXISTS` patterns are rewritten by `graph_rewriter` so
    /// that they see the active graph.
    pub fn new(graph_rewriter: &'rewriter GraphPatternRewriter) -> Self {
        Self { graph_rewriter }
    }

    /// Rewrites an [Expression].
    pub fn rewrite(&self, expression: &Expression) -> CompileResult<algebra::Expression> {
        Ok(match expression {
            Expression::NamedNode(node) => algebra::Expression::NamedNode(node.clone()),
            Expression::Literal(literal) => algebra::Expression::Literal(literal.clone()),
            Expression::Variable(variable) => algebra::Expression::Variable(variable.clone()),
            Expression::Bound(variable) => algebra::Expression::Bound(variable.clone()),
            Expression::Or(lhs, rhs) => algebra::Expression::Or(self.boxed(lhs)?, self.boxed(rhs)?),
            Expression::And(lhs, rhs) => {
                algebra::Expression::And(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Equal(lhs, rhs) => {
                algebra::Expression::Equal(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::SameTerm(lhs, rhs) => {
                algebra::Expression::SameTerm(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Greater(lhs, rhs) => {
                algebra::Expression::Greater(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::GreaterOrEqual(lhs, rhs) => {
                algebra::Expression::GreaterOrEqual(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Less(lhs, rhs) => {
                algebra::Expression::Less(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::LessOrEqual(lhs, rhs) => {
                algebra::Expression::LessOrEqual(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::In(needle, list) => {
                algebra::Expression::In(self.boxed(needle)?, self.rewrite_all(list)?)
            }
            Expression::Add(lhs, rhs) => {
                algebra::Expression::Add(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Subtract(lhs, rhs) => {
                algebra::Expression::Subtract(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Multiply(lhs, rhs) => {
                algebra::Expression::Multiply(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Divide(lhs, rhs) => {
                algebra::Expression::Divide(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::UnaryPlus(inner) => algebra::Expression::UnaryPlus(self.boxed(inner)?),
            Expression::UnaryMinus(inner) => algebra::Expression::UnaryMinus(self.boxed(inner)?),
            Expression::Not(inner) => algebra::Expression::Not(self.boxed(inner)?),
            Expression::Exists(pattern) => algebra::Expression::Exists(Box::new(
                self.graph_rewriter.rewrite_graph_pattern(pattern)?,
            )),
            Expression::If(test, then, otherwise) => algebra::Expression::If(
                self.boxed(test)?,
                self.boxed(then)?,
                self.boxed(otherwise)?,
            ),
            Expression::Coalesce(args) => algebra::Expression::Coalesce(self.rewrite_all(args)?),
            Expression::FunctionCall(function, args) => {
                algebra::Expression::FunctionCall(
                    rewrite_function(function)?,
                    self.rewrite_all(args)?,
                )
            }
        })
    }

    /// Rewrites an [AggregateExpression].
    pub fn rewrite_aggregate(
        &self,
        aggregate: &AggregateExpression,
    ) -> CompileResult<algebra::AggregateExpression> {
        Ok(match aggregate {
            AggregateExpression::CountSolutions { distinct } => {
                algebra::AggregateExpression::CountSolutions {
                    distinct: *distinct,
                }
            }
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => algebra::AggregateExpression::FunctionCall {
                name: rewrite_aggregate_function(name),
                expr: self.rewrite(expr)?,
                distinct: *distinct,
            },
        })
    }

    fn boxed(&self, expression: &Expression) -> CompileResult<Box<algebra::Expression>> {
        self.rewrite(expression).map(Box::new)
    }

    fn rewrite_all(&self, expressions: &[Expression]) -> CompileResult<Vec<algebra::Expression>> {
        expressions.iter().map(|e| self.rewrite(e)).collect()
    }
}

fn rewrite_aggregate_function(function: &AggregateFunction) -> algebra::AggregateFunction {
    match function {
        AggregateFunction::Count => algebra::AggregateFunction::Count,
        AggregateFunction::Sum => algebra::AggregateFunction::Sum,
        AggregateFunction::Avg => algebra::AggregateFunction::Avg,
        AggregateFunction::Min => algebra::AggregateFunction::Min,
        AggregateFunction::Max => algebra::AggregateFunction::Max,
        AggregateFunction::Sample => algebra::AggregateFunction::Sample,
        AggregateFunction::GroupConcat { separator } => algebra::AggregateFunction::GroupConcat {
            separator: separator.clone(),
        },
        AggregateFunction::Custom(name) => algebra::AggregateFunction::Custom(name.clone()),
    }
}

fn rewrite_function(function: &Function) -> CompileResult<algebra::Function> {
    Ok(match function {
        Function::Str => algebra::Function::Str,
        Function::Lang => algebra::Function::Lang,
        Function::LangMatches => algebra::Function::LangMatches,
        Function::Datatype => algebra::Function::Datatype,
        Function::Iri => algebra::Function::Iri,
        Function::BNode => algebra::Function::BNode,
        Function::Rand => algebra::Function::Rand,
        Function::Abs => algebra::Function::Abs,
        Function::Ceil => algebra::Function::Ceil,
        Function::Floor => algebra::Function::Floor,
        Function::Round => algebra::Function::Round,
        Function::Concat => algebra::Function::Concat,
        Function::SubStr => algebra::Function::SubStr,
        Function::StrLen => algebra::Function::StrLen,
        Function::Replace => algebra::Function::Replace,
        Function::UCase => algebra::Function::UCase,
        Function::LCase => algebra::Function::LCase,
        Function::EncodeForUri => algebra::Function::EncodeForUri,
        Function::Contains => algebra::Function::Contains,
        Function::StrStarts => algebra::Function::StrStarts,
        Function::StrEnds => algebra::Function::StrEnds,
        Function::StrBefore => algebra::Function::StrBefore,
        Function::StrAfter => algebra::Function::StrAfter,
        Function::Year => algebra::Function::Year,
        Function::Month => algebra::Function::Month,
        Function::Day => algebra::Function::Day,
        Function::Hours => algebra::Function::Hours,
        Function::Minutes => algebra::Function::Minutes,
        Function::Seconds => algebra::Function::Seconds,
        Function::Timezone => algebra::Function::Timezone,
        Function::Tz => algebra::Function::Tz,
        Function::Now => algebra::Function::Now,
        Function::Uuid => algebra::Function::Uuid,
        Function::StrUuid => algebra::Function::StrUuid,
        Function::Md5 => algebra::Function::Md5,
        Function::Sha1 => algebra::Function::Sha1,
        Function::Sha256 => algebra::Function::Sha256,
        Function::Sha384 => algebra::Function::Sha384,
        Function::Sha512 => algebra::Function::Sha512,
        Function::StrLang => algebra::Function::StrLang,
        Function::StrDt => algebra::Function::StrDt,
        Function::IsIri => algebra::Function::IsIri,
        Function::IsBlank => algebra::Function::IsBlank,
        Function::IsLiteral => algebra::Function::IsLiteral,
        Function::IsNumeric => algebra::Function::IsNumeric,
        Function::Regex => algebra::Function::Regex,
        Function::Custom(name) => algebra::Function::Custom(name.clone()),
        #[allow(unreachable_patterns, reason = "Only reachable with optional spargebra features")]
        other => return CompileError::unsupported(other.to_string()),
    })
}
