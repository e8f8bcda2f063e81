use crate::compiler::compilation::Compilation;
use crate::compiler::fragment::JoinFragment;
use crate::compiler::types::{Scalar, Value, ValueType};
use regex::Regex;
use std::sync::LazyLock;
use triplesql_common::error::CompileError;
use triplesql_common::schema::NodeColumn;
use triplesql_common::CompileResult;
use triplesql_model::algebra::{Expression, Function};
use triplesql_model::vocab::xsd;
use triplesql_model::{NodeKind, Term};
use triplesql_sql::{
    BinaryOperator, Capability, DateField, DialectExt, HashAlgorithm, SqlExpr, SqlFunction,
};

/// Regular expressions that only match a literal text, optionally anchored.
#[allow(clippy::expect_used, reason = "The pattern is a constant")]
static SIMPLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^?[\p{L}\p{N} \-,:;/@#']*\$?$").expect("valid pattern"));

impl Compilation<'_> {
    pub(crate) fn compile_function(
        &mut self,
        function: &Function,
        args: &[Expression],
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let scalar = |expr: SqlExpr, ty: ValueType| Ok(Value::Scalar(Scalar::new(expr, ty)));
        match function {
            Function::Str => {
                let value = self.argument(function, args, 0, fragment)?;
                scalar(self.lexical_form(value, fragment), ValueType::String)
            }
            Function::Lang => {
                let value = self.argument(function, args, 0, fragment)?;
                let language = match value {
                    Value::Node(node) => SqlExpr::function(
                        SqlFunction::Coalesce,
                        vec![
                            self.node_column(&node, NodeColumn::Language, fragment),
                            SqlExpr::string(""),
                        ],
                    ),
                    Value::Term(Term::Literal(literal)) => {
                        SqlExpr::string(literal.language().unwrap_or_default())
                    }
                    _ => SqlExpr::string(""),
                };
                scalar(language, ValueType::String)
            }
            Function::LangMatches => {
                let tag = self.string_argument(function, args, 0, fragment)?;
                let Some(Expression::Literal(range)) = args.get(1) else {
                    return CompileError::unsupported("LANGMATCHES with a computed range");
                };
                let range = range.value().to_ascii_lowercase();
                let condition = if range == "*" {
                    tag.binary(BinaryOperator::NotEq, SqlExpr::string(""))
                } else {
                    let tag = SqlExpr::function(SqlFunction::Lower, vec![tag]);
                    tag.clone().eq(SqlExpr::string(&range)).or(SqlExpr::Like {
                        expr: Box::new(tag),
                        pattern: Box::new(SqlExpr::string(format!("{range}-%"))),
                        negated: false,
                    })
                };
                Ok(Value::Condition(condition))
            }
            Function::Datatype => {
                let value = self.argument(function, args, 0, fragment)?;
                let datatype = match value {
                    Value::Node(node) => self.node_column(&node, NodeColumn::Datatype, fragment),
                    Value::Term(Term::Literal(literal)) => {
                        SqlExpr::string(literal.datatype().as_str())
                    }
                    Value::Term(_) => SqlExpr::null(),
                    Value::Scalar(Scalar { ty, .. }) => datatype_of(ty),
                    Value::Condition(_) => datatype_of(ValueType::Boolean),
                };
                scalar(datatype, ValueType::Uri)
            }
            Function::Iri => match self.argument(function, args, 0, fragment)? {
                Value::Node(node) => {
                    let uri = self.node_column(&node, NodeColumn::Uri, fragment);
                    let content = self.node_column(&node, NodeColumn::Content, fragment);
                    scalar(
                        SqlExpr::function(SqlFunction::Coalesce, vec![uri, content]),
                        ValueType::Uri,
                    )
                }
                value => scalar(self.lexical_form(value, fragment), ValueType::Uri),
            },
            Function::Rand => {
                self.require(Capability::Random, function)?;
                scalar(
                    SqlExpr::function(SqlFunction::Random, Vec::new()),
                    ValueType::Double,
                )
            }
            Function::Abs | Function::Ceil | Function::Floor | Function::Round => {
                let sql_function = match function {
                    Function::Abs => SqlFunction::Abs,
                    Function::Ceil => SqlFunction::Ceil,
                    Function::Floor => SqlFunction::Floor,
                    _ => SqlFunction::Round,
                };
                let arg = self.numeric_argument(function, args, 0, fragment)?;
                scalar(SqlExpr::function(sql_function, vec![arg]), ValueType::Double)
            }
            Function::Concat => {
                let mut parts = Vec::with_capacity(args.len());
                for idx in 0..args.len() {
                    parts.push(self.string_argument(function, args, idx, fragment)?);
                }
                if parts.is_empty() {
                    return scalar(SqlExpr::string(""), ValueType::String);
                }
                scalar(SqlExpr::function(SqlFunction::Concat, parts), ValueType::String)
            }
            Function::SubStr => {
                let text = self.string_argument(function, args, 0, fragment)?;
                let start = self.integer_argument(function, args, 1, fragment)?;
                let length = match args.get(2) {
                    Some(_) => Some(Box::new(self.integer_argument(function, args, 2, fragment)?)),
                    None => None,
                };
                scalar(
                    SqlExpr::Substring {
                        expr: Box::new(text),
                        start: Box::new(start),
                        length,
                    },
                    ValueType::String,
                )
            }
            Function::StrLen => {
                let text = self.string_argument(function, args, 0, fragment)?;
                scalar(length(text), ValueType::Integer)
            }
            Function::UCase | Function::LCase => {
                let sql_function = if *function == Function::UCase {
                    SqlFunction::Upper
                } else {
                    SqlFunction::Lower
                };
                let text = self.string_argument(function, args, 0, fragment)?;
                scalar(SqlExpr::function(sql_function, vec![text]), ValueType::String)
            }
            Function::Contains => {
                let text = self.string_argument(function, args, 0, fragment)?;
                let needle = self.string_argument(function, args, 1, fragment)?;
                Ok(Value::Condition(
                    position(needle, text).binary(BinaryOperator::Gt, SqlExpr::integer(0)),
                ))
            }
            Function::StrStarts => {
                let text = self.string_argument(function, args, 0, fragment)?;
                let prefix = self.string_argument(function, args, 1, fragment)?;
                let head = SqlExpr::Substring {
                    expr: Box::new(text),
                    start: Box::new(SqlExpr::integer(1)),
                    length: Some(Box::new(length(prefix.clone()))),
                };
                Ok(Value::Condition(head.eq(prefix)))
            }
            Function::StrEnds => {
                let text = self.string_argument(function, args, 0, fragment)?;
                let suffix = self.string_argument(function, args, 1, fragment)?;
                let start = length(text.clone())
                    .binary(BinaryOperator::Minus, length(suffix.clone()))
                    .binary(BinaryOperator::Plus, SqlExpr::integer(1));
                let fits =
                    length(text.clone()).binary(BinaryOperator::GtEq, length(suffix.clone()));
                let tail = SqlExpr::Substring {
                    expr: Box::new(text),
                    start: Box::new(start),
                    length: None,
                };
                Ok(Value::Condition(fits.and(tail.eq(suffix))))
            }
            Function::StrBefore | Function::StrAfter => {
                let text = self.string_argument(function, args, 0, fragment)?;
                let needle = self.string_argument(function, args, 1, fragment)?;
                let found = position(needle.clone(), text.clone());
                let part = if *function == Function::StrBefore {
                    SqlExpr::Substring {
                        expr: Box::new(text),
                        start: Box::new(SqlExpr::integer(1)),
                        length: Some(Box::new(
                            found.clone().binary(BinaryOperator::Minus, SqlExpr::integer(1)),
                        )),
                    }
                } else {
                    SqlExpr::Substring {
                        expr: Box::new(text),
                        start: Box::new(found.clone().binary(BinaryOperator::Plus, length(needle))),
                        length: None,
                    }
                };
                scalar(
                    SqlExpr::case(
                        vec![(found.binary(BinaryOperator::Gt, SqlExpr::integer(0)), part)],
                        Some(SqlExpr::string("")),
                    ),
                    ValueType::String,
                )
            }
            Function::Replace => {
                self.require(Capability::RegexReplace, function)?;
                let text = self.string_argument(function, args, 0, fragment)?;
                let pattern = self.string_argument(function, args, 1, fragment)?;
                let replacement = self.string_argument(function, args, 2, fragment)?;
                let case_insensitive = constant_flags(function, args.get(3))?;
                scalar(
                    SqlExpr::RegexReplace {
                        expr: Box::new(text),
                        pattern: Box::new(pattern),
                        replacement: Box::new(replacement),
                        case_insensitive,
                    },
                    ValueType::String,
                )
            }
            Function::Regex => self.regex(function, args, fragment),
            Function::Year
            | Function::Month
            | Function::Day
            | Function::Hours
            | Function::Minutes
            | Function::Seconds => {
                let (field, ty) = match function {
                    Function::Year => (DateField::Year, ValueType::Integer),
                    Function::Month => (DateField::Month, ValueType::Integer),
                    Function::Day => (DateField::Day, ValueType::Integer),
                    Function::Hours => (DateField::Hour, ValueType::Integer),
                    Function::Minutes => (DateField::Minute, ValueType::Integer),
                    _ => (DateField::Second, ValueType::Double),
                };
                let value = self.argument(function, args, 0, fragment)?;
                let date = self.typed_scalar(value, ValueType::Date, fragment)?;
                scalar(
                    SqlExpr::Extract {
                        field,
                        expr: Box::new(date),
                    },
                    ty,
                )
            }
            Function::Now => scalar(SqlExpr::CurrentTimestamp, ValueType::Date),
            Function::Md5
            | Function::Sha1
            | Function::Sha256
            | Function::Sha384
            | Function::Sha512 => {
                let algorithm = match function {
                    Function::Md5 => HashAlgorithm::Md5,
                    Function::Sha1 => HashAlgorithm::Sha1,
                    Function::Sha256 => HashAlgorithm::Sha256,
                    Function::Sha384 => HashAlgorithm::Sha384,
                    _ => HashAlgorithm::Sha512,
                };
                self.require(Capability::Hash(algorithm), function)?;
                let text = self.string_argument(function, args, 0, fragment)?;
                scalar(
                    SqlExpr::function(SqlFunction::Hash(algorithm), vec![text]),
                    ValueType::String,
                )
            }
            Function::IsIri | Function::IsBlank | Function::IsLiteral | Function::IsNumeric => {
                let kinds: &[NodeKind] = match function {
                    Function::IsIri => &[NodeKind::Uri],
                    Function::IsBlank => &[NodeKind::BlankNode],
                    Function::IsNumeric => &[NodeKind::Integer, NodeKind::Double],
                    _ => &[
                        NodeKind::String,
                        NodeKind::Integer,
                        NodeKind::Double,
                        NodeKind::Date,
                    ],
                };
                if args.first().is_some_and(|arg| !is_variable_or_constant(arg)) {
                    return CompileError::type_contract(format!(
                        "{function} is only defined on variables and constants"
                    ));
                }
                let value = self.argument(function, args, 0, fragment)?;
                Ok(Value::Condition(self.kind_test(function, value, kinds, fragment)?))
            }
            Function::Custom(iri) => self.cast_function(iri.as_str(), args, fragment),
            Function::BNode
            | Function::EncodeForUri
            | Function::Timezone
            | Function::Tz
            | Function::Uuid
            | Function::StrUuid
            | Function::StrLang
            | Function::StrDt => CompileError::unsupported(function.to_string()),
        }
    }

    fn argument(
        &mut self,
        function: &Function,
        args: &[Expression],
        idx: usize,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let Some(arg) = args.get(idx) else {
            return CompileError::type_contract(format!(
                "{function} expects at least {} arguments",
                idx + 1
            ));
        };
        self.compile_value(arg, fragment)
    }

    fn string_argument(
        &mut self,
        function: &Function,
        args: &[Expression],
        idx: usize,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let value = self.argument(function, args, idx, fragment)?;
        self.typed_scalar(value, ValueType::String, fragment)
    }

    fn numeric_argument(
        &mut self,
        function: &Function,
        args: &[Expression],
        idx: usize,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let value = self.argument(function, args, idx, fragment)?;
        self.typed_scalar(value, ValueType::Double, fragment)
    }

    fn integer_argument(
        &mut self,
        function: &Function,
        args: &[Expression],
        idx: usize,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let value = self.argument(function, args, idx, fragment)?;
        self.typed_scalar(value, ValueType::Integer, fragment)
    }

    fn require(&self, capability: Capability, function: &Function) -> CompileResult<()> {
        if self.dialect().supports(capability) {
            Ok(())
        } else {
            CompileError::dialect_gap(function.to_string(), self.dialect())
        }
    }

    /// `REGEX` with a constant pattern. Patterns that only match a literal text become `LIKE`.
    fn regex(
        &mut self,
        function: &Function,
        args: &[Expression],
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let text = self.string_argument(function, args, 0, fragment)?;
        let Some(Expression::Literal(pattern)) = args.get(1) else {
            return CompileError::unsupported("REGEX with a computed pattern");
        };
        let case_insensitive = constant_flags(function, args.get(2))?;
        let pattern = pattern.value();

        if let Some(like) = like_pattern(pattern) {
            let (text, like) = if case_insensitive {
                (
                    SqlExpr::function(SqlFunction::Lower, vec![text]),
                    like.to_lowercase(),
                )
            } else {
                (text, like)
            };
            return Ok(Value::Condition(SqlExpr::Like {
                expr: Box::new(text),
                pattern: Box::new(SqlExpr::string(like)),
                negated: false,
            }));
        }

        self.require(Capability::RegexMatch, function)?;
        Ok(Value::Condition(SqlExpr::RegexMatch {
            expr: Box::new(text),
            pattern: Box::new(SqlExpr::string(pattern)),
            case_insensitive,
        }))
    }

    fn kind_test(
        &mut self,
        function: &Function,
        value: Value,
        kinds: &[NodeKind],
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        Ok(match value {
            Value::Node(node) => {
                let kind = self.node_column(&node, NodeColumn::Kind, fragment);
                SqlExpr::InList {
                    expr: Box::new(kind),
                    list: kinds.iter().map(|k| SqlExpr::string(k.as_str())).collect(),
                    negated: false,
                }
            }
            Value::Term(term) => {
                let kind = triplesql_model::NodeContent::from_term(term.as_ref()).kind;
                SqlExpr::boolean(kinds.contains(&kind))
            }
            // A variable bound to a computed value.
            Value::Scalar(scalar) => {
                let kind = match scalar.ty {
                    ValueType::Uri => NodeKind::Uri,
                    ValueType::Integer => NodeKind::Integer,
                    ValueType::Double => NodeKind::Double,
                    ValueType::Date => NodeKind::Date,
                    ValueType::String | ValueType::Boolean => NodeKind::String,
                };
                if kinds.contains(&kind) {
                    scalar.expr.is_not_null()
                } else {
                    SqlExpr::boolean(false)
                }
            }
            Value::Condition(_) => {
                return CompileError::type_contract(format!(
                    "{function} is applied to a condition"
                ));
            }
        })
    }

    /// The XSD constructor functions, compiled as coercions under the cast policy.
    fn cast_function(
        &mut self,
        iri: &str,
        args: &[Expression],
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let ty = if [xsd::INTEGER, xsd::INT, xsd::LONG]
            .iter()
            .any(|t| t.as_str() == iri)
        {
            ValueType::Integer
        } else if [xsd::DOUBLE, xsd::FLOAT, xsd::DECIMAL]
            .iter()
            .any(|t| t.as_str() == iri)
        {
            ValueType::Double
        } else if xsd::STRING.as_str() == iri {
            ValueType::String
        } else if xsd::BOOLEAN.as_str() == iri {
            ValueType::Boolean
        } else if xsd::DATE_TIME.as_str() == iri {
            ValueType::Date
        } else {
            return CompileError::unsupported(format!("function <{iri}>"));
        };
        let Some(arg) = args.first() else {
            return CompileError::type_contract(format!("<{iri}> expects one argument"));
        };
        let value = self.compile_value(arg, fragment)?;
        Ok(match ty {
            ValueType::String => {
                Value::Scalar(Scalar::new(self.lexical_form(value, fragment), ty))
            }
            ValueType::Boolean => Value::Condition(self.as_condition(value, fragment)?),
            _ => {
                let expr = match value {
                    Value::Scalar(scalar) if scalar.ty == ValueType::Boolean => {
                        return CompileError::type_contract(format!(
                            "<{iri}> cannot be applied to a boolean"
                        ))
                    }
                    value => self.typed_scalar(value, ty, fragment)?,
                };
                Value::Scalar(Scalar::new(expr, ty))
            }
        })
    }
}

/// Reads the flags of `REGEX` and `REPLACE`. Only `i` is supported.
fn constant_flags(function: &Function, flags: Option<&Expression>) -> CompileResult<bool> {
    match flags {
        None => Ok(false),
        Some(Expression::Literal(flags)) if flags.value().chars().all(|c| c == 'i') => {
            Ok(!flags.value().is_empty())
        }
        Some(_) => CompileError::unsupported(format!("{function} with flags other than 'i'")),
    }
}

fn is_variable_or_constant(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Variable(_) | Expression::NamedNode(_) | Expression::Literal(_)
    )
}

/// Translates a regular expression into a `LIKE` pattern if it only matches a literal text.
fn like_pattern(pattern: &str) -> Option<String> {
    if !SIMPLE_PATTERN.is_match(pattern) {
        return None;
    }
    let (anchored_start, rest) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (anchored_end, text) = match rest.strip_suffix('$') {
        Some(text) => (true, text),
        None => (false, rest),
    };
    let mut like = String::with_capacity(text.len() + 2);
    if !anchored_start {
        like.push('%');
    }
    like.push_str(text);
    if !anchored_end {
        like.push('%');
    }
    Some(like)
}

fn length(text: SqlExpr) -> SqlExpr {
    SqlExpr::function(SqlFunction::CharLength, vec![text])
}

fn position(needle: SqlExpr, haystack: SqlExpr) -> SqlExpr {
    SqlExpr::Position {
        needle: Box::new(needle),
        haystack: Box::new(haystack),
    }
}

fn datatype_of(ty: ValueType) -> SqlExpr {
    match ty {
        ValueType::Uri => SqlExpr::null(),
        ValueType::String => SqlExpr::string(xsd::STRING.as_str()),
        ValueType::Integer => SqlExpr::string(xsd::INTEGER.as_str()),
        ValueType::Double => SqlExpr::string(xsd::DOUBLE.as_str()),
        ValueType::Boolean => SqlExpr::string(xsd::BOOLEAN.as_str()),
        ValueType::Date => SqlExpr::string(xsd::DATE_TIME.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_become_like() {
        assert_eq!(like_pattern("abc").as_deref(), Some("%abc%"));
        assert_eq!(like_pattern("^abc").as_deref(), Some("abc%"));
        assert_eq!(like_pattern("^a b$").as_deref(), Some("a b"));
        assert_eq!(like_pattern("a.c"), None);
        assert_eq!(like_pattern("a_c"), None);
        assert_eq!(like_pattern("(a|b)"), None);
    }

    #[test]
    fn only_the_case_insensitive_flag_is_supported() {
        let flag = |f: &str| Expression::Literal(triplesql_model::Literal::new_simple_literal(f));
        assert!(!constant_flags(&Function::Regex, None).unwrap());
        assert!(constant_flags(&Function::Regex, Some(&flag("i"))).unwrap());
        assert!(constant_flags(&Function::Regex, Some(&flag("s"))).is_err());
    }
}
