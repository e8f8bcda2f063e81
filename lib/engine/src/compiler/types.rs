use crate::compiler::scope::NodeRef;
use std::fmt::{Display, Formatter};
use triplesql_model::Term;
use triplesql_sql::{SqlExpr, SqlType};

/// The type of a computed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Uri,
    String,
    Integer,
    Double,
    Boolean,
    Date,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Double)
    }

    /// The SQL type a value of this type is cast to. Booleans are never cast.
    pub(crate) fn sql_type(self) -> SqlType {
        match self {
            Self::Uri | Self::String | Self::Boolean => SqlType::Text,
            Self::Integer => SqlType::BigInt,
            Self::Double => SqlType::Double,
            Self::Date => SqlType::Timestamp,
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uri => "uri",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
        })
    }
}

/// A computed value together with its type.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scalar {
    pub expr: SqlExpr,
    pub ty: ValueType,
}

impl Scalar {
    pub fn new(expr: SqlExpr, ty: ValueType) -> Self {
        Self { expr, ty }
    }
}

/// The result of compiling a value expression.
#[derive(Clone, Debug)]
pub(crate) enum Value {
    /// A reference to a stored node.
    Node(NodeRef),
    /// A constant term of the query.
    Term(Term),
    Scalar(Scalar),
    /// A predicate.
    Condition(SqlExpr),
}

