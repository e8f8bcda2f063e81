use std::fmt::{Display, Formatter};
use triplesql_common::SqlDialect;

/// An identifier. Quoted identifiers keep their case in every dialect.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
}

impl Ident {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }
}

/// A complete query: a set expression with its modifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub body: SetExpr,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    pub fn select(select: Select) -> Self {
        Self {
            body: SetExpr::Select(Box::new(select)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SetExpr {
    Select(Box<Select>),
    SetOperation {
        op: SetOperator,
        left: Box<SetExpr>,
        right: Box<SetExpr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetOperator {
    /// Always `UNION ALL`; duplicates are removed by an explicit `DISTINCT`.
    UnionAll,
    Intersect,
    Except,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub selection: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: SqlExpr, alias: Option<Ident> },
}

impl SelectItem {
    pub fn aliased(expr: SqlExpr, alias: Ident) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias),
        }
    }
}

/// A `FROM` item. Joins are kept left-deep; a join on the right-hand side is rendered in
/// parentheses.
#[derive(Clone, Debug, PartialEq)]
pub enum TableRef {
    Table {
        name: String,
        alias: String,
    },
    Derived {
        query: Box<Query>,
        alias: String,
    },
    Join {
        left: Box<TableRef>,
        right: Box<TableRef>,
        kind: JoinKind,
        on: Option<SqlExpr>,
    },
}

impl TableRef {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Table {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn derived(query: Query, alias: impl Into<String>) -> Self {
        Self::Derived {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    pub fn join(self, right: TableRef, kind: JoinKind, on: Option<SqlExpr>) -> Self {
        Self::Join {
            left: Box::new(self),
            right: Box::new(right),
            kind,
            on,
        }
    }

    /// Appends all joins of `other` to this chain, keeping the result left-deep. The first table
    /// of `other` is attached with a cross join.
    #[must_use]
    pub fn graft(self, other: TableRef) -> Self {
        match other {
            Self::Join {
                left,
                right,
                kind,
                on,
            } => self.graft(*left).join(*right, kind, on),
            leaf => self.join(leaf, JoinKind::Cross, None),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    Cross,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub expr: SqlExpr,
    pub ascending: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlLiteral {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub(crate) fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 4,
            Self::Plus | Self::Minus => 5,
            Self::Multiply | Self::Divide => 6,
        }
    }

    pub(crate) fn is_associative(self) -> bool {
        matches!(self, Self::Or | Self::And | Self::Plus | Self::Multiply)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

/// The types the compiler casts to. Their spelling depends on the dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SqlType {
    BigInt,
    Double,
    Text,
    Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

/// Scalar functions whose spelling differs between dialects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SqlFunction {
    CharLength,
    Upper,
    Lower,
    Concat,
    Coalesce,
    NullIf,
    Abs,
    Ceil,
    Floor,
    Round,
    Random,
    Hash(HashAlgorithm),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    CountStar,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    GroupConcat { separator: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        column: Ident,
    },
    Literal(SqlLiteral),
    BinaryOp {
        left: Box<SqlExpr>,
        op: BinaryOperator,
        right: Box<SqlExpr>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<SqlExpr>,
    },
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    /// A searched `CASE`.
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        else_result: Option<Box<SqlExpr>>,
    },
    Cast {
        expr: Box<SqlExpr>,
        data_type: SqlType,
    },
    Function {
        function: SqlFunction,
        args: Vec<SqlExpr>,
    },
    Aggregate {
        function: AggregateFunction,
        arg: Option<Box<SqlExpr>>,
        distinct: bool,
    },
    Like {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        negated: bool,
    },
    RegexMatch {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        case_insensitive: bool,
    },
    RegexReplace {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        replacement: Box<SqlExpr>,
        case_insensitive: bool,
    },
    Extract {
        field: DateField,
        expr: Box<SqlExpr>,
    },
    /// The one-based position of `needle` in `haystack`, zero if absent.
    Position {
        needle: Box<SqlExpr>,
        haystack: Box<SqlExpr>,
    },
    Substring {
        expr: Box<SqlExpr>,
        start: Box<SqlExpr>,
        length: Option<Box<SqlExpr>>,
    },
    CurrentTimestamp,
    Exists {
        query: Box<Query>,
        negated: bool,
    },
}

impl SqlExpr {
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            column: Ident::plain(column),
        }
    }

    /// A reference to a quoted column of a derived table.
    pub fn quoted_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            column: Ident::quoted(column),
        }
    }

    pub fn null() -> Self {
        Self::Literal(SqlLiteral::Null)
    }

    pub fn boolean(value: bool) -> Self {
        Self::Literal(SqlLiteral::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::Literal(SqlLiteral::Integer(value))
    }

    pub fn double(value: f64) -> Self {
        Self::Literal(SqlLiteral::Double(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(SqlLiteral::String(value.into()))
    }

    pub fn binary(self, op: BinaryOperator, right: SqlExpr) -> Self {
        Self::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, right: SqlExpr) -> Self {
        self.binary(BinaryOperator::Eq, right)
    }

    pub fn and(self, right: SqlExpr) -> Self {
        self.binary(BinaryOperator::And, right)
    }

    pub fn or(self, right: SqlExpr) -> Self {
        self.binary(BinaryOperator::Or, right)
    }

    #[allow(clippy::should_implement_trait, reason = "Builds a syntax node")]
    pub fn not(self) -> Self {
        Self::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self),
        }
    }

    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn cast(self, data_type: SqlType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            data_type,
        }
    }

    pub fn function(function: SqlFunction, args: Vec<SqlExpr>) -> Self {
        Self::Function { function, args }
    }

    pub fn case(branches: Vec<(SqlExpr, SqlExpr)>, else_result: Option<SqlExpr>) -> Self {
        Self::Case {
            branches,
            else_result: else_result.map(Box::new),
        }
    }

    pub fn is_literal_false(&self) -> bool {
        matches!(self, Self::Literal(SqlLiteral::Boolean(false)))
    }

    pub fn is_literal_true(&self) -> bool {
        matches!(self, Self::Literal(SqlLiteral::Boolean(true)))
    }

    /// Conjunction of all `conditions`. Returns `None` if there are none; literal `TRUE` is
    /// dropped.
    pub fn conjunction(conditions: impl IntoIterator<Item = SqlExpr>) -> Option<SqlExpr> {
        conditions
            .into_iter()
            .filter(|c| !c.is_literal_true())
            .reduce(SqlExpr::and)
    }

    /// Disjunction of all `conditions`. An empty disjunction is `FALSE`.
    pub fn disjunction(conditions: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        conditions
            .into_iter()
            .reduce(SqlExpr::or)
            .unwrap_or_else(|| SqlExpr::boolean(false))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::ToSql::to_sql(self, SqlDialect::Baseline))
    }
}

impl Display for SqlExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::ToSql::to_sql(self, SqlDialect::Baseline))
    }
}
