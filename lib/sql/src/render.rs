use crate::{
    AggregateFunction, BinaryOperator, DateField, HashAlgorithm, Ident, JoinKind, OrderByExpr,
    Query, Select, SelectItem, SetExpr, SetOperator, SqlExpr, SqlFunction, SqlLiteral, SqlType,
    TableRef, UnaryOperator,
};
use itertools::Itertools;
use std::fmt::{Display, Formatter, Result, Write};
use triplesql_common::SqlDialect;
use triplesql_model::format_sql_timestamp;

/// MySQL has no `OFFSET` without `LIMIT`; this is the documented way to express "no limit".
const MYSQL_NO_LIMIT: &str = "18446744073709551615";

/// Renders a syntax node for a dialect.
pub trait ToSql {
    fn write_sql(&self, f: &mut Formatter<'_>, dialect: SqlDialect) -> Result;

    fn to_sql(&self, dialect: SqlDialect) -> String {
        Rendered {
            node: self,
            dialect,
        }
        .to_string()
    }
}

struct Rendered<'a, T: ?Sized> {
    node: &'a T,
    dialect: SqlDialect,
}

impl<T: ToSql + ?Sized> Display for Rendered<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.node.write_sql(f, self.dialect)
    }
}

impl ToSql for Query {
    fn write_sql(&self, f: &mut Formatter<'_>, dialect: SqlDialect) -> Result {
        Writer { f, dialect }.query(self)
    }
}

impl ToSql for SqlExpr {
    fn write_sql(&self, f: &mut Formatter<'_>, dialect: SqlDialect) -> Result {
        Writer { f, dialect }.expr(self)
    }
}

struct Writer<'a, 'f> {
    f: &'a mut Formatter<'f>,
    dialect: SqlDialect,
}

impl Writer<'_, '_> {
    fn query(&mut self, query: &Query) -> Result {
        self.set_expr(&query.body)?;
        if !query.order_by.is_empty() {
            self.f.write_str(" ORDER BY ")?;
            self.list(&query.order_by, Self::order_by)?;
        }
        match (query.limit, query.offset) {
            (Some(limit), _) => write!(self.f, " LIMIT {limit}")?,
            (None, Some(_)) if self.dialect == SqlDialect::MySql => {
                write!(self.f, " LIMIT {MYSQL_NO_LIMIT}")?;
            }
            (None, _) => {}
        }
        if let Some(offset) = query.offset {
            write!(self.f, " OFFSET {offset}")?;
        }
        Ok(())
    }

    fn order_by(&mut self, order_by: &OrderByExpr) -> Result {
        self.expr(&order_by.expr)?;
        if !order_by.ascending {
            self.f.write_str(" DESC")?;
        }
        Ok(())
    }

    fn set_expr(&mut self, set_expr: &SetExpr) -> Result {
        match set_expr {
            SetExpr::Select(select) => self.select(select),
            SetExpr::SetOperation { op, left, right } => {
                self.set_operand(left, *op, false)?;
                self.f.write_str(match op {
                    SetOperator::UnionAll => " UNION ALL ",
                    SetOperator::Intersect => " INTERSECT ",
                    SetOperator::Except => " EXCEPT ",
                })?;
                self.set_operand(right, *op, true)
            }
        }
    }

    fn set_operand(&mut self, operand: &SetExpr, parent: SetOperator, is_right: bool) -> Result {
        match operand {
            SetExpr::SetOperation { op, .. } if is_right || *op != parent => {
                self.f.write_char('(')?;
                self.set_expr(operand)?;
                self.f.write_char(')')
            }
            _ => self.set_expr(operand),
        }
    }

    fn select(&mut self, select: &Select) -> Result {
        self.f.write_str("SELECT ")?;
        if select.distinct {
            self.f.write_str("DISTINCT ")?;
        }
        if select.projection.is_empty() {
            self.f.write_char('1')?;
        } else {
            self.list(&select.projection, Self::select_item)?;
        }
        match &select.from {
            Some(from) => {
                self.f.write_str(" FROM ")?;
                self.table_ref(from)?;
            }
            None if self.dialect == SqlDialect::MySql
                && (select.selection.is_some() || select.having.is_some()) =>
            {
                self.f.write_str(" FROM DUAL")?;
            }
            None => {}
        }
        if let Some(selection) = &select.selection {
            self.f.write_str(" WHERE ")?;
            self.expr(selection)?;
        }
        if !select.group_by.is_empty() {
            self.f.write_str(" GROUP BY ")?;
            self.list(&select.group_by, Self::expr)?;
        }
        if let Some(having) = &select.having {
            self.f.write_str(" HAVING ")?;
            self.expr(having)?;
        }
        Ok(())
    }

    fn select_item(&mut self, item: &SelectItem) -> Result {
        match item {
            SelectItem::Wildcard => self.f.write_char('*'),
            SelectItem::Expr { expr, alias } => {
                self.expr(expr)?;
                if let Some(alias) = alias {
                    self.f.write_str(" AS ")?;
                    self.ident(alias)?;
                }
                Ok(())
            }
        }
    }

    fn table_ref(&mut self, table: &TableRef) -> Result {
        match table {
            TableRef::Table { name, alias } => write!(self.f, "{name} AS {alias}"),
            TableRef::Derived { query, alias } => {
                self.f.write_char('(')?;
                self.query(query)?;
                write!(self.f, ") AS {alias}")
            }
            TableRef::Join {
                left,
                right,
                kind,
                on,
            } => {
                self.table_ref(left)?;
                let keyword = match (kind, on) {
                    (JoinKind::Cross | JoinKind::Inner, None) => " CROSS JOIN ",
                    (JoinKind::Cross | JoinKind::Inner, Some(_)) => " INNER JOIN ",
                    (JoinKind::LeftOuter, _) => " LEFT OUTER JOIN ",
                };
                self.f.write_str(keyword)?;
                if matches!(right.as_ref(), TableRef::Join { .. }) {
                    self.f.write_char('(')?;
                    self.table_ref(right)?;
                    self.f.write_char(')')?;
                } else {
                    self.table_ref(right)?;
                }
                match (kind, on) {
                    (_, Some(on)) => {
                        self.f.write_str(" ON ")?;
                        self.expr(on)
                    }
                    (JoinKind::LeftOuter, None) => self.f.write_str(" ON TRUE"),
                    _ => Ok(()),
                }
            }
        }
    }

    fn ident(&mut self, ident: &Ident) -> Result {
        if !ident.quoted {
            return self.f.write_str(&ident.value);
        }
        let quote = match self.dialect {
            SqlDialect::MySql => '`',
            _ => '"',
        };
        self.f.write_char(quote)?;
        for c in ident.value.chars() {
            if c == quote {
                self.f.write_char(quote)?;
            }
            self.f.write_char(c)?;
        }
        self.f.write_char(quote)
    }

    fn list<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T) -> Result) -> Result {
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.f.write_str(", ")?;
            }
            write(self, item)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &SqlExpr) -> Result {
        match expr {
            SqlExpr::Column { table, column } => {
                if let Some(table) = table {
                    write!(self.f, "{table}.")?;
                }
                self.ident(column)
            }
            SqlExpr::Literal(literal) => self.literal(literal),
            SqlExpr::BinaryOp { left, op, right } => {
                self.operand(left, needs_parens(left, *op, false))?;
                write!(self.f, " {} ", op.as_str())?;
                self.operand(right, needs_parens(right, *op, true))
            }
            SqlExpr::UnaryOp { op, expr } => {
                self.f.write_str(match op {
                    UnaryOperator::Not => "NOT ",
                    UnaryOperator::Minus => "-",
                    UnaryOperator::Plus => "+",
                })?;
                self.operand(expr, precedence(expr) < ATOM)
            }
            SqlExpr::IsNull { expr, negated } => {
                self.operand(expr, precedence(expr) < ATOM)?;
                self.f.write_str(if *negated { " IS NOT NULL" } else { " IS NULL" })
            }
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                self.operand(expr, precedence(expr) < ATOM)?;
                self.f.write_str(if *negated { " NOT IN (" } else { " IN (" })?;
                self.list(list, Self::expr)?;
                self.f.write_char(')')
            }
            SqlExpr::Case {
                branches,
                else_result,
            } => {
                self.f.write_str("CASE")?;
                for (condition, result) in branches {
                    self.f.write_str(" WHEN ")?;
                    self.expr(condition)?;
                    self.f.write_str(" THEN ")?;
                    self.expr(result)?;
                }
                if let Some(else_result) = else_result {
                    self.f.write_str(" ELSE ")?;
                    self.expr(else_result)?;
                }
                self.f.write_str(" END")
            }
            SqlExpr::Cast { expr, data_type } => {
                self.f.write_str("CAST(")?;
                self.expr(expr)?;
                write!(self.f, " AS {})", self.type_name(*data_type))
            }
            SqlExpr::Function { function, args } => self.function(*function, args),
            SqlExpr::Aggregate {
                function,
                arg,
                distinct,
            } => self.aggregate(function, arg.as_deref(), *distinct),
            SqlExpr::Like {
                expr,
                pattern,
                negated,
            } => {
                self.operand(expr, precedence(expr) < ATOM)?;
                self.f
                    .write_str(if *negated { " NOT LIKE " } else { " LIKE " })?;
                self.operand(pattern, precedence(pattern) < ATOM)
            }
            SqlExpr::RegexMatch {
                expr,
                pattern,
                case_insensitive,
            } => self.regex_match(expr, pattern, *case_insensitive),
            SqlExpr::RegexReplace {
                expr,
                pattern,
                replacement,
                case_insensitive,
            } => self.regex_replace(expr, pattern, replacement, *case_insensitive),
            SqlExpr::Extract { field, expr } => self.extract(*field, expr),
            SqlExpr::Position { needle, haystack } => {
                if self.dialect == SqlDialect::MySql {
                    self.call("LOCATE", &[needle.as_ref(), haystack.as_ref()])
                } else {
                    self.f.write_str("POSITION(")?;
                    self.expr(needle)?;
                    self.f.write_str(" IN ")?;
                    self.expr(haystack)?;
                    self.f.write_char(')')
                }
            }
            SqlExpr::Substring {
                expr,
                start,
                length,
            } => {
                self.f.write_str("SUBSTRING(")?;
                self.expr(expr)?;
                self.f.write_str(" FROM ")?;
                self.expr(start)?;
                if let Some(length) = length {
                    self.f.write_str(" FOR ")?;
                    self.expr(length)?;
                }
                self.f.write_char(')')
            }
            SqlExpr::CurrentTimestamp => self.f.write_str("CURRENT_TIMESTAMP"),
            SqlExpr::Exists { query, negated } => {
                self.f
                    .write_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" })?;
                self.query(query)?;
                self.f.write_char(')')
            }
        }
    }

    fn operand(&mut self, expr: &SqlExpr, parenthesize: bool) -> Result {
        if parenthesize {
            self.f.write_char('(')?;
            self.expr(expr)?;
            self.f.write_char(')')
        } else {
            self.expr(expr)
        }
    }

    fn call(&mut self, name: &str, args: &[&SqlExpr]) -> Result {
        write!(self.f, "{name}(")?;
        self.list(args, |w, arg| w.expr(arg))?;
        self.f.write_char(')')
    }

    fn literal(&mut self, literal: &SqlLiteral) -> Result {
        match literal {
            SqlLiteral::Null => self.f.write_str("NULL"),
            SqlLiteral::Boolean(true) => self.f.write_str("TRUE"),
            SqlLiteral::Boolean(false) => self.f.write_str("FALSE"),
            SqlLiteral::Integer(value) => write!(self.f, "{value}"),
            SqlLiteral::Double(value) if value.is_finite() => write!(self.f, "{value:?}"),
            SqlLiteral::Double(value) => {
                let special = if value.is_nan() {
                    "NaN"
                } else if value.is_sign_positive() {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                write!(
                    self.f,
                    "CAST('{special}' AS {})",
                    self.type_name(SqlType::Double)
                )
            }
            SqlLiteral::String(value) => self.string(value),
            SqlLiteral::Timestamp(micros) => match format_sql_timestamp(*micros) {
                Some(value) => {
                    self.f.write_str("CAST(")?;
                    self.string(&value)?;
                    write!(self.f, " AS {})", self.type_name(SqlType::Timestamp))
                }
                None => self.f.write_str("NULL"),
            },
        }
    }

    fn string(&mut self, value: &str) -> Result {
        self.f.write_char('\'')?;
        for c in value.chars() {
            match c {
                '\'' => self.f.write_str("''")?,
                '\\' if self.dialect == SqlDialect::MySql => self.f.write_str("\\\\")?,
                c => self.f.write_char(c)?,
            }
        }
        self.f.write_char('\'')
    }

    fn type_name(&self, data_type: SqlType) -> &'static str {
        match (data_type, self.dialect) {
            (SqlType::BigInt, SqlDialect::MySql) => "SIGNED",
            (SqlType::BigInt, _) => "BIGINT",
            (SqlType::Double, SqlDialect::PostgreSql | SqlDialect::H2) => "DOUBLE PRECISION",
            (SqlType::Double, _) => "DOUBLE",
            (SqlType::Text, SqlDialect::MySql) => "CHAR",
            (SqlType::Text, SqlDialect::PostgreSql) => "TEXT",
            (SqlType::Text, _) => "VARCHAR",
            (SqlType::Timestamp, SqlDialect::MySql) => "DATETIME",
            (SqlType::Timestamp, _) => "TIMESTAMP",
        }
    }

    fn function(&mut self, function: SqlFunction, args: &[SqlExpr]) -> Result {
        let args = args.iter().collect_vec();
        match function {
            SqlFunction::CharLength => self.call("CHAR_LENGTH", &args),
            SqlFunction::Upper => self.call("UPPER", &args),
            SqlFunction::Lower => self.call("LOWER", &args),
            SqlFunction::Concat => self.call("CONCAT", &args),
            SqlFunction::Coalesce => self.call("COALESCE", &args),
            SqlFunction::NullIf => self.call("NULLIF", &args),
            SqlFunction::Abs => self.call("ABS", &args),
            SqlFunction::Ceil => self.call("CEIL", &args),
            SqlFunction::Floor => self.call("FLOOR", &args),
            SqlFunction::Round => self.call("ROUND", &args),
            SqlFunction::Random if self.dialect == SqlDialect::PostgreSql => {
                self.call("RANDOM", &[])
            }
            SqlFunction::Random => self.call("RAND", &[]),
            SqlFunction::Hash(HashAlgorithm::Md5) => self.call("MD5", &args),
            SqlFunction::Hash(algorithm) => self.sha(algorithm, &args),
        }
    }

    fn sha(&mut self, algorithm: HashAlgorithm, args: &[&SqlExpr]) -> Result {
        let (name, bits) = match algorithm {
            HashAlgorithm::Md5 => ("md5", 0),
            HashAlgorithm::Sha1 => ("sha1", 1),
            HashAlgorithm::Sha256 => ("sha256", 256),
            HashAlgorithm::Sha384 => ("sha384", 384),
            HashAlgorithm::Sha512 => ("sha512", 512),
        };
        if self.dialect == SqlDialect::MySql {
            return if bits == 1 {
                self.call("SHA1", args)
            } else {
                self.f.write_str("SHA2(")?;
                self.list(args, |w, arg| w.expr(arg))?;
                write!(self.f, ", {bits})")
            };
        }
        self.f.write_str("ENCODE(DIGEST(")?;
        self.list(args, |w, arg| w.expr(arg))?;
        write!(self.f, ", '{name}'), 'hex')")
    }

    fn aggregate(
        &mut self,
        function: &AggregateFunction,
        arg: Option<&SqlExpr>,
        distinct: bool,
    ) -> Result {
        let name = match function {
            AggregateFunction::CountStar => return self.f.write_str("COUNT(*)"),
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::GroupConcat { .. } => match self.dialect {
                SqlDialect::PostgreSql => "STRING_AGG",
                SqlDialect::MySql => "GROUP_CONCAT",
                SqlDialect::Baseline | SqlDialect::H2 => "LISTAGG",
            },
        };
        write!(self.f, "{name}(")?;
        if distinct {
            self.f.write_str("DISTINCT ")?;
        }
        match arg {
            Some(arg) => self.expr(arg)?,
            None => self.f.write_char('*')?,
        }
        if let AggregateFunction::GroupConcat { separator } = function {
            if self.dialect == SqlDialect::MySql {
                self.f.write_str(" SEPARATOR ")?;
            } else {
                self.f.write_str(", ")?;
            }
            self.string(separator)?;
        }
        self.f.write_char(')')
    }

    fn regex_match(&mut self, expr: &SqlExpr, pattern: &SqlExpr, insensitive: bool) -> Result {
        if self.dialect == SqlDialect::PostgreSql {
            self.operand(expr, precedence(expr) < ATOM)?;
            self.f.write_str(if insensitive { " ~* " } else { " ~ " })?;
            return self.operand(pattern, precedence(pattern) < ATOM);
        }
        self.f.write_str("REGEXP_LIKE(")?;
        self.expr(expr)?;
        self.f.write_str(", ")?;
        self.expr(pattern)?;
        if insensitive {
            self.f.write_str(", 'i'")?;
        }
        self.f.write_char(')')
    }

    fn regex_replace(
        &mut self,
        expr: &SqlExpr,
        pattern: &SqlExpr,
        replacement: &SqlExpr,
        insensitive: bool,
    ) -> Result {
        self.f.write_str("REGEXP_REPLACE(")?;
        self.list(&[expr, pattern, replacement], |w, arg| w.expr(arg))?;
        let flags = match (self.dialect, insensitive) {
            (SqlDialect::PostgreSql, false) => ", 'g'",
            (SqlDialect::PostgreSql, true) => ", 'gi'",
            (SqlDialect::MySql, true) => ", 1, 0, 'i'",
            (_, true) => ", 'i'",
            (_, false) => "",
        };
        self.f.write_str(flags)?;
        self.f.write_char(')')
    }

    fn extract(&mut self, field: DateField, expr: &SqlExpr) -> Result {
        let (keyword, mysql, postgres) = match field {
            DateField::Year => ("YEAR", "YEAR", "year"),
            DateField::Month => ("MONTH", "MONTH", "month"),
            DateField::Day => ("DAY", "DAYOFMONTH", "day"),
            DateField::Hour => ("HOUR", "HOUR", "hour"),
            DateField::Minute => ("MINUTE", "MINUTE", "minute"),
            DateField::Second => ("SECOND", "SECOND", "second"),
        };
        match self.dialect {
            SqlDialect::MySql => self.call(mysql, &[expr]),
            SqlDialect::PostgreSql if field == DateField::Second => {
                write!(self.f, "DATE_PART('{postgres}', ")?;
                self.expr(expr)?;
                self.f.write_char(')')
            }
            SqlDialect::PostgreSql => {
                write!(self.f, "CAST(DATE_PART('{postgres}', ")?;
                self.expr(expr)?;
                write!(self.f, ") AS {})", self.type_name(SqlType::BigInt))
            }
            SqlDialect::Baseline | SqlDialect::H2 => {
                write!(self.f, "EXTRACT({keyword} FROM ")?;
                self.expr(expr)?;
                self.f.write_char(')')
            }
        }
    }
}

const ATOM: u8 = 10;

fn precedence(expr: &SqlExpr) -> u8 {
    match expr {
        SqlExpr::BinaryOp { op, .. } => op.precedence(),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => 3,
        SqlExpr::IsNull { .. }
        | SqlExpr::InList { .. }
        | SqlExpr::Like { .. }
        | SqlExpr::RegexMatch { .. } => 4,
        SqlExpr::UnaryOp { .. } => 7,
        _ => ATOM,
    }
}

fn needs_parens(child: &SqlExpr, parent: BinaryOperator, is_right: bool) -> bool {
    let child_precedence = precedence(child);
    let parent_precedence = parent.precedence();
    if child_precedence != parent_precedence {
        return child_precedence < parent_precedence;
    }
    match child {
        SqlExpr::BinaryOp { op, .. } if *op == parent && parent.is_associative() => false,
        // Arithmetic is left associative.
        SqlExpr::BinaryOp { .. } => is_right || parent_precedence < 5,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Query, Select, SqlExpr};

    fn triples_select() -> Select {
        Select {
            projection: vec![SelectItem::aliased(
                SqlExpr::column("t1", "subject_id"),
                Ident::quoted("s"),
            )],
            from: Some(TableRef::table("triples", "t1")),
            selection: SqlExpr::conjunction([
                SqlExpr::column("t1", "deleted").eq(SqlExpr::boolean(false)),
                SqlExpr::column("t1", "predicate_id").eq(SqlExpr::integer(7)),
            ]),
            ..Select::default()
        }
    }

    #[test]
    fn render_simple_select() {
        let query = Query::select(triples_select());
        insta::assert_snapshot!(query.to_sql(SqlDialect::PostgreSql), @r#"SELECT t1.subject_id AS "s" FROM triples AS t1 WHERE t1.deleted = FALSE AND t1.predicate_id = 7"#);
        insta::assert_snapshot!(query.to_sql(SqlDialect::MySql), @"SELECT t1.subject_id AS `s` FROM triples AS t1 WHERE t1.deleted = FALSE AND t1.predicate_id = 7");
    }

    #[test]
    fn render_offset_without_limit() {
        let mut query = Query::select(triples_select());
        query.offset = Some(5);
        assert!(query
            .to_sql(SqlDialect::MySql)
            .ends_with(" LIMIT 18446744073709551615 OFFSET 5"));
        assert!(query.to_sql(SqlDialect::PostgreSql).ends_with("= 7 OFFSET 5"));
    }

    #[test]
    fn render_nested_left_join_in_parentheses() {
        let right = TableRef::table("triples", "t2").join(
            TableRef::table("nodes", "v1"),
            JoinKind::LeftOuter,
            Some(SqlExpr::column("v1", "id").eq(SqlExpr::column("t2", "object_id"))),
        );
        let from = TableRef::table("triples", "t1").join(
            right,
            JoinKind::LeftOuter,
            Some(SqlExpr::column("t2", "subject_id").eq(SqlExpr::column("t1", "subject_id"))),
        );
        let query = Query::select(Select {
            projection: vec![SelectItem::Wildcard],
            from: Some(from),
            ..Select::default()
        });
        insta::assert_snapshot!(query.to_sql(SqlDialect::Baseline), @"SELECT * FROM triples AS t1 LEFT OUTER JOIN (triples AS t2 LEFT OUTER JOIN nodes AS v1 ON v1.id = t2.object_id) ON t2.subject_id = t1.subject_id");
    }

    #[test]
    fn graft_keeps_chain_left_deep() {
        let left = TableRef::table("triples", "t1");
        let right = TableRef::table("triples", "t2").join(
            TableRef::table("nodes", "v1"),
            JoinKind::LeftOuter,
            Some(SqlExpr::column("v1", "id").eq(SqlExpr::column("t2", "object_id"))),
        );
        let query = Query::select(Select {
            projection: vec![SelectItem::Wildcard],
            from: Some(left.graft(right)),
            ..Select::default()
        });
        insta::assert_snapshot!(query.to_sql(SqlDialect::Baseline), @"SELECT * FROM triples AS t1 CROSS JOIN triples AS t2 LEFT OUTER JOIN nodes AS v1 ON v1.id = t2.object_id");
    }

    #[test]
    fn parenthesize_by_precedence() {
        let a = SqlExpr::column("t", "a");
        let b = SqlExpr::column("t", "b");
        let c = SqlExpr::column("t", "c");
        let expr = a.clone().or(b.clone()).and(c.clone());
        assert_eq!(expr.to_string(), "(t.a OR t.b) AND t.c");

        let expr = a
            .clone()
            .binary(BinaryOperator::Minus, b.clone().binary(BinaryOperator::Minus, c.clone()));
        assert_eq!(expr.to_string(), "t.a - (t.b - t.c)");

        let expr = a.eq(b).not();
        assert_eq!(expr.to_string(), "NOT (t.a = t.b)");

        let expr = c.is_null().or(SqlExpr::boolean(true));
        assert_eq!(expr.to_string(), "t.c IS NULL OR TRUE");
    }

    #[test]
    fn render_literals_per_dialect() {
        let expr = SqlExpr::string("it's a \\ test");
        assert_eq!(expr.to_sql(SqlDialect::PostgreSql), "'it''s a \\ test'");
        assert_eq!(expr.to_sql(SqlDialect::MySql), "'it''s a \\\\ test'");
        assert_eq!(SqlExpr::double(1.0).to_string(), "1.0");
        assert_eq!(
            SqlExpr::Literal(SqlLiteral::Timestamp(0)).to_sql(SqlDialect::MySql),
            "CAST('1970-01-01 00:00:00.000000' AS DATETIME)"
        );
    }

    #[test]
    fn render_vendor_functions() {
        let text = SqlExpr::column("v1", "content");
        let md5 = SqlExpr::function(SqlFunction::Hash(HashAlgorithm::Sha256), vec![text.clone()]);
        assert_eq!(md5.to_sql(SqlDialect::MySql), "SHA2(v1.content, 256)");
        assert_eq!(
            md5.to_sql(SqlDialect::PostgreSql),
            "ENCODE(DIGEST(v1.content, 'sha256'), 'hex')"
        );

        let year = SqlExpr::Extract {
            field: DateField::Year,
            expr: Box::new(SqlExpr::column("v1", "date_content")),
        };
        assert_eq!(year.to_sql(SqlDialect::MySql), "YEAR(v1.date_content)");
        assert_eq!(year.to_sql(SqlDialect::H2), "EXTRACT(YEAR FROM v1.date_content)");
        assert_eq!(
            year.to_sql(SqlDialect::PostgreSql),
            "CAST(DATE_PART('year', v1.date_content) AS BIGINT)"
        );

        let regex = SqlExpr::RegexMatch {
            expr: Box::new(text.clone()),
            pattern: Box::new(SqlExpr::string("^a.*b$")),
            case_insensitive: true,
        };
        assert_eq!(regex.to_sql(SqlDialect::PostgreSql), "v1.content ~* '^a.*b$'");
        assert_eq!(
            regex.to_sql(SqlDialect::MySql),
            "REGEXP_LIKE(v1.content, '^a.*b$', 'i')"
        );

        let concat = SqlExpr::Aggregate {
            function: AggregateFunction::GroupConcat {
                separator: ", ".to_owned(),
            },
            arg: Some(Box::new(text)),
            distinct: true,
        };
        assert_eq!(
            concat.to_sql(SqlDialect::MySql),
            "GROUP_CONCAT(DISTINCT v1.content SEPARATOR ', ')"
        );
        assert_eq!(
            concat.to_sql(SqlDialect::PostgreSql),
            "STRING_AGG(DISTINCT v1.content, ', ')"
        );
    }

    #[test]
    fn render_set_operation() {
        let union = Query {
            body: SetExpr::SetOperation {
                op: SetOperator::UnionAll,
                left: Box::new(SetExpr::Select(Box::new(triples_select()))),
                right: Box::new(SetExpr::Select(Box::new(triples_select()))),
            },
            order_by: Vec::new(),
            limit: None,
            offset: None,
        };
        let sql = union.to_sql(SqlDialect::Baseline);
        assert_eq!(sql.matches(" UNION ALL ").count(), 1);
        assert!(sql.starts_with("SELECT t1.subject_id"));
    }
}
