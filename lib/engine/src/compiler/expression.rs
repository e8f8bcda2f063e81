use crate::compiler::compilation::{constant_conditions, Compilation};
use crate::compiler::context::CompileContext;
use crate::compiler::fragment::JoinFragment;
use crate::compiler::scope::{Binding, NodeRef, ScopeKind};
use crate::compiler::types::{Scalar, Value, ValueType};
use triplesql_common::error::CompileError;
use triplesql_common::schema::NodeColumn;
use triplesql_common::{CastPolicy, CompileResult};
use triplesql_model::algebra::Expression;
use triplesql_model::vocab::xsd;
use triplesql_model::{
    is_date_datatype, is_floating_datatype, is_integer_datatype, parse_timestamp, NodeKind, Term,
};
use triplesql_sql::{
    BinaryOperator, Query, SelectItem, SqlExpr, SqlFunction, SqlLiteral, SqlType, UnaryOperator,
};

/// A comparison between two values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Comparison {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    SameTerm,
}

impl Comparison {
    fn operator(self) -> BinaryOperator {
        match self {
            Self::Eq | Self::SameTerm => BinaryOperator::Eq,
            Self::NotEq => BinaryOperator::NotEq,
            Self::Lt => BinaryOperator::Lt,
            Self::LtEq => BinaryOperator::LtEq,
            Self::Gt => BinaryOperator::Gt,
            Self::GtEq => BinaryOperator::GtEq,
        }
    }

    /// The comparison with swapped operands.
    fn flip(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            other => other,
        }
    }

    fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }
}

impl Compilation<'_> {
    pub(crate) fn compile_condition(
        &mut self,
        expression: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let value = self.compile_value(expression, fragment)?;
        self.as_condition(value, fragment)
    }

    pub(crate) fn compile_value(
        &mut self,
        expression: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        Ok(match expression {
            Expression::NamedNode(node) => Value::Term(node.clone().into()),
            Expression::Literal(literal) => Value::Term(literal.clone().into()),
            Expression::Variable(variable) => match self.scope.resolve(variable) {
                Some(Binding::Node(node)) => Value::Node(node.clone()),
                Some(Binding::Extension(scalar)) => Value::Scalar(scalar.clone()),
                None => Value::Scalar(Scalar::new(SqlExpr::null(), ValueType::String)),
            },
            Expression::Or(left, right) => {
                let left = self.connective_operand("OR", left, fragment)?;
                let right = self.connective_operand("OR", right, fragment)?;
                Value::Condition(left.or(right))
            }
            Expression::And(left, right) => {
                let left = self.connective_operand("AND", left, fragment)?;
                let right = self.connective_operand("AND", right, fragment)?;
                Value::Condition(left.and(right))
            }
            Expression::Not(inner) => match inner.as_ref() {
                Expression::Equal(left, right) => {
                    self.comparison(Comparison::NotEq, left, right, fragment)?
                }
                inner => Value::Condition(match self.connective_operand("NOT", inner, fragment)? {
                    SqlExpr::Exists { query, negated } => SqlExpr::Exists {
                        query,
                        negated: !negated,
                    },
                    condition => condition.not(),
                }),
            },
            Expression::Equal(left, right) => {
                self.comparison(Comparison::Eq, left, right, fragment)?
            }
            Expression::SameTerm(left, right) => {
                self.comparison(Comparison::SameTerm, left, right, fragment)?
            }
            Expression::Greater(left, right) => {
                self.comparison(Comparison::Gt, left, right, fragment)?
            }
            Expression::GreaterOrEqual(left, right) => {
                self.comparison(Comparison::GtEq, left, right, fragment)?
            }
            Expression::Less(left, right) => {
                self.comparison(Comparison::Lt, left, right, fragment)?
            }
            Expression::LessOrEqual(left, right) => {
                self.comparison(Comparison::LtEq, left, right, fragment)?
            }
            Expression::In(needle, list) => {
                let needle = self.compile_value(needle, fragment)?;
                let mut alternatives = Vec::with_capacity(list.len());
                for item in list {
                    let item = self.compile_value(item, fragment)?;
                    alternatives.push(self.compare_values(
                        Comparison::Eq,
                        needle.clone(),
                        item,
                        fragment,
                    )?);
                }
                Value::Condition(SqlExpr::disjunction(alternatives))
            }
            Expression::InPattern(..) => return CompileError::unsupported("IN with a sub-query"),
            Expression::Add(left, right) => {
                self.arithmetic(BinaryOperator::Plus, left, right, fragment)?
            }
            Expression::Subtract(left, right) => {
                self.arithmetic(BinaryOperator::Minus, left, right, fragment)?
            }
            Expression::Multiply(left, right) => {
                self.arithmetic(BinaryOperator::Multiply, left, right, fragment)?
            }
            Expression::Divide(left, right) => {
                self.arithmetic(BinaryOperator::Divide, left, right, fragment)?
            }
            Expression::UnaryPlus(inner) => {
                let inner = self.compile_value(inner, fragment)?;
                let inner = self.typed_scalar(inner, ValueType::Double, fragment)?;
                Value::Scalar(Scalar::new(inner, ValueType::Double))
            }
            Expression::UnaryMinus(inner) => {
                let inner = self.compile_value(inner, fragment)?;
                let inner = self.typed_scalar(inner, ValueType::Double, fragment)?;
                let negated = SqlExpr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: Box::new(inner),
                };
                Value::Scalar(Scalar::new(negated, ValueType::Double))
            }
            Expression::Exists(pattern) => {
                let mut sub = self.enter_scope(ScopeKind::Correlated);
                let inner = sub.compile_pattern(pattern, &CompileContext::unrestricted())?;
                let select = inner.into_select(vec![SelectItem::Expr {
                    expr: SqlExpr::integer(1),
                    alias: None,
                }]);
                Value::Condition(SqlExpr::Exists {
                    query: Box::new(Query::select(select)),
                    negated: false,
                })
            }
            Expression::Bound(variable) => Value::Condition(match self.scope.resolve(variable) {
                Some(Binding::Node(node)) => node.id.clone().is_not_null(),
                Some(Binding::Extension(scalar)) => scalar.expr.clone().is_not_null(),
                None => SqlExpr::boolean(false),
            }),
            Expression::If(test, then, otherwise) => {
                let test = self.compile_condition(test, fragment)?;
                let then = self.compile_value(then, fragment)?;
                let otherwise = self.compile_value(otherwise, fragment)?;
                self.conditional(test, then, otherwise, fragment)?
            }
            Expression::Coalesce(args) => self.coalesce(args, fragment)?,
            Expression::FunctionCall(function, args) => {
                self.compile_function(function, args, fragment)?
            }
        })
    }

    /// An operand of `AND`, `OR` or `NOT`. Only boolean values are accepted, nodes included.
    fn connective_operand(
        &mut self,
        connective: &str,
        expression: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let value = self.compile_value(expression, fragment)?;
        match value_type(&value) {
            Some(ValueType::Boolean) => self.as_condition(value, fragment),
            Some(_) if matches!(&value, Value::Scalar(scalar) if is_null(&scalar.expr)) => {
                Ok(SqlExpr::null())
            }
            Some(ty) => CompileError::type_contract(format!(
                "{connective} is applied to a value of type {ty}"
            )),
            None => CompileError::type_contract(format!(
                "{connective} is applied to a node, which is not known to be a boolean"
            )),
        }
    }

    /// Turns a value into a predicate. Nodes are true if they are the boolean literal `true`.
    pub(crate) fn as_condition(
        &mut self,
        value: Value,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        match value {
            Value::Condition(condition) => Ok(condition),
            Value::Node(node) => Ok(self.coerce_node(&node, ValueType::Boolean, fragment)),
            Value::Term(term) => self.convert_scalar(term_scalar(&term), ValueType::Boolean),
            Value::Scalar(scalar) => self.convert_scalar(scalar, ValueType::Boolean),
        }
    }

    /// Converts a value into an expression of the given type.
    pub(crate) fn typed_scalar(
        &mut self,
        value: Value,
        ty: ValueType,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        match value {
            Value::Node(node) => Ok(self.coerce_node(&node, ty, fragment)),
            Value::Term(term) => self.convert_scalar(term_scalar(&term), ty),
            Value::Scalar(scalar) => self.convert_scalar(scalar, ty),
            Value::Condition(condition) => {
                self.convert_scalar(Scalar::new(condition, ValueType::Boolean), ty)
            }
        }
    }

    /// The lexical form of a value, as returned by `STR`.
    pub(crate) fn lexical_form(&mut self, value: Value, fragment: &mut JoinFragment) -> SqlExpr {
        match value {
            Value::Node(node) => self.node_column(&node, NodeColumn::Content, fragment),
            Value::Term(term) => SqlExpr::string(lexical(&term)),
            Value::Scalar(scalar) => match scalar.ty {
                ValueType::Uri | ValueType::String => scalar.expr,
                ValueType::Boolean => boolean_to_string(scalar.expr),
                _ => scalar.expr.cast(SqlType::Text),
            },
            Value::Condition(condition) => boolean_to_string(condition),
        }
    }

    /// Reads a node as a value of the given type, following the cast policy.
    pub(crate) fn coerce_node(
        &mut self,
        node: &NodeRef,
        ty: ValueType,
        fragment: &mut JoinFragment,
    ) -> SqlExpr {
        let alias = self.node_alias(node, fragment);
        let column = |column: NodeColumn| SqlExpr::column(&alias, column.name());
        let kind_is = |kind: NodeKind| column(NodeColumn::Kind).eq(SqlExpr::string(kind.as_str()));
        let policy = self.options.cast_policy;
        match ty {
            ValueType::Integer | ValueType::Double => {
                let (own_kind, own, other_kind, other) = if ty == ValueType::Integer {
                    (
                        NodeKind::Integer,
                        NodeColumn::IntContent,
                        NodeKind::Double,
                        NodeColumn::DoubleContent,
                    )
                } else {
                    (
                        NodeKind::Double,
                        NodeColumn::DoubleContent,
                        NodeKind::Integer,
                        NodeColumn::IntContent,
                    )
                };
                let converted = column(other).cast(ty.sql_type());
                match policy {
                    CastPolicy::Strict => SqlExpr::case(
                        vec![(kind_is(own_kind), column(own)), (kind_is(other_kind), converted)],
                        None,
                    ),
                    CastPolicy::Loose => {
                        SqlExpr::function(SqlFunction::Coalesce, vec![column(own), converted])
                    }
                    CastPolicy::None => column(own),
                }
            }
            ValueType::Boolean => {
                let is_true = SqlExpr::InList {
                    expr: Box::new(column(NodeColumn::Content)),
                    list: vec![SqlExpr::string("true"), SqlExpr::string("1")],
                    negated: false,
                };
                match policy {
                    CastPolicy::Strict => SqlExpr::case(
                        vec![(
                            column(NodeColumn::Datatype).eq(SqlExpr::string(xsd::BOOLEAN.as_str())),
                            is_true,
                        )],
                        Some(SqlExpr::boolean(false)),
                    ),
                    CastPolicy::Loose | CastPolicy::None => is_true,
                }
            }
            ValueType::String | ValueType::Uri | ValueType::Date => {
                let (kind, content) = match ty {
                    ValueType::Uri => (NodeKind::Uri, NodeColumn::Uri),
                    ValueType::Date => (NodeKind::Date, NodeColumn::DateContent),
                    _ => (NodeKind::String, NodeColumn::Content),
                };
                match policy {
                    CastPolicy::Strict => {
                        SqlExpr::case(vec![(kind_is(kind), column(content))], None)
                    }
                    CastPolicy::Loose | CastPolicy::None => column(content),
                }
            }
        }
    }

    /// Converts a typed scalar into another type.
    pub(crate) fn convert_scalar(&self, scalar: Scalar, ty: ValueType) -> CompileResult<SqlExpr> {
        if scalar.ty == ty || matches!(scalar.expr, SqlExpr::Literal(SqlLiteral::Null)) {
            return Ok(scalar.expr);
        }
        match (scalar.ty, ty) {
            (ValueType::Uri, ValueType::String) | (ValueType::String, ValueType::Uri) => {
                Ok(scalar.expr)
            }
            (ValueType::Integer, ValueType::Double) | (ValueType::Double, ValueType::Integer) => {
                Ok(scalar.expr.cast(ty.sql_type()))
            }
            (ValueType::Boolean, ValueType::String) => Ok(boolean_to_string(scalar.expr)),
            (_, ValueType::String) => Ok(scalar.expr.cast(SqlType::Text)),
            (ValueType::String, ValueType::Integer | ValueType::Double | ValueType::Date) => {
                match self.options.cast_policy {
                    CastPolicy::None => Ok(scalar.expr),
                    CastPolicy::Strict | CastPolicy::Loose => Ok(scalar.expr.cast(ty.sql_type())),
                }
            }
            (from, to) => CompileError::type_contract(format!(
                "a value of type {from} is used where a value of type {to} is required"
            )),
        }
    }

    fn comparison(
        &mut self,
        comparison: Comparison,
        left: &Expression,
        right: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let left = self.compile_value(left, fragment)?;
        let right = self.compile_value(right, fragment)?;
        self.compare_values(comparison, left, right, fragment)
            .map(Value::Condition)
    }

    pub(crate) fn compare_values(
        &mut self,
        comparison: Comparison,
        left: Value,
        right: Value,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        match (left, right) {
            (Value::Node(left), Value::Node(right)) => {
                Ok(self.compare_nodes(comparison, &left, &right, fragment))
            }
            (Value::Node(node), Value::Term(term)) => {
                self.compare_node_term(comparison, &node, &term, fragment)
            }
            (Value::Term(term), Value::Node(node)) => {
                self.compare_node_term(comparison.flip(), &node, &term, fragment)
            }
            (Value::Node(node), other) => {
                let scalar = value_scalar(other);
                self.compare_node_scalar(comparison, &node, scalar, fragment)
            }
            (other, Value::Node(node)) => {
                let scalar = value_scalar(other);
                self.compare_node_scalar(comparison.flip(), &node, scalar, fragment)
            }
            (left, right) => {
                self.compare_scalars(comparison, value_scalar(left), value_scalar(right))
            }
        }
    }

    /// Compares two nodes. Both nodes must have the same kind, otherwise the comparison is false.
    fn compare_nodes(
        &mut self,
        comparison: Comparison,
        left: &NodeRef,
        right: &NodeRef,
        fragment: &mut JoinFragment,
    ) -> SqlExpr {
        match comparison {
            Comparison::SameTerm => return left.id.clone().eq(right.id.clone()),
            Comparison::NotEq => {
                let equal = self.compare_nodes(Comparison::Eq, left, right, fragment);
                return left
                    .id
                    .clone()
                    .is_not_null()
                    .and(right.id.clone().is_not_null())
                    .and(equal.not());
            }
            _ => {}
        }

        let left_alias = self.node_alias(left, fragment);
        let right_alias = self.node_alias(right, fragment);
        let kinds_are = |kind: NodeKind| {
            let kind = SqlExpr::string(kind.as_str());
            SqlExpr::column(&left_alias, NodeColumn::Kind.name())
                .eq(kind.clone())
                .and(SqlExpr::column(&right_alias, NodeColumn::Kind.name()).eq(kind))
        };
        let compare = |column: NodeColumn| {
            SqlExpr::column(&left_alias, column.name()).binary(
                comparison.operator(),
                SqlExpr::column(&right_alias, column.name()),
            )
        };

        let mut branches = vec![
            (kinds_are(NodeKind::Integer), compare(NodeColumn::IntContent)),
            (kinds_are(NodeKind::Double), compare(NodeColumn::DoubleContent)),
            (kinds_are(NodeKind::Date), compare(NodeColumn::DateContent)),
        ];
        if comparison.is_ordering() {
            branches.push((kinds_are(NodeKind::String), compare(NodeColumn::Content)));
        } else {
            for kind in [NodeKind::String, NodeKind::Uri, NodeKind::BlankNode] {
                branches.push((kinds_are(kind), compare(NodeColumn::Id)));
            }
        }
        SqlExpr::case(branches, Some(SqlExpr::boolean(false)))
    }

    fn compare_node_term(
        &mut self,
        comparison: Comparison,
        node: &NodeRef,
        term: &Term,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        let by_identity = match term {
            Term::NamedNode(_) | Term::BlankNode(_) => !comparison.is_ordering(),
            Term::Literal(literal) => {
                comparison == Comparison::SameTerm
                    || (literal.language().is_some() && !comparison.is_ordering())
            }
            #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
            _ => true,
        };
        if !by_identity {
            return self.compare_node_scalar(comparison, node, term_scalar(term), fragment);
        }

        let equal = match self.preloaded_id(term.as_ref()) {
            Some(Some(id)) => node.id.clone().eq(SqlExpr::integer(id.as_i64())),
            Some(None) => SqlExpr::boolean(false),
            None => {
                let alias = self.node_alias(node, fragment);
                SqlExpr::conjunction(constant_conditions(&alias, term.as_ref()))
                    .unwrap_or_else(|| SqlExpr::boolean(true))
            }
        };
        Ok(match comparison {
            Comparison::NotEq => node.id.clone().is_not_null().and(equal.not()),
            _ => equal,
        })
    }

    fn compare_node_scalar(
        &mut self,
        comparison: Comparison,
        node: &NodeRef,
        scalar: Scalar,
        fragment: &mut JoinFragment,
    ) -> CompileResult<SqlExpr> {
        if matches!(scalar.expr, SqlExpr::Literal(SqlLiteral::Null)) {
            return Ok(SqlExpr::null());
        }
        let ty = match (scalar.ty, self.options.cast_policy) {
            (ValueType::Integer, CastPolicy::Strict | CastPolicy::Loose) => ValueType::Double,
            (ty, _) => ty,
        };
        let coerced = Scalar::new(self.coerce_node(node, ty, fragment), ty);
        self.compare_scalars(comparison, coerced, scalar)
    }

    fn compare_scalars(
        &self,
        comparison: Comparison,
        left: Scalar,
        right: Scalar,
    ) -> CompileResult<SqlExpr> {
        let ty = match (left.ty, right.ty) {
            (l, r) if l == r => l,
            (l, r) if l.is_numeric() && r.is_numeric() => ValueType::Double,
            (ValueType::Uri | ValueType::String, ValueType::Uri | ValueType::String) => {
                ValueType::String
            }
            _ if is_null(&left.expr) || is_null(&right.expr) => return Ok(SqlExpr::null()),
            _ => return Ok(SqlExpr::boolean(false)),
        };
        let left = self.convert_scalar(left, ty)?;
        let right = self.convert_scalar(right, ty)?;
        Ok(left.binary(comparison.operator(), right))
    }

    fn arithmetic(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let left = self.compile_value(left, fragment)?;
        let left = self.typed_scalar(left, ValueType::Double, fragment)?;
        let right = self.compile_value(right, fragment)?;
        let mut right = self.typed_scalar(right, ValueType::Double, fragment)?;
        if operator == BinaryOperator::Divide {
            right = SqlExpr::function(SqlFunction::NullIf, vec![right, SqlExpr::double(0.0)]);
        }
        Ok(Value::Scalar(Scalar::new(
            left.binary(operator, right),
            ValueType::Double,
        )))
    }

    fn conditional(
        &mut self,
        test: SqlExpr,
        then: Value,
        otherwise: Value,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        if let (Value::Node(then), Value::Node(otherwise)) = (&then, &otherwise) {
            let id = SqlExpr::case(vec![(test, then.id.clone())], Some(otherwise.id.clone()));
            return Ok(Value::Node(NodeRef::new(id, self.current_frame())));
        }
        let ty = common_type(value_type(&then), value_type(&otherwise));
        let then = self.typed_scalar(then, ty, fragment)?;
        let otherwise = self.typed_scalar(otherwise, ty, fragment)?;
        Ok(Value::Scalar(Scalar::new(
            SqlExpr::case(vec![(test, then)], Some(otherwise)),
            ty,
        )))
    }

    /// `COALESCE` over nodes only, or over values of one type.
    fn coalesce(
        &mut self,
        args: &[Expression],
        fragment: &mut JoinFragment,
    ) -> CompileResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.compile_value(arg, fragment)?);
        }
        if values.is_empty() {
            return Ok(Value::Scalar(Scalar::new(SqlExpr::null(), ValueType::String)));
        }

        if values.iter().all(|v| matches!(v, Value::Node(_))) {
            let ids = values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Node(node) => Some(node.id),
                    _ => None,
                })
                .collect();
            let id = SqlExpr::function(SqlFunction::Coalesce, ids);
            return Ok(Value::Node(NodeRef::new(id, self.current_frame())));
        }

        let mut ty = None;
        for value in &values {
            match (value_type(value), ty) {
                (None, _) => return CompileError::unsupported("COALESCE over nodes and values"),
                (Some(value_ty), Some(ty)) if value_ty != ty => {
                    return CompileError::unsupported("COALESCE over values of different types")
                }
                (Some(value_ty), _) => ty = Some(value_ty),
            }
        }
        let ty = ty.unwrap_or(ValueType::String);
        let mut exprs = Vec::with_capacity(values.len());
        for value in values {
            exprs.push(self.typed_scalar(value, ty, fragment)?);
        }
        Ok(Value::Scalar(Scalar::new(
            SqlExpr::function(SqlFunction::Coalesce, exprs),
            ty,
        )))
    }

    /// The ORDER BY expressions for a sort key.
    pub(crate) fn sort_exprs(
        &mut self,
        expression: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<Vec<SqlExpr>> {
        Ok(match self.compile_value(expression, fragment)? {
            Value::Node(node) => self.node_sort_exprs(&node, fragment).to_vec(),
            Value::Term(term) => vec![term_scalar(&term).expr],
            Value::Scalar(scalar) => vec![scalar.expr],
            Value::Condition(condition) => vec![condition],
        })
    }

    /// Sort expressions with a fixed layout (number, date, lexical form), so that the branches
    /// of a set operation produce compatible sort columns.
    pub(crate) fn aligned_sort_exprs(
        &mut self,
        expression: &Expression,
        fragment: &mut JoinFragment,
    ) -> CompileResult<[SqlExpr; 3]> {
        let value = self.compile_value(expression, fragment)?;
        if let Value::Node(node) = &value {
            return Ok(self.node_sort_exprs(node, fragment));
        }
        Ok(match value_type(&value) {
            Some(ty) if ty.is_numeric() => [
                self.typed_scalar(value, ValueType::Double, fragment)?,
                SqlExpr::null(),
                SqlExpr::null(),
            ],
            Some(ValueType::Date) => [
                SqlExpr::null(),
                self.typed_scalar(value, ValueType::Date, fragment)?,
                SqlExpr::null(),
            ],
            _ => [
                SqlExpr::null(),
                SqlExpr::null(),
                self.lexical_form(value, fragment),
            ],
        })
    }

    /// The number, date and lexical form of a node. At most one of the first two is set.
    pub(crate) fn node_sort_exprs(
        &mut self,
        node: &NodeRef,
        fragment: &mut JoinFragment,
    ) -> [SqlExpr; 3] {
        let alias = self.node_alias(node, fragment);
        let column = |column: NodeColumn| SqlExpr::column(&alias, column.name());
        let number = SqlExpr::function(
            SqlFunction::Coalesce,
            vec![
                column(NodeColumn::DoubleContent),
                column(NodeColumn::IntContent).cast(SqlType::Double),
            ],
        );
        [
            number,
            column(NodeColumn::DateContent),
            column(NodeColumn::Content),
        ]
    }
}

/// The typed SQL form of a constant term.
pub(crate) fn term_scalar(term: &Term) -> Scalar {
    match term {
        Term::NamedNode(node) => Scalar::new(SqlExpr::string(node.as_str()), ValueType::Uri),
        Term::BlankNode(node) => Scalar::new(SqlExpr::string(node.as_str()), ValueType::String),
        Term::Literal(literal) => {
            let value = literal.value();
            let datatype = literal.datatype();
            if is_integer_datatype(datatype) {
                if let Ok(value) = value.trim().parse::<i64>() {
                    return Scalar::new(SqlExpr::integer(value), ValueType::Integer);
                }
            } else if is_floating_datatype(datatype) {
                if let Ok(value) = value.trim().parse::<f64>() {
                    return Scalar::new(SqlExpr::double(value), ValueType::Double);
                }
            } else if is_date_datatype(datatype) {
                if let Ok(value) = parse_timestamp(value) {
                    return Scalar::new(
                        SqlExpr::Literal(SqlLiteral::Timestamp(value)),
                        ValueType::Date,
                    );
                }
            } else if datatype == xsd::BOOLEAN {
                return Scalar::new(
                    SqlExpr::boolean(matches!(value, "true" | "1")),
                    ValueType::Boolean,
                );
            }
            Scalar::new(SqlExpr::string(value), ValueType::String)
        }
        #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
        _ => Scalar::new(SqlExpr::null(), ValueType::String),
    }
}

/// The type of a value, `None` for nodes.
pub(crate) fn value_type(value: &Value) -> Option<ValueType> {
    match value {
        Value::Node(_) => None,
        Value::Term(term) => Some(term_scalar(term).ty),
        Value::Scalar(scalar) => Some(scalar.ty),
        Value::Condition(_) => Some(ValueType::Boolean),
    }
}

fn common_type(left: Option<ValueType>, right: Option<ValueType>) -> ValueType {
    match (left, right) {
        (Some(l), Some(r)) if l == r => l,
        (Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => ValueType::Double,
        (Some(ty), None) | (None, Some(ty)) => ty,
        _ => ValueType::String,
    }
}

/// A value that is not a node as a scalar.
fn value_scalar(value: Value) -> Scalar {
    match value {
        Value::Term(term) => term_scalar(&term),
        Value::Scalar(scalar) => scalar,
        Value::Condition(condition) => Scalar::new(condition, ValueType::Boolean),
        Value::Node(node) => Scalar::new(node.id, ValueType::Integer),
    }
}

fn lexical(term: &Term) -> &str {
    match term {
        Term::NamedNode(node) => node.as_str(),
        Term::BlankNode(node) => node.as_str(),
        Term::Literal(literal) => literal.value(),
        #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
        _ => "",
    }
}

fn boolean_to_string(condition: SqlExpr) -> SqlExpr {
    SqlExpr::case(
        vec![(condition, SqlExpr::string("true"))],
        Some(SqlExpr::string("false")),
    )
}

fn is_null(expr: &SqlExpr) -> bool {
    matches!(expr, SqlExpr::Literal(SqlLiteral::Null))
}
