use crate::algebra::{AggregateExpression, Expression, OrderExpression, PropertyPathExpression};
use oxrdf::{BlankNode, Literal, NamedNode, Term, TermRef, Variable};

/// A term position of a [`QuadPattern`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermPattern {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
    Variable(Variable),
}

impl TermPattern {
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the constant term of this position, if it is not a variable.
    pub fn as_term(&self) -> Option<TermRef<'_>> {
        match self {
            Self::NamedNode(n) => Some(n.as_ref().into()),
            Self::BlankNode(b) => Some(b.as_ref().into()),
            Self::Literal(l) => Some(l.as_ref().into()),
            Self::Variable(_) => None,
        }
    }
}

impl From<Variable> for TermPattern {
    fn from(value: Variable) -> Self {
        Self::Variable(value)
    }
}

impl From<NamedNode> for TermPattern {
    fn from(value: NamedNode) -> Self {
        Self::NamedNode(value)
    }
}

impl From<BlankNode> for TermPattern {
    fn from(value: BlankNode) -> Self {
        Self::BlankNode(value)
    }
}

impl From<Literal> for TermPattern {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<Term> for TermPattern {
    fn from(value: Term) -> Self {
        match value {
            Term::NamedNode(n) => n.into(),
            Term::BlankNode(b) => b.into(),
            Term::Literal(l) => l.into(),
            #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
            _ => Self::Literal(Literal::new_simple_literal("")),
        }
    }
}

/// The four positions of a stored quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuadPosition {
    Subject,
    Predicate,
    Object,
    Context,
}

/// A triple pattern with an optional context. A missing context matches every context.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuadPattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
    pub context: Option<TermPattern>,
}

impl QuadPattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn in_context(mut self, context: impl Into<TermPattern>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Iterates over the constrained positions in storage order.
    pub fn positions(&self) -> impl Iterator<Item = (QuadPosition, &TermPattern)> {
        [
            (QuadPosition::Subject, Some(&self.subject)),
            (QuadPosition::Predicate, Some(&self.predicate)),
            (QuadPosition::Object, Some(&self.object)),
            (QuadPosition::Context, self.context.as_ref()),
        ]
        .into_iter()
        .filter_map(|(position, term)| term.map(|term| (position, term)))
    }
}

/// Renames `source` to `target` in one row of a [`GraphPattern::MultiProject`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectionElem {
    pub source: Variable,
    pub target: Variable,
}

/// A column of a [`GraphPattern::TaggedProject`]. The branch is the index of the row the column
/// belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaggedColumn {
    pub branch: usize,
    pub source: Variable,
    pub target: Variable,
}

/// A graph pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphPattern {
    Quad(QuadPattern),
    Path {
        subject: TermPattern,
        path: PropertyPathExpression,
        object: TermPattern,
    },
    Join {
        left: Box<Self>,
        right: Box<Self>,
    },
    /// Keeps every solution of `left`, extended by the compatible solutions of `right` for which
    /// `expression` holds.
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        expression: Option<Expression>,
    },
    Filter {
        inner: Box<Self>,
        expression: Expression,
    },
    Extend {
        inner: Box<Self>,
        variable: Variable,
        expression: Expression,
    },
    Union {
        left: Box<Self>,
        right: Box<Self>,
    },
    Intersection {
        left: Box<Self>,
        right: Box<Self>,
    },
    Difference {
        left: Box<Self>,
        right: Box<Self>,
    },
    Group {
        inner: Box<Self>,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    },
    Distinct {
        inner: Box<Self>,
    },
    Reduced {
        inner: Box<Self>,
    },
    OrderBy {
        inner: Box<Self>,
        expression: Vec<OrderExpression>,
    },
    Slice {
        inner: Box<Self>,
        start: usize,
        length: Option<usize>,
    },
    Project {
        inner: Box<Self>,
        variables: Vec<Variable>,
    },
    /// Produces one output row per projection for every solution of `inner`.
    MultiProject {
        inner: Box<Self>,
        projections: Vec<Vec<ProjectionElem>>,
    },
    /// The flattened form of a [`GraphPattern::MultiProject`].
    TaggedProject {
        inner: Box<Self>,
        columns: Vec<TaggedColumn>,
    },
    Values {
        variables: Vec<Variable>,
        bindings: Vec<Vec<Option<Term>>>,
    },
    Service {
        name: TermPattern,
        inner: Box<Self>,
        silent: bool,
    },
    EmptySet,
    SingletonSet,
}

impl GraphPattern {
    pub fn quad(pattern: QuadPattern) -> Self {
        Self::Quad(pattern)
    }

    pub fn join(left: Self, right: Self) -> Self {
        Self::Join {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn left_join(left: Self, right: Self, expression: Option<Expression>) -> Self {
        Self::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            expression,
        }
    }

    pub fn filter(inner: Self, expression: Expression) -> Self {
        Self::Filter {
            inner: Box::new(inner),
            expression,
        }
    }

    pub fn extend(inner: Self, variable: Variable, expression: Expression) -> Self {
        Self::Extend {
            inner: Box::new(inner),
            variable,
            expression,
        }
    }

    pub fn union(left: Self, right: Self) -> Self {
        Self::Union {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn intersection(left: Self, right: Self) -> Self {
        Self::Intersection {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn difference(left: Self, right: Self) -> Self {
        Self::Difference {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn project(inner: Self, variables: Vec<Variable>) -> Self {
        Self::Project {
            inner: Box::new(inner),
            variables,
        }
    }

    pub fn distinct(inner: Self) -> Self {
        Self::Distinct {
            inner: Box::new(inner),
        }
    }

    pub fn order_by(inner: Self, expression: Vec<OrderExpression>) -> Self {
        Self::OrderBy {
            inner: Box::new(inner),
            expression,
        }
    }

    pub fn slice(inner: Self, start: usize, length: Option<usize>) -> Self {
        Self::Slice {
            inner: Box::new(inner),
            start,
            length,
        }
    }

    /// Whether this node is one of the binary set operators.
    pub fn is_set_operation(&self) -> bool {
        matches!(
            self,
            Self::Union { .. } | Self::Intersection { .. } | Self::Difference { .. }
        )
    }

    /// The name of the operator, used in diagnostics.
    pub fn operator_name(&self) -> &'static str {
        match self {
            Self::Quad(_) => "triple pattern",
            Self::Path { .. } => "property path",
            Self::Join { .. } => "join",
            Self::LeftJoin { .. } => "optional join",
            Self::Filter { .. } => "filter",
            Self::Extend { .. } => "extend",
            Self::Union { .. } => "union",
            Self::Intersection { .. } => "intersection",
            Self::Difference { .. } => "difference",
            Self::Group { .. } => "group",
            Self::Distinct { .. } => "distinct",
            Self::Reduced { .. } => "reduced",
            Self::OrderBy { .. } => "order by",
            Self::Slice { .. } => "slice",
            Self::Project { .. } => "projection",
            Self::MultiProject { .. } => "multi projection",
            Self::TaggedProject { .. } => "tagged projection",
            Self::Values { .. } => "inline data",
            Self::Service { .. } => "service call",
            Self::EmptySet => "empty set",
            Self::SingletonSet => "singleton set",
        }
    }

    /// Calls `callback` for every variable mentioned anywhere in this pattern.
    pub fn for_each_variable<'a>(&'a self, callback: &mut impl FnMut(&'a Variable)) {
        match self {
            Self::Quad(pattern) => {
                for (_, term) in pattern.positions() {
                    if let TermPattern::Variable(v) = term {
                        callback(v);
                    }
                }
            }
            Self::Path {
                subject, object, ..
            } => {
                for term in [subject, object] {
                    if let TermPattern::Variable(v) = term {
                        callback(v);
                    }
                }
            }
            Self::Join { left, right }
            | Self::Union { left, right }
            | Self::Intersection { left, right }
            | Self::Difference { left, right } => {
                left.for_each_variable(callback);
                right.for_each_variable(callback);
            }
            Self::LeftJoin {
                left,
                right,
                expression,
            } => {
                left.for_each_variable(callback);
                right.for_each_variable(callback);
                if let Some(expression) = expression {
                    expression.for_each_variable(callback);
                }
            }
            Self::Filter { inner, expression } => {
                inner.for_each_variable(callback);
                expression.for_each_variable(callback);
            }
            Self::Extend {
                inner,
                variable,
                expression,
            } => {
                inner.for_each_variable(callback);
                callback(variable);
                expression.for_each_variable(callback);
            }
            Self::Group {
                inner,
                variables,
                aggregates,
            } => {
                inner.for_each_variable(callback);
                variables.iter().for_each(&mut *callback);
                for (variable, aggregate) in aggregates {
                    callback(variable);
                    if let AggregateExpression::FunctionCall { expr, .. } = aggregate {
                        expr.for_each_variable(callback);
                    }
                }
            }
            Self::OrderBy { inner, expression } => {
                inner.for_each_variable(callback);
                for e in expression {
                    e.expression().for_each_variable(callback);
                }
            }
            Self::Project { inner, variables } => {
                inner.for_each_variable(callback);
                variables.iter().for_each(&mut *callback);
            }
            Self::MultiProject { inner, projections } => {
                inner.for_each_variable(callback);
                for elem in projections.iter().flatten() {
                    callback(&elem.target);
                }
            }
            Self::TaggedProject { inner, columns } => {
                inner.for_each_variable(callback);
                for column in columns {
                    callback(&column.target);
                }
            }
            Self::Distinct { inner }
            | Self::Reduced { inner }
            | Self::Slice { inner, .. }
            | Self::Service { inner, .. } => inner.for_each_variable(callback),
            Self::Values { variables, .. } => variables.iter().for_each(&mut *callback),
            Self::EmptySet | Self::SingletonSet => {}
        }
    }
}

impl From<QuadPattern> for GraphPattern {
    fn from(value: QuadPattern) -> Self {
        Self::Quad(value)
    }
}
