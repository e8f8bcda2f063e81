use rustc_hash::FxHashSet;
use triplesql_common::BlankNodeMatchingMode;
use triplesql_model::algebra::{
    AggregateExpression, Expression, GraphPattern, OrderExpression, TermPattern,
};
use triplesql_model::Term;

/// Collects the constants of a pattern whose node ids the compiled SQL may reference.
pub(crate) fn pattern_constants(pattern: &GraphPattern, mode: BlankNodeMatchingMode) -> Vec<Term> {
    let mut collector = ConstantCollector {
        mode,
        seen: FxHashSet::default(),
        constants: Vec::new(),
    };
    collector.pattern(pattern);
    collector.constants
}

struct ConstantCollector {
    mode: BlankNodeMatchingMode,
    seen: FxHashSet<Term>,
    constants: Vec<Term>,
}

impl ConstantCollector {
    fn add(&mut self, term: Term) {
        if self.seen.insert(term.clone()) {
            self.constants.push(term);
        }
    }

    fn term(&mut self, term: &TermPattern) {
        match term {
            TermPattern::NamedNode(node) => self.add(node.clone().into()),
            TermPattern::Literal(literal) => self.add(literal.clone().into()),
            TermPattern::BlankNode(node) if self.mode == BlankNodeMatchingMode::Constant => {
                self.add(node.clone().into());
            }
            TermPattern::BlankNode(_) | TermPattern::Variable(_) => {}
        }
    }

    fn pattern(&mut self, pattern: &GraphPattern) {
        match pattern {
            GraphPattern::Quad(quad) => {
                for (_, term) in quad.positions() {
                    self.term(term);
                }
            }
            GraphPattern::Path {
                subject, object, ..
            } => {
                self.term(subject);
                self.term(object);
            }
            GraphPattern::Join { left, right }
            | GraphPattern::Union { left, right }
            | GraphPattern::Intersection { left, right }
            | GraphPattern::Difference { left, right } => {
                self.pattern(left);
                self.pattern(right);
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                self.pattern(left);
                self.pattern(right);
                if let Some(expression) = expression {
                    self.expression(expression);
                }
            }
            GraphPattern::Filter { inner, expression }
            | GraphPattern::Extend {
                inner, expression, ..
            } => {
                self.pattern(inner);
                self.expression(expression);
            }
            GraphPattern::Group {
                inner, aggregates, ..
            } => {
                self.pattern(inner);
                for (_, aggregate) in aggregates {
                    if let AggregateExpression::FunctionCall { expr, .. } = aggregate {
                        self.expression(expr);
                    }
                }
            }
            GraphPattern::OrderBy { inner, expression } => {
                self.pattern(inner);
                for key in expression {
                    self.expression(OrderExpression::expression(key));
                }
            }
            GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. }
            | GraphPattern::Project { inner, .. }
            | GraphPattern::MultiProject { inner, .. }
            | GraphPattern::TaggedProject { inner, .. }
            | GraphPattern::Service { inner, .. } => self.pattern(inner),
            GraphPattern::Values { .. } | GraphPattern::EmptySet | GraphPattern::SingletonSet => {}
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::NamedNode(node) => self.add(node.clone().into()),
            Expression::Literal(literal) => self.add(literal.clone().into()),
            Expression::Variable(_) | Expression::Bound(_) => {}
            Expression::Or(left, right)
            | Expression::And(left, right)
            | Expression::Equal(left, right)
            | Expression::SameTerm(left, right)
            | Expression::Greater(left, right)
            | Expression::GreaterOrEqual(left, right)
            | Expression::Less(left, right)
            | Expression::LessOrEqual(left, right)
            | Expression::Add(left, right)
            | Expression::Subtract(left, right)
            | Expression::Multiply(left, right)
            | Expression::Divide(left, right) => {
                self.expression(left);
                self.expression(right);
            }
            Expression::Not(inner)
            | Expression::UnaryPlus(inner)
            | Expression::UnaryMinus(inner) => {
                self.expression(inner);
            }
            Expression::In(needle, list) => {
                self.expression(needle);
                for item in list {
                    self.expression(item);
                }
            }
            Expression::InPattern(needle, pattern) => {
                self.expression(needle);
                self.pattern(pattern);
            }
            Expression::Exists(pattern) => self.pattern(pattern),
            Expression::If(test, then, otherwise) => {
                self.expression(test);
                self.expression(then);
                self.expression(otherwise);
            }
            Expression::Coalesce(args) | Expression::FunctionCall(_, args) => {
                for arg in args {
                    self.expression(arg);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triplesql_model::algebra::QuadPattern;
    use triplesql_model::{BlankNode, Literal, NamedNode, Variable};

    #[test]
    fn constants_are_collected_once() {
        let p = NamedNode::new_unchecked("http://e/p");
        let s = Variable::new_unchecked("s");
        let o = Variable::new_unchecked("o");
        let b = BlankNode::new_unchecked("b");
        let pattern = GraphPattern::filter(
            GraphPattern::join(
                GraphPattern::quad(QuadPattern::new(s, p.clone(), Literal::from(1))),
                GraphPattern::quad(QuadPattern::new(b, p.clone(), o.clone())),
            ),
            Expression::equal(Expression::Variable(o), Expression::NamedNode(p.clone())),
        );
        let constants = pattern_constants(&pattern, BlankNodeMatchingMode::Variable);
        assert_eq!(constants, vec![p.into(), Literal::from(1).into()]);
    }

    #[test]
    fn blank_nodes_are_constants_only_in_constant_mode() {
        let b = BlankNode::new_unchecked("b");
        let pattern = GraphPattern::quad(QuadPattern::new(
            b.clone(),
            Variable::new_unchecked("p"),
            Variable::new_unchecked("o"),
        ));
        assert!(pattern_constants(&pattern, BlankNodeMatchingMode::Variable).is_empty());
        assert_eq!(
            pattern_constants(&pattern, BlankNodeMatchingMode::Constant),
            vec![b.into()]
        );
    }
}
