use std::collections::HashSet;
use triplesql_model::algebra::{AggregateExpression, Expression, GraphPattern, TermPattern};
use triplesql_model::Variable;

/// The variables a pattern can bind in its solutions, in order of first occurrence.
pub fn visible_variables(pattern: &GraphPattern) -> Vec<Variable> {
    let mut collector = Collector::default();
    collector.pattern(pattern);
    collector.variables
}

/// The variables an expression references, including the ones in nested patterns.
pub fn expression_variables(expression: &Expression) -> Vec<Variable> {
    let mut collector = Collector::default();
    expression.for_each_variable(&mut |v| collector.add(v));
    collector.variables
}

#[derive(Default)]
struct Collector {
    seen: HashSet<Variable>,
    variables: Vec<Variable>,
}

impl Collector {
    fn add(&mut self, variable: &Variable) {
        if self.seen.insert(variable.clone()) {
            self.variables.push(variable.clone());
        }
    }

    fn term(&mut self, term: &TermPattern) {
        if let TermPattern::Variable(v) = term {
            self.add(v);
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
            | GraphPattern::LeftJoin { left, right, .. }
            | GraphPattern::Union { left, right }
            | GraphPattern::Intersection { left, right } => {
                self.pattern(left);
                self.pattern(right);
            }
            GraphPattern::Difference { left, .. } => self.pattern(left),
            GraphPattern::Extend {
                inner, variable, ..
            } => {
                self.pattern(inner);
                self.add(variable);
            }
            GraphPattern::Group {
                variables,
                aggregates,
                ..
            } => {
                for v in variables {
                    self.add(v);
                }
                for (v, _) in aggregates {
                    self.add(v);
                }
            }
            GraphPattern::Project { variables, .. } | GraphPattern::Values { variables, .. } => {
                for v in variables {
                    self.add(v);
                }
            }
            GraphPattern::MultiProject { projections, .. } => {
                for elem in projections.iter().flatten() {
                    self.add(&elem.target);
                }
            }
            GraphPattern::TaggedProject { columns, .. } => {
                for column in columns {
                    self.add(&column.target);
                }
            }
            GraphPattern::Filter { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::OrderBy { inner, .. }
            | GraphPattern::Slice { inner, .. }
            | GraphPattern::Service { inner, .. } => self.pattern(inner),
            GraphPattern::EmptySet | GraphPattern::SingletonSet => {}
        }
    }
}

/// The variables referenced by the aggregate's argument.
pub fn aggregate_variables(aggregate: &AggregateExpression) -> Vec<Variable> {
    match aggregate {
        AggregateExpression::CountSolutions { .. } => Vec::new(),
        AggregateExpression::FunctionCall { expr, .. } => expression_variables(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triplesql_model::algebra::QuadPattern;
    use triplesql_model::NamedNode;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[test]
    fn difference_hides_right_variables() {
        let p = NamedNode::new_unchecked("http://example.com/p");
        let pattern = GraphPattern::difference(
            QuadPattern::new(var("s"), p.clone(), var("o")).into(),
            QuadPattern::new(var("s"), p, var("x")).into(),
        );
        assert_eq!(visible_variables(&pattern), vec![var("s"), var("o")]);
    }

    #[test]
    fn extend_adds_variable_after_inner() {
        let p = NamedNode::new_unchecked("http://example.com/p");
        let pattern = GraphPattern::extend(
            QuadPattern::new(var("s"), p, var("o")).into(),
            var("z"),
            Expression::Variable(var("o")),
        );
        assert_eq!(
            visible_variables(&pattern),
            vec![var("s"), var("o"), var("z")]
        );
    }
}
