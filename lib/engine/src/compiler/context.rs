use rustc_hash::FxHashSet;
use std::rc::Rc;
use triplesql_model::algebra::OrderExpression;
use triplesql_model::Variable;

/// What the enclosing operators need from the pattern that is compiled.
///
/// Set operations use it to decide which columns their branches export and which sort
/// columns they carry.
#[derive(Clone, Debug, Default)]
pub(crate) struct CompileContext {
    /// `None` if every variable may be needed.
    required: Option<Rc<FxHashSet<Variable>>>,
    order: Option<Rc<[OrderExpression]>>,
}

impl CompileContext {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn requiring<'a>(variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        Self {
            required: Some(Rc::new(variables.into_iter().cloned().collect())),
            order: None,
        }
    }

    pub fn is_required(&self, variable: &Variable) -> bool {
        self.required
            .as_ref()
            .is_none_or(|required| required.contains(variable))
    }

    /// Adds variables referenced by an operator between the enclosing ones and the pattern.
    #[must_use]
    pub fn with_required<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        let required = self.required.as_ref().map(|required| {
            let mut required = FxHashSet::clone(required);
            required.extend(variables.into_iter().cloned());
            Rc::new(required)
        });
        Self {
            required,
            order: self.order.clone(),
        }
    }

    #[must_use]
    pub fn with_order(&self, order: &[OrderExpression]) -> Self {
        Self {
            required: self.required.clone(),
            order: Some(order.into()),
        }
    }

    #[must_use]
    pub fn without_order(&self) -> Self {
        Self {
            required: self.required.clone(),
            order: None,
        }
    }

    pub fn order(&self) -> Option<&[OrderExpression]> {
        self.order.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_requires_everything() {
        let context = CompileContext::unrestricted();
        assert!(context.is_required(&Variable::new_unchecked("x")));
    }

    #[test]
    fn additional_variables_extend_a_restriction() {
        let x = Variable::new_unchecked("x");
        let y = Variable::new_unchecked("y");
        let context = CompileContext::requiring([&x]);
        assert!(!context.is_required(&y));
        assert!(context.with_required([&y]).is_required(&y));
        assert!(context.is_required(&x));
    }
}
