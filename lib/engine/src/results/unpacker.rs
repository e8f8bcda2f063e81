use crate::compiler::{ColumnKind, CompiledQuery, OutputColumn, ValueType};
use sparesults::QuerySolution;
use std::sync::Arc;
use triplesql_common::error::ExecutionError;
use triplesql_common::{NodeLoader, SqlRow, SqlValue};
use triplesql_model::vocab::xsd;
use triplesql_model::{format_timestamp, Iri, Literal, NamedNode, Term, Variable};

/// Turns the rows of a [`CompiledQuery`] back into solutions.
///
/// A row of a multi-branch statement holds one solution per branch. Branches are read in order
/// until the first one without any bound value.
#[derive(Clone)]
pub struct RowUnpacker {
    query: Arc<CompiledQuery>,
    loader: Arc<dyn NodeLoader>,
    variables: Arc<[Variable]>,
    /// The columns of each branch. Single-branch statements have one entry.
    branches: Vec<Vec<(usize, OutputColumn)>>,
}

impl RowUnpacker {
    pub fn new(query: Arc<CompiledQuery>, loader: Arc<dyn NodeLoader>) -> Self {
        let variables: Arc<[Variable]> = query.variables().into();
        let branch_count = query
            .columns()
            .iter()
            .filter_map(|column| column.branch)
            .max()
            .map_or(1, |max| max + 1);
        let mut branches = vec![Vec::new(); branch_count];
        for column in query.columns() {
            let Some(idx) = variables.iter().position(|v| *v == column.variable) else {
                continue;
            };
            if let Some(branch) = branches.get_mut(column.branch.unwrap_or_default()) {
                branch.push((idx, column.clone()));
            }
        }
        Self {
            query,
            loader,
            variables,
            branches,
        }
    }

    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }

    /// The variables of the produced solutions.
    pub fn variables(&self) -> &Arc<[Variable]> {
        &self.variables
    }

    pub fn unpack(&self, row: &SqlRow) -> Result<Vec<QuerySolution>, ExecutionError> {
        if !self.query.is_multi_branch() {
            let columns = self.branches.first().map(Vec::as_slice).unwrap_or_default();
            let values = self.branch_values(row, columns)?;
            return Ok(vec![self.solution(values)]);
        }

        let mut solutions = Vec::with_capacity(self.branches.len());
        for columns in &self.branches {
            let values = self.branch_values(row, columns)?;
            if values.iter().all(Option::is_none) {
                break;
            }
            solutions.push(self.solution(values));
        }
        Ok(solutions)
    }

    fn solution(&self, values: Vec<Option<Term>>) -> QuerySolution {
        QuerySolution::from((Arc::clone(&self.variables), values))
    }

    fn branch_values(
        &self,
        row: &SqlRow,
        columns: &[(usize, OutputColumn)],
    ) -> Result<Vec<Option<Term>>, ExecutionError> {
        let mut values = vec![None; self.variables.len()];
        for (idx, column) in columns {
            let Some(value) = row.get(&column.column) else {
                return ExecutionError::decoding(format!("missing column {}", column.column));
            };
            if let Some(slot) = values.get_mut(*idx) {
                *slot = self.term(column.kind, value)?;
            }
        }
        Ok(values)
    }

    fn term(&self, kind: ColumnKind, value: &SqlValue) -> Result<Option<Term>, ExecutionError> {
        if value.is_null() {
            return Ok(None);
        }
        match kind {
            ColumnKind::Node => match value.as_node_id() {
                Some(id) => Ok(Some(self.loader.load(id)?)),
                None => ExecutionError::decoding(format!("{value:?} is not a node id")),
            },
            ColumnKind::Value(ty) => value_term(ty, value).map(Some),
        }
    }
}

/// Converts a computed value into a term according to its type.
pub(crate) fn value_term(ty: ValueType, value: &SqlValue) -> Result<Term, ExecutionError> {
    Ok(match (ty, value) {
        (_, SqlValue::String(value)) if is_uri_shaped(ty, value) => {
            NamedNode::new_unchecked(value.as_str()).into()
        }
        (ValueType::Uri | ValueType::String, SqlValue::String(value)) => {
            Literal::new_simple_literal(value).into()
        }
        (ValueType::Integer, SqlValue::Integer(value)) => Literal::from(*value).into(),
        (ValueType::Integer, SqlValue::Double(value)) => {
            Literal::new_typed_literal(format!("{}", value.trunc()), xsd::INTEGER).into()
        }
        (ValueType::Double, SqlValue::Double(value)) => Literal::from(*value).into(),
        (ValueType::Double, SqlValue::Integer(value)) => {
            Literal::new_typed_literal(format!("{value}E0"), xsd::DOUBLE).into()
        }
        (ValueType::Boolean, SqlValue::Boolean(value)) => Literal::from(*value).into(),
        (ValueType::Boolean, SqlValue::Integer(value)) => Literal::from(*value != 0).into(),
        (ValueType::Date, SqlValue::Timestamp(micros)) => match format_timestamp(*micros) {
            Some(value) => Literal::new_typed_literal(value, xsd::DATE_TIME).into(),
            None => return ExecutionError::decoding(format!("timestamp {micros} is out of range")),
        },
        (ty, SqlValue::String(value)) => {
            Literal::new_typed_literal(value, datatype(ty)).into()
        }
        (ty, value) => {
            return ExecutionError::decoding(format!("{value:?} is not a value of type {ty}"))
        }
    })
}

/// URI-typed values become IRIs if they parse. Strings only do if they also carry an authority.
fn is_uri_shaped(ty: ValueType, value: &str) -> bool {
    match ty {
        ValueType::Uri => Iri::parse(value).is_ok(),
        ValueType::String => value.contains("://") && Iri::parse(value).is_ok(),
        _ => false,
    }
}

fn datatype(ty: ValueType) -> triplesql_model::NamedNodeRef<'static> {
    match ty {
        ValueType::Uri | ValueType::String => xsd::STRING,
        ValueType::Integer => xsd::INTEGER,
        ValueType::Double => xsd::DOUBLE,
        ValueType::Boolean => xsd::BOOLEAN,
        ValueType::Date => xsd::DATE_TIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_shaped_strings_become_iris() {
        let term =
            value_term(ValueType::String, &SqlValue::String("http://e/a".to_owned())).unwrap();
        assert_eq!(term, Term::from(NamedNode::new_unchecked("http://e/a")));
        let term = value_term(ValueType::String, &SqlValue::String("a:b".to_owned())).unwrap();
        assert_eq!(term, Term::from(Literal::new_simple_literal("a:b")));
    }

    #[test]
    fn values_keep_their_type() {
        assert_eq!(
            value_term(ValueType::Integer, &SqlValue::Integer(3)).unwrap(),
            Term::from(Literal::from(3_i64))
        );
        assert_eq!(
            value_term(ValueType::Boolean, &SqlValue::Boolean(true)).unwrap(),
            Term::from(Literal::from(true))
        );
        assert_eq!(
            value_term(ValueType::Integer, &SqlValue::String("12".to_owned())).unwrap(),
            Term::from(Literal::new_typed_literal("12", xsd::INTEGER))
        );
    }

    #[test]
    fn mismatching_values_are_rejected() {
        let error = value_term(ValueType::Date, &SqlValue::Boolean(true)).unwrap_err();
        assert!(matches!(error, ExecutionError::Decoding(_)));
    }
}
