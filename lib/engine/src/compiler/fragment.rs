use crate::compiler::scope::FrameId;
use triplesql_common::schema::{NodeColumn, NODES_TABLE};
use triplesql_model::{Term, Variable};
use triplesql_sql::{JoinKind, Select, SelectItem, SqlExpr, TableRef};

/// A LEFT OUTER JOIN of the node table that has to be attached to the FROM clause of `frame`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NodeJoin {
    pub alias: String,
    pub id: SqlExpr,
    pub frame: FrameId,
}

impl NodeJoin {
    fn table(&self) -> TableRef {
        TableRef::table(NODES_TABLE, &self.alias)
    }

    fn condition(&self) -> SqlExpr {
        SqlExpr::column(&self.alias, NodeColumn::Id.name()).eq(self.id.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Grouping {
    pub keys: Vec<SqlExpr>,
    pub having: Vec<SqlExpr>,
}

/// The FROM and WHERE parts of a SELECT under construction.
#[derive(Debug)]
pub(crate) struct JoinFragment {
    pub frame: FrameId,
    pub table: Option<TableRef>,
    pub conditions: Vec<SqlExpr>,
    /// Node joins for ids of an enclosing frame. They are attached to the outer side once this
    /// fragment becomes the right-hand side of a LEFT JOIN.
    pub back_joins: Vec<NodeJoin>,
    /// The variables bound by this fragment, in order of binding.
    pub variables: Vec<Variable>,
    /// The constants joined into `table`.
    pub constants: Vec<Term>,
    pub grouping: Option<Grouping>,
    /// The trailing sort columns of a set operation, one group per ORDER BY key. Only set while
    /// the fragment is nothing but the derived table of the set operation.
    pub sort_columns: Option<Vec<Vec<SqlExpr>>>,
}

impl JoinFragment {
    pub fn new(frame: FrameId) -> Self {
        Self {
            frame,
            table: None,
            conditions: Vec::new(),
            back_joins: Vec::new(),
            variables: Vec::new(),
            constants: Vec::new(),
            grouping: None,
            sort_columns: None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.grouping.is_some()
    }

    /// Cross joins `table` into the FROM clause.
    pub fn push_table(&mut self, table: TableRef) {
        self.table = Some(match self.table.take() {
            Some(current) => current.join(table, JoinKind::Cross, None),
            None => table,
        });
        self.sort_columns = None;
    }

    /// Attaches the node table for an id of this fragment's frame.
    pub fn attach_node_join(&mut self, join: &NodeJoin) {
        match self.table.take() {
            Some(current) => {
                self.table = Some(current.join(
                    join.table(),
                    JoinKind::LeftOuter,
                    Some(join.condition()),
                ));
            }
            None => {
                self.table = Some(join.table());
                self.conditions.push(join.condition());
            }
        }
        self.sort_columns = None;
    }

    pub fn add_variable(&mut self, variable: &Variable) {
        if !self.variables.contains(variable) {
            self.variables.push(variable.clone());
        }
    }

    /// Adds a filter condition. Filters over a grouped fragment apply to the groups.
    pub fn add_filter(&mut self, condition: SqlExpr) {
        match &mut self.grouping {
            Some(grouping) => grouping.having.push(condition),
            None => self.conditions.push(condition),
        }
        self.sort_columns = None;
    }

    /// Combines two fragments of the same frame by an inner join. Neither may be grouped.
    #[must_use]
    pub fn join(mut self, other: JoinFragment) -> Self {
        self.table = match (self.table.take(), other.table) {
            (Some(left), Some(right)) => Some(left.graft(right)),
            (left, right) => left.or(right),
        };
        self.conditions.extend(other.conditions);
        self.absorb(other.back_joins, other.variables, other.constants);
        self.sort_columns = None;
        self
    }

    /// Combines this fragment with the right-hand side of an optional. Back joins of `right`
    /// that belong to this frame are attached here, before the LEFT JOIN, so they never end up
    /// in its ON clause.
    #[must_use]
    pub fn left_join(mut self, right: JoinFragment, on: Vec<SqlExpr>, unit: TableRef) -> Self {
        let mut back_joins = Vec::new();
        for join in right.back_joins {
            if join.frame == self.frame {
                self.attach_node_join(&join);
            } else {
                back_joins.push(join);
            }
        }
        let right_table = right.table.unwrap_or_else(|| unit.clone());
        let on = SqlExpr::conjunction(right.conditions.into_iter().chain(on))
            .unwrap_or_else(|| SqlExpr::boolean(true));
        let left_table = self.table.take().unwrap_or(unit);
        self.table = Some(left_table.join(right_table, JoinKind::LeftOuter, Some(on)));
        self.absorb(back_joins, right.variables, right.constants);
        self.sort_columns = None;
        self
    }

    fn absorb(
        &mut self,
        back_joins: Vec<NodeJoin>,
        variables: Vec<Variable>,
        constants: Vec<Term>,
    ) {
        for join in back_joins {
            if join.frame == self.frame {
                self.attach_node_join(&join);
            } else {
                self.back_joins.push(join);
            }
        }
        for variable in &variables {
            self.add_variable(variable);
        }
        self.constants.extend(constants);
    }

    /// Finishes the fragment as a SELECT with the given projection. Remaining back joins are
    /// attached to this fragment.
    pub fn into_select(mut self, projection: Vec<SelectItem>) -> Select {
        for join in std::mem::take(&mut self.back_joins) {
            self.attach_node_join(&join);
        }
        let (group_by, having) = match self.grouping {
            Some(grouping) => (grouping.keys, SqlExpr::conjunction(grouping.having)),
            None => (Vec::new(), None),
        };
        Select {
            distinct: false,
            projection,
            from: self.table,
            selection: SqlExpr::conjunction(self.conditions),
            group_by,
            having,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triplesql_common::SqlDialect;
    use triplesql_sql::ToSql;

    fn triples(alias: &str, frame: FrameId) -> JoinFragment {
        let mut fragment = JoinFragment::new(frame);
        fragment.push_table(TableRef::table("triples", alias));
        fragment
    }

    fn render(fragment: JoinFragment) -> String {
        triplesql_sql::Query::select(fragment.into_select(vec![SelectItem::Wildcard]))
            .to_sql(SqlDialect::Baseline)
    }

    #[test]
    fn back_joins_attach_before_the_left_join() {
        let left = triples("t1", 0);
        let mut right = triples("t2", 1);
        right.back_joins.push(NodeJoin {
            alias: "v1".to_owned(),
            id: SqlExpr::column("t1", "object_id"),
            frame: 0,
        });
        right
            .conditions
            .push(SqlExpr::column("t2", "subject_id").eq(SqlExpr::column("t1", "subject_id")));
        let unit = TableRef::table("unit", "d1");
        let sql = render(left.left_join(right, Vec::new(), unit));
        assert_eq!(
            sql,
            "SELECT * FROM triples AS t1 \
             LEFT OUTER JOIN nodes AS v1 ON v1.id = t1.object_id \
             LEFT OUTER JOIN triples AS t2 ON t2.subject_id = t1.subject_id"
        );
    }

    #[test]
    fn back_joins_of_outer_frames_propagate() {
        let left = triples("t2", 1);
        let mut right = triples("t3", 2);
        right.back_joins.push(NodeJoin {
            alias: "v1".to_owned(),
            id: SqlExpr::column("t1", "object_id"),
            frame: 0,
        });
        let joined = left.left_join(right, Vec::new(), TableRef::table("unit", "d1"));
        assert_eq!(joined.back_joins.len(), 1);
    }

    #[test]
    fn filters_on_groups_become_having() {
        let mut fragment = triples("t1", 0);
        fragment.grouping = Some(Grouping {
            keys: vec![SqlExpr::column("t1", "subject_id")],
            having: Vec::new(),
        });
        fragment.add_filter(SqlExpr::boolean(false));
        let select = fragment.into_select(vec![SelectItem::Wildcard]);
        assert_eq!(select.having, Some(SqlExpr::boolean(false)));
        assert_eq!(select.selection, None);
    }

    #[test]
    fn node_join_without_table_becomes_the_base() {
        let mut fragment = JoinFragment::new(0);
        fragment.attach_node_join(&NodeJoin {
            alias: "v1".to_owned(),
            id: SqlExpr::integer(4),
            frame: 0,
        });
        assert_eq!(render(fragment), "SELECT * FROM nodes AS v1 WHERE v1.id = 4");
    }
}
