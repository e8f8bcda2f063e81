use crate::compiler::fragment::{JoinFragment, NodeJoin};
use crate::compiler::scope::{Binding, FrameId, NodeRef, Scope, ScopeGuard, ScopeKind};
use rustc_hash::FxHashMap;
use triplesql_common::schema::{NodeColumn, NODES_TABLE};
use triplesql_common::{CompilerOptions, SqlDialect};
use triplesql_model::{NodeId, NodeKind, Term, TermRef};
use triplesql_sql::{Ident, Query, Select, SelectItem, SqlExpr, TableRef};

/// Constants that were looked up in the node table before compiling. `None` marks a constant
/// that is not stored.
pub(crate) type PreloadedConstants = FxHashMap<Term, Option<NodeId>>;

/// The state of a single compilation.
pub(crate) struct Compilation<'c> {
    pub options: &'c CompilerOptions,
    pub scope: Scope,
    constants: PreloadedConstants,
    aliases: FxHashMap<&'static str, usize>,
    frames: FrameId,
}

impl<'c> Compilation<'c> {
    pub fn new(options: &'c CompilerOptions, constants: PreloadedConstants) -> Self {
        Self {
            options,
            scope: Scope::new(0),
            constants,
            aliases: FxHashMap::default(),
            frames: 0,
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.options.dialect
    }

    /// Returns a fresh table alias such as `t3`.
    pub fn next_alias(&mut self, prefix: &'static str) -> String {
        let counter = self.aliases.entry(prefix).or_default();
        *counter += 1;
        format!("{prefix}{counter}")
    }

    pub fn next_frame(&mut self) -> FrameId {
        self.frames += 1;
        self.frames
    }

    pub fn current_frame(&self) -> FrameId {
        self.scope.current_frame()
    }

    pub fn enter_scope(&mut self, kind: ScopeKind) -> ScopeGuard<'_, 'c> {
        ScopeGuard::enter(self, kind)
    }

    pub fn enter_optional(&mut self) -> ScopeGuard<'_, 'c> {
        ScopeGuard::enter_optional(self)
    }

    /// A single-row derived table for joins that have no table of their own.
    pub fn unit_table(&mut self) -> TableRef {
        let alias = self.next_alias("d");
        let select = Select {
            projection: vec![SelectItem::aliased(SqlExpr::integer(1), Ident::quoted("one"))],
            ..Select::default()
        };
        TableRef::derived(Query::select(select), alias)
    }

    /// Returns the alias under which the node table row of `node` is joined, joining it if
    /// necessary.
    pub fn node_alias(&mut self, node: &NodeRef, fragment: &mut JoinFragment) -> String {
        if let Some(alias) = &node.alias {
            return alias.clone();
        }
        let bound = node.origin.as_ref().and_then(|v| self.scope.resolve(v));
        if let Some(Binding::Node(bound)) = bound {
            if bound.id == node.id {
                if let Some(alias) = &bound.alias {
                    return alias.clone();
                }
            }
        }

        let alias = self.next_alias("v");
        let join = NodeJoin {
            alias: alias.clone(),
            id: node.id.clone(),
            frame: node.frame,
        };
        if node.frame == fragment.frame {
            fragment.attach_node_join(&join);
        } else {
            fragment.back_joins.push(join);
        }
        if let Some(variable) = &node.origin {
            self.scope.set_node_alias(variable, &node.id, &alias);
        }
        alias
    }

    /// Reads a column of the node table row of `node`.
    pub fn node_column(
        &mut self,
        node: &NodeRef,
        column: NodeColumn,
        fragment: &mut JoinFragment,
    ) -> SqlExpr {
        if column == NodeColumn::Id {
            return node.id.clone();
        }
        let alias = self.node_alias(node, fragment);
        SqlExpr::column(alias, column.name())
    }

    /// Returns the id expression of a constant, or `None` if the constant is known not to be
    /// stored.
    ///
    /// Preloaded constants become literals. Otherwise the node table is joined once per
    /// constant and frame path.
    pub fn constant_id(
        &mut self,
        term: TermRef<'_>,
        fragment: &mut JoinFragment,
    ) -> Option<SqlExpr> {
        let term = term.into_owned();
        if self.options.preload_constants {
            if let Some(id) = self.constants.get(&term) {
                return id.map(|id| SqlExpr::integer(id.as_i64()));
            }
        }
        if let Some(alias) = self.scope.constant_alias(&term) {
            return Some(SqlExpr::column(alias, NodeColumn::Id.name()));
        }

        let alias = self.next_alias("c");
        fragment.push_table(TableRef::table(NODES_TABLE, &alias));
        fragment.conditions.extend(constant_conditions(&alias, term.as_ref()));
        self.scope
            .register_constant(term.clone(), alias.clone(), fragment.frame);
        fragment.constants.push(term);
        Some(SqlExpr::column(alias, NodeColumn::Id.name()))
    }

    /// Returns the preloaded id of a constant. The outer option is `None` if the constant has
    /// not been preloaded.
    pub fn preloaded_id(&self, term: TermRef<'_>) -> Option<Option<NodeId>> {
        if !self.options.preload_constants {
            return None;
        }
        self.constants.get(&term.into_owned()).copied()
    }

    /// Forgets the constant joins of a fragment that is about to be wrapped in a derived table.
    pub fn forget_constants(&mut self, fragment: &mut JoinFragment) {
        for term in fragment.constants.drain(..) {
            self.scope.forget_constant(&term);
        }
    }
}

/// The conditions that identify the node table row of `term` under `alias`.
pub(crate) fn constant_conditions(alias: &str, term: TermRef<'_>) -> Vec<SqlExpr> {
    let column = |column: NodeColumn| SqlExpr::column(alias, column.name());
    match term {
        TermRef::NamedNode(node) => vec![
            column(NodeColumn::Kind).eq(SqlExpr::string(NodeKind::Uri.as_str())),
            column(NodeColumn::Uri).eq(SqlExpr::string(node.as_str())),
        ],
        TermRef::BlankNode(node) => vec![
            column(NodeColumn::Kind).eq(SqlExpr::string(NodeKind::BlankNode.as_str())),
            column(NodeColumn::AnonId).eq(SqlExpr::string(node.as_str())),
        ],
        TermRef::Literal(literal) => {
            let language = match literal.language() {
                Some(language) => column(NodeColumn::Language).eq(SqlExpr::string(language)),
                None => column(NodeColumn::Language).is_null(),
            };
            vec![
                column(NodeColumn::ContentHash)
                    .eq(SqlExpr::integer(triplesql_model::content_hash(literal.value()))),
                column(NodeColumn::Content).eq(SqlExpr::string(literal.value())),
                language,
                column(NodeColumn::Datatype).eq(SqlExpr::string(literal.datatype().as_str())),
            ]
        }
        #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
        _ => vec![SqlExpr::boolean(false)],
    }
}
