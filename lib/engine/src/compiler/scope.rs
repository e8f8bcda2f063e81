use crate::compiler::compilation::Compilation;
use crate::compiler::types::Scalar;
use rustc_hash::FxHashMap;
use std::ops::{Deref, DerefMut};
use triplesql_model::{Term, Variable};
use triplesql_sql::SqlExpr;

/// Identifies the FROM clause a table alias belongs to.
///
/// Every SELECT and every right-hand side of a LEFT JOIN gets its own frame. A node join can
/// only be attached to the fragment of the frame its id belongs to.
pub(crate) type FrameId = usize;

/// A reference to a row of the node table.
///
/// The id expression is always available. The node table itself is only joined (under `alias`)
/// once one of its content columns is needed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NodeRef {
    pub id: SqlExpr,
    pub alias: Option<String>,
    pub frame: FrameId,
    /// The variable whose binding receives the alias once the node table is joined.
    pub origin: Option<Variable>,
    /// Set once the node has been handed out of the optional side of a LEFT JOIN. The id is
    /// NULL for rows where the optional part did not match.
    pub nullable: bool,
}

impl NodeRef {
    pub fn new(id: SqlExpr, frame: FrameId) -> Self {
        Self {
            id,
            alias: None,
            frame,
            origin: None,
            nullable: false,
        }
    }

    #[must_use]
    pub fn bound_to(mut self, variable: &Variable) -> Self {
        self.origin = Some(variable.clone());
        self
    }
}

/// The SQL source of a variable.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Binding {
    Node(NodeRef),
    /// A computed value without node identity.
    Extension(Scalar),
}

#[derive(Clone, Debug)]
struct ConstantJoin {
    alias: String,
    frame: FrameId,
}

/// Maps variables to their SQL sources and remembers which constants have been joined.
#[derive(Clone, Debug)]
pub(crate) struct Scope {
    bindings: FxHashMap<Variable, Binding>,
    constants: FxHashMap<Term, ConstantJoin>,
    /// The frames from the outermost one to the current one.
    frames: Vec<FrameId>,
}

impl Scope {
    pub fn new(frame: FrameId) -> Self {
        Self {
            bindings: FxHashMap::default(),
            constants: FxHashMap::default(),
            frames: vec![frame],
        }
    }

    pub fn current_frame(&self) -> FrameId {
        self.frames.last().copied().unwrap_or_default()
    }

    pub fn resolve(&self, variable: &Variable) -> Option<&Binding> {
        self.bindings.get(variable)
    }

    pub fn bind(&mut self, variable: Variable, binding: Binding) {
        self.bindings.insert(variable, binding);
    }

    pub fn unbind(&mut self, variable: &Variable) {
        self.bindings.remove(variable);
    }

    /// Forgets every variable `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&Variable) -> bool) {
        self.bindings.retain(|variable, _| keep(variable));
    }

    /// Records that the node table has been joined as `alias` for `variable`, as long as the
    /// variable is still bound to the node with the given id.
    pub fn set_node_alias(&mut self, variable: &Variable, id: &SqlExpr, alias: &str) {
        if let Some(Binding::Node(node)) = self.bindings.get_mut(variable) {
            if &node.id == id {
                node.alias = Some(alias.to_owned());
            }
        }
    }

    /// Returns the alias of the node-table join that matches `term`, if one is reachable from
    /// the current frame.
    pub fn constant_alias(&self, term: &Term) -> Option<&str> {
        self.constants
            .get(term)
            .filter(|join| self.frames.contains(&join.frame))
            .map(|join| join.alias.as_str())
    }

    pub fn register_constant(&mut self, term: Term, alias: String, frame: FrameId) {
        self.constants.insert(term, ConstantJoin { alias, frame });
    }

    pub fn forget_constant(&mut self, term: &Term) {
        self.constants.remove(term);
    }

    fn push_frame(&mut self, frame: FrameId) {
        self.frames.push(frame);
    }

    /// Leaves the current frame. Nodes of the frame now belong to the parent frame, as the
    /// fragment of the frame is joined into the parent's FROM clause. Constant joins of the
    /// frame are forgotten since they are NULL whenever the optional side does not match.
    fn pop_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let parent = self.current_frame();
        for binding in self.bindings.values_mut() {
            if let Binding::Node(node) = binding {
                if node.frame == frame {
                    node.frame = parent;
                    node.nullable = true;
                }
            }
        }
        self.constants.retain(|_, join| join.frame != frame);
    }

    /// A scope for a correlated sub-query. Outer variables stay visible, outer constant joins
    /// do not.
    fn correlated(&self, frame: FrameId) -> Self {
        let bindings = self
            .bindings
            .iter()
            .map(|(variable, binding)| {
                let binding = match binding {
                    Binding::Node(node) => Binding::Node(NodeRef {
                        frame,
                        ..node.clone()
                    }),
                    Binding::Extension(scalar) => Binding::Extension(scalar.clone()),
                };
                (variable.clone(), binding)
            })
            .collect();
        Self {
            bindings,
            constants: FxHashMap::default(),
            frames: vec![frame],
        }
    }
}

/// How a nested SELECT sees the enclosing scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    /// Nothing of the enclosing scope is visible.
    Isolated,
    /// Variables of the enclosing scope are visible and can be referenced.
    Correlated,
}

enum Restore {
    Scope(Box<Scope>),
    Frame,
}

/// Gives access to the compilation while a nested scope is active. The enclosing scope is
/// restored when the guard is dropped.
pub(crate) struct ScopeGuard<'a, 'c> {
    compilation: &'a mut Compilation<'c>,
    restore: Option<Restore>,
}

impl<'a, 'c> ScopeGuard<'a, 'c> {
    pub(crate) fn enter(compilation: &'a mut Compilation<'c>, kind: ScopeKind) -> Self {
        let frame = compilation.next_frame();
        let inner = match kind {
            ScopeKind::Isolated => Scope::new(frame),
            ScopeKind::Correlated => compilation.scope.correlated(frame),
        };
        let outer = std::mem::replace(&mut compilation.scope, inner);
        Self {
            compilation,
            restore: Some(Restore::Scope(Box::new(outer))),
        }
    }

    /// Enters the right-hand side of a LEFT JOIN. Bindings made inside stay visible after the
    /// guard is dropped.
    pub(crate) fn enter_optional(compilation: &'a mut Compilation<'c>) -> Self {
        let frame = compilation.next_frame();
        compilation.scope.push_frame(frame);
        Self {
            compilation,
            restore: Some(Restore::Frame),
        }
    }
}

impl<'c> Deref for ScopeGuard<'_, 'c> {
    type Target = Compilation<'c>;

    fn deref(&self) -> &Self::Target {
        self.compilation
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.compilation
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        match self.restore.take() {
            Some(Restore::Scope(outer)) => self.compilation.scope = *outer,
            Some(Restore::Frame) => self.compilation.scope.pop_frame(),
            None => {}
        }
    }
}
