/// Defines how blank nodes in query patterns are matched against stored nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlankNodeMatchingMode {
    /// A blank node is interpreted as a variable.
    #[default]
    Variable,
    /// A blank node is interpreted as a constant that matches the stored blank node with the
    /// same label.
    Constant,
}
