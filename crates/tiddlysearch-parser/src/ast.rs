//! The query-language abstract syntax tree.
//!
//! The source grammar historically dispatched on each node by attribute
//! lookup (`_<NodeName>`); here the tree is a tagged sum with an
//! exhaustive match at every consumer, so adding a node variant is a
//! compile error everywhere it isn't yet handled.

use serde::Serialize;

/// A parsed query. Immutable and restartable: the same `Node` can be
/// walked by more than one producer without re-parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// A bare search term. A trailing `*` is preserved here; the producer
    /// decides whether it means prefix matching.
    Word(String),
    /// An opaque phrase, without its surrounding quotes.
    Quotes(String),
    /// A `[a TO b]` / `{a TO b}` range. Parsed, but a producer may reject
    /// it outside a fielded unit.
    Range(RangeNode),
    /// `name:unit`.
    Field(FieldNode),
    /// `( expression )`. Grouping only; conjunction of its children.
    Group(Vec<Node>),
    /// Explicit, left-associative `AND` over two or more operands.
    And(Vec<Node>),
    /// Explicit, left-associative `OR` over two or more operands.
    Or(Vec<Node>),
    /// `NOT unit`.
    Not(Box<Node>),
    /// The root of a parsed query: an implicitly-conjoined sequence of
    /// terms. Empty when the input was blank.
    Toplevel(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeNode {
    /// `None` when the lower endpoint is `*` (open).
    pub low: Option<String>,
    pub low_inclusive: bool,
    /// `None` when the upper endpoint is `*` (open).
    pub high: Option<String>,
    pub high_inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub unit: Box<Node>,
}

impl Node {
    /// Shorthand used by tests and the planner: does this query have no
    /// terms at all (`Toplevel(vec![])`)?
    pub fn is_empty_toplevel(&self) -> bool {
        matches!(self, Node::Toplevel(children) if children.is_empty())
    }
}
