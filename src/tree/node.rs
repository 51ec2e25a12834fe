//! Tree node types and identifiers.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a node inside one [`Tree`](super::Tree).
///
/// Ids are handed out from a per-tree counter and never reused, so two ids
/// compare equal exactly when they denote the same node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id (tests and external registries).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Globally unique identity of a tree, for registries spanning several windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(Uuid);

impl TreeId {
    /// Creates a new random tree id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural kind of a node, derived from the model value it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Composite with named children (dictionary-like).
    Keyed,
    /// Composite with positional children named `0..n` (array-like).
    Indexed,
    /// No children.
    Leaf,
}

impl NodeKind {
    #[must_use]
    pub const fn is_composite(self) -> bool {
        !matches!(self, Self::Leaf)
    }
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Children were never materialized.
    Unparsed,
    /// Children are materialized and kept in sync by reconciliation.
    Parsed,
    /// Removed from the tree. Terminal.
    Deleted,
}

/// A node of the persistent UI tree.
///
/// The node owns its children (through the arena of its tree) and shares,
/// without owning, the model value it mirrors.
pub struct TreeNode<V, C> {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) value: Rc<V>,
    pub(crate) child_type: Option<C>,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: IndexMap<String, NodeId>,
    pub(crate) parsed: bool,
    pub(crate) open: bool,
    pub(crate) expandable: bool,
}

impl<V, C> TreeNode<V, C> {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Name among siblings. Not unique across the tree.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn value(&self) -> &Rc<V> {
        &self.value
    }

    /// Type recorded when the node was created. `None` for the root.
    #[must_use]
    pub const fn child_type(&self) -> Option<&C> {
        self.child_type.as_ref()
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        self.parsed
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the presentation should offer to expand this node.
    #[must_use]
    pub const fn is_expandable(&self) -> bool {
        self.expandable
    }

    #[must_use]
    pub const fn state(&self) -> NodeState {
        if self.parsed {
            NodeState::Parsed
        } else {
            NodeState::Unparsed
        }
    }

    /// Materialized child with this name, without triggering expansion.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Materialized children in display order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    #[must_use]
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.values().copied().collect()
    }

    #[must_use]
    pub fn child_names(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl<V, C: fmt::Debug> fmt::Debug for TreeNode<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("child_type", &self.child_type)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("parsed", &self.parsed)
            .field("open", &self.open)
            .field("expandable", &self.expandable)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a materialized subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Node identity at the time of the snapshot.
    pub id: NodeId,
    /// Name among siblings.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Structural kind.
    pub kind: NodeKind,
    /// Lifecycle state.
    pub state: NodeState,
    /// Whether the node is expanded.
    pub open: bool,
    /// Whether the node offers expansion.
    pub expandable: bool,
    /// Materialized children, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Names of the direct children, in display order.
    #[must_use]
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }
}
