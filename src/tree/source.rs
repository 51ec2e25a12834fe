//! Collaborator interfaces of the tree.
//!
//! [`TreeSource`] is the model-facing capability set reconciliation queries.
//! [`TreeWindow`] and [`NodeLifecycle`] are the presentation/binding-facing
//! hooks told about node teardown.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeKind, TreeId};

/// Model capabilities needed to mirror a hierarchical document.
///
/// Every method is a query; none may mutate the tree. Implementations are
/// expected to be cheap enough to call once per child per reconciliation pass.
pub trait TreeSource {
    /// Model entity mirrored by a node.
    type Value;
    /// Classification used to detect that a name now denotes a different kind of value.
    type ChildType: Clone + PartialEq + fmt::Debug;

    /// Names of the children currently expected under `parent`, in display order.
    fn child_names(&self, parent: &Rc<Self::Value>) -> Vec<String>;

    /// Type of the named child, or `None` if it vanished since enumeration.
    fn child_type(&self, parent: &Rc<Self::Value>, name: &str) -> Option<Self::ChildType>;

    /// Current value of the named child.
    fn child(&self, parent: &Rc<Self::Value>, name: &str) -> Option<Rc<Self::Value>>;

    /// Whether `value` has at least one visible child.
    fn has_children(&self, value: &Rc<Self::Value>) -> bool {
        !self.child_names(value).is_empty()
    }

    /// Structural kind of `value`.
    fn kind_of(&self, value: &Rc<Self::Value>) -> NodeKind;

    /// Display label for a node named `name` under a parent of `parent_kind`.
    fn label(&self, parent_kind: Option<NodeKind>, name: &str, value: &Rc<Self::Value>) -> String {
        let _ = (parent_kind, value);
        name.to_string()
    }

    /// Whether two references denote the same model entity.
    fn same_value(&self, a: &Rc<Self::Value>, b: &Rc<Self::Value>) -> bool {
        Rc::ptr_eq(a, b)
    }

    /// Whether a node currently showing `existing` may be repointed at `current`
    /// in place, keeping its expansion state and descendants.
    ///
    /// Must not inspect or reload children; reconciliation does that afterwards.
    fn deep_reload(&self, name: &str, existing: &Rc<Self::Value>, current: &Rc<Self::Value>) -> bool {
        let _ = (name, existing, current);
        false
    }
}

/// Presentation-side owner of a tree, told when nodes are destroyed.
///
/// The tree only holds a weak reference to its window.
pub trait TreeWindow {
    /// Called once per node, before it is destroyed.
    fn delete_notify(&self, node: NodeId, path: &str);
}

/// Hook told when a node starts or stops mirroring a model value.
///
/// `attached` runs after a node is created or deep-reloaded onto a new value;
/// `detached` runs before a node is destroyed or repointed away from a value.
pub trait NodeLifecycle<V> {
    /// `node` now mirrors `value`.
    fn attached(&self, node: NodeId, value: &Rc<V>);
    /// `node` no longer mirrors `value`.
    fn detached(&self, node: NodeId, value: &Rc<V>);
}

/// Scope of a deletion notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRemoval {
    /// Tree the node belonged to.
    pub tree: TreeId,
    /// Path of the node right before removal.
    pub path: String,
}
