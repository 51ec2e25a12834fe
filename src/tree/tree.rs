//! The tree: arena of nodes, structural operations and teardown.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::ReconcileError;
use crate::observer::{ChangeContext, NotificationHub};

use super::node::{NodeId, NodeKind, NodeState, TreeId, TreeNode, TreeSnapshot};
use super::reconcile::{ReloadOptions, ReloadReport};
use super::source::{NodeLifecycle, NodeRemoval, TreeSource, TreeWindow};

/// Persistent UI-tree mirror of a hierarchical model.
///
/// The tree exclusively owns its nodes; a node's subtree lives exactly as long
/// as the node. Model values are shared, never owned. Every destroyed node is
/// announced to the window, the deletion hub and the lifecycle hook before it
/// leaves the arena, including when the tree itself is dropped.
pub struct Tree<M: TreeSource> {
    pub(crate) id: TreeId,
    pub(crate) source: M,
    pub(crate) nodes: HashMap<NodeId, TreeNode<M::Value, M::ChildType>>,
    pub(crate) root: NodeId,
    next_id: u64,
    pub(crate) selection: Option<NodeId>,
    window: Option<Weak<dyn TreeWindow>>,
    lifecycle: Option<Rc<dyn NodeLifecycle<M::Value>>>,
    deletions: NotificationHub<NodeId, NodeRemoval>,
}

impl<M: TreeSource> Tree<M> {
    /// Create a tree whose root mirrors `root_value`. The root starts unparsed.
    pub fn new(source: M, root_name: impl Into<String>, root_value: Rc<M::Value>) -> Self {
        let mut tree = Self {
            id: TreeId::new(),
            source,
            nodes: HashMap::new(),
            root: NodeId::from_raw(0),
            next_id: 0,
            selection: None,
            window: None,
            lifecycle: None,
            deletions: NotificationHub::new(),
        };
        tree.root = tree.alloc_node(None, root_name.into(), root_value, None);
        tree
    }

    /// Attach the presentation window told about node teardown.
    #[must_use]
    pub fn with_window(mut self, window: &Rc<dyn TreeWindow>) -> Self {
        self.set_window(window);
        self
    }

    /// Attach the window notified when nodes are deleted.
    pub fn set_window(&mut self, window: &Rc<dyn TreeWindow>) {
        self.window = Some(Rc::downgrade(window));
    }

    /// Install the lifecycle hook. Existing nodes are reported as attached.
    pub fn set_lifecycle(&mut self, hook: Rc<dyn NodeLifecycle<M::Value>>) {
        for node in self.nodes.values() {
            hook.attached(node.id, &node.value);
        }
        self.lifecycle = Some(hook);
    }

    #[must_use]
    pub const fn id(&self) -> TreeId {
        self.id
    }

    #[must_use]
    pub const fn source(&self) -> &M {
        &self.source
    }

    /// Mutable access to the model adapter (for instance to change filtering).
    /// Follow up with a forced reload for the change to show.
    pub fn source_mut(&mut self) -> &mut M {
        &mut self.source
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Hub notified for every destroyed node.
    #[must_use]
    pub const fn deletion_hub(&self) -> &NotificationHub<NodeId, NodeRemoval> {
        &self.deletions
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode<M::Value, M::ChildType>> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Lifecycle state. Ids no longer in the tree report `Deleted`.
    #[must_use]
    pub fn node_state(&self, id: NodeId) -> NodeState {
        self.nodes.get(&id).map_or(NodeState::Deleted, TreeNode::state)
    }

    /// Number of materialized nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Materialized children of `id`, in display order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, ReconcileError> {
        Ok(self.get(id)?.child_ids())
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&TreeNode<M::Value, M::ChildType>, ReconcileError> {
        self.nodes.get(&id).ok_or(ReconcileError::NodeNotFound { id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut TreeNode<M::Value, M::ChildType>, ReconcileError> {
        self.nodes.get_mut(&id).ok_or(ReconcileError::NodeNotFound { id })
    }

    /// Slash-joined names from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Result<String, ReconcileError> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current)?;
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        Ok(names.join("/"))
    }

    pub(crate) fn child_path(&self, parent: NodeId, name: &str) -> String {
        match self.path(parent) {
            Ok(path) => format!("{path}/{name}"),
            Err(_) => name.to_string(),
        }
    }

    /// Open a node, materializing its children on first expansion.
    pub fn expand(&mut self, id: NodeId) -> Result<ReloadReport, ReconcileError> {
        let node = self.get_mut(id)?;
        node.open = true;
        if node.parsed {
            return Ok(ReloadReport::default());
        }
        node.parsed = true;
        self.reload(id, ReloadOptions::children_only())
    }

    /// Close a node. Its subtree stays materialized.
    pub fn collapse(&mut self, id: NodeId) -> Result<(), ReconcileError> {
        self.get_mut(id)?.open = false;
        Ok(())
    }

    /// Find a child by name, materializing children first if needed.
    pub fn lookup_child(&mut self, id: NodeId, name: &str) -> Result<Option<NodeId>, ReconcileError> {
        let node = self.get_mut(id)?;
        if !node.parsed {
            node.parsed = true;
            self.reload(id, ReloadOptions::children_only())?;
        }
        Ok(self.get(id)?.child(name))
    }

    /// Resolve a slash-separated path produced by [`Tree::path`].
    pub fn resolve_path(&mut self, path: &str) -> Result<Option<NodeId>, ReconcileError> {
        let mut segments = path.split('/');
        let root_name = segments.next().unwrap_or_default();
        if root_name != self.get(self.root)?.name {
            return Ok(None);
        }
        let mut current = self.root;
        for segment in segments {
            match self.lookup_child(current, segment)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    /// Move the whole child collection of `src` under `dst`.
    ///
    /// Existing children of `dst` are destroyed first. The moved subtrees keep
    /// their node identities, expansion state and selection.
    pub fn move_all_children_from(&mut self, dst: NodeId, src: NodeId) -> Result<(), ReconcileError> {
        self.get(src)?;
        self.get(dst)?;
        if self.is_ancestor(dst, src) || self.is_ancestor(src, dst) {
            return Err(ReconcileError::InvalidMove { from: src, to: dst });
        }

        let doomed = std::mem::take(&mut self.get_mut(dst)?.children);
        for (_, child) in doomed {
            self.delete_subtree(child);
        }

        let src_value = Rc::clone(&self.get(src)?.value);
        let src_expandable = self.source.kind_of(&src_value).is_composite() && self.source.has_children(&src_value);

        // Snapshot, then clear, so the children are never owned twice.
        let source_node = self.get_mut(src)?;
        let moved = std::mem::take(&mut source_node.children);
        let src_parsed = source_node.parsed;
        source_node.expandable = src_expandable;

        let dst_kind = self.get(dst)?.kind;
        for (name, child) in &moved {
            trace!(child = %child, "relocating child");
            let label = {
                let node = self.get(*child)?;
                self.source.label(Some(dst_kind), name, &node.value)
            };
            let node = self.get_mut(*child)?;
            node.parent = Some(dst);
            node.label = label;
        }

        let dst_node = self.get_mut(dst)?;
        dst_node.parsed |= src_parsed;
        dst_node.expandable = !moved.is_empty();
        dst_node.children = moved;
        Ok(())
    }

    /// Remove the child at model index `index` of an array-like node, shifting
    /// the names of every later child down by one instead of reconciling.
    ///
    /// A selection on the removed child or anywhere below it moves to the next
    /// sibling, else to the item above, else to the next item in document order.
    /// Call this before removing the element from the model; the model's own
    /// notification then finds every surviving child still valid.
    ///
    /// Returns the removed node, or `None` if it was never materialized.
    pub fn remove_child_preserving_selection(
        &mut self,
        parent: NodeId,
        index: usize,
    ) -> Result<Option<NodeId>, ReconcileError> {
        let node = self.get(parent)?;
        if node.kind != NodeKind::Indexed {
            return Err(ReconcileError::NotIndexed { path: self.path(parent)? });
        }
        if !node.parsed {
            return Ok(None);
        }

        let key = index.to_string();
        let removed = node.child(&key);
        if removed.is_none() && self.source.child(&node.value, &key).is_none() {
            return Err(ReconcileError::IndexOutOfRange {
                path: self.path(parent)?,
                index,
                len: node.children.len(),
            });
        }

        debug!(parent = %parent, index, "removing indexed child");
        if let Some(child) = removed {
            self.move_selection_away(child);
        }

        let old = std::mem::take(&mut self.get_mut(parent)?.children);
        let mut shifted = IndexMap::with_capacity(old.len());
        let mut renamed = Vec::new();
        for (name, child) in old {
            match name.parse::<usize>() {
                Ok(i) if i == index => {}
                Ok(i) if i > index => {
                    let new_name = (i - 1).to_string();
                    renamed.push((child, new_name.clone()));
                    shifted.insert(new_name, child);
                }
                _ => {
                    shifted.insert(name, child);
                }
            }
        }
        let parent_node = self.get_mut(parent)?;
        parent_node.expandable = !shifted.is_empty();
        parent_node.children = shifted;

        for (child, new_name) in renamed {
            let label = {
                let node = self.get(child)?;
                self.source.label(Some(NodeKind::Indexed), &new_name, &node.value)
            };
            let node = self.get_mut(child)?;
            node.name = new_name;
            node.label = label;
        }

        if let Some(child) = removed {
            self.delete_subtree(child);
        }
        Ok(removed)
    }

    /// Serializable view of the materialized subtree under `id`.
    pub fn snapshot(&self, id: NodeId) -> Result<TreeSnapshot, ReconcileError> {
        let node = self.get(id)?;
        let children = node
            .children
            .values()
            .map(|child| self.snapshot(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TreeSnapshot {
            id: node.id,
            name: node.name.clone(),
            label: node.label.clone(),
            kind: node.kind,
            state: node.state(),
            open: node.open,
            expandable: node.expandable,
            children,
        })
    }

    pub(crate) fn alloc_node(
        &mut self,
        parent: Option<NodeId>,
        name: String,
        value: Rc<M::Value>,
        child_type: Option<M::ChildType>,
    ) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;

        let parent_kind = parent.and_then(|p| self.nodes.get(&p)).map(|p| p.kind);
        let kind = self.source.kind_of(&value);
        let label = self.source.label(parent_kind, &name, &value);
        let expandable = kind.is_composite() && self.source.has_children(&value);

        if let Some(hook) = &self.lifecycle {
            hook.attached(id, &value);
        }
        self.nodes.insert(
            id,
            TreeNode {
                id,
                name,
                label,
                value,
                child_type,
                kind,
                parent,
                children: IndexMap::new(),
                parsed: false,
                open: false,
                expandable,
            },
        );
        id
    }

    /// Point an existing node at a new value, keeping its identity and subtree.
    pub(crate) fn repoint(&mut self, id: NodeId, value: Rc<M::Value>) -> Result<(), ReconcileError> {
        let node = self.get(id)?;
        let parent_kind = node.parent.and_then(|p| self.nodes.get(&p)).map(|p| p.kind);
        let label = self.source.label(parent_kind, &node.name, &value);
        let kind = self.source.kind_of(&value);
        if let Some(hook) = &self.lifecycle {
            hook.detached(id, &node.value);
            hook.attached(id, &value);
        }
        let node = self.get_mut(id)?;
        node.value = value;
        node.label = label;
        node.kind = kind;
        Ok(())
    }

    /// Destroy `id` and its descendants. The caller unlinks `id` from its parent.
    pub(crate) fn delete_subtree(&mut self, id: NodeId) {
        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                doomed.push(current);
                stack.extend(node.children.values().rev().copied());
            }
        }

        let window = self.window.as_ref().and_then(Weak::upgrade);
        for current in &doomed {
            let path = self.path(*current).unwrap_or_default();
            trace!(node = %current, %path, "deleting node");
            if let Some(window) = &window {
                window.delete_notify(*current, &path);
            }
            self.deletions.notify_observers(
                Some(Rc::new(*current)),
                &ChangeContext::scoped(NodeRemoval { tree: self.id, path }),
            );
            if let (Some(hook), Some(node)) = (&self.lifecycle, self.nodes.get(current)) {
                hook.detached(*current, &node.value);
            }
            if self.selection == Some(*current) {
                self.selection = None;
            }
        }
        for current in doomed {
            self.nodes.remove(&current);
        }
    }
}

impl<M: TreeSource> Drop for Tree<M> {
    fn drop(&mut self) {
        let root = self.root;
        self.delete_subtree(root);
    }
}

impl<M: TreeSource> fmt::Debug for Tree<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}
