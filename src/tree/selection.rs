//! Selection tracking and visible-order traversal.
//!
//! Traversal follows what a tree view shows: children of closed nodes are not
//! visible and are skipped.

use tracing::info;

use crate::error::ReconcileError;

use super::node::NodeId;
use super::source::TreeSource;
use super::tree::Tree;

impl<M: TreeSource> Tree<M> {
    #[must_use]
    pub const fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    /// Select `id`. Fails if the node is not in the tree.
    pub fn select(&mut self, id: NodeId) -> Result<(), ReconcileError> {
        self.get(id)?;
        self.selection = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let parent = self.nodes.get(&node.parent?)?;
        let pos = parent.children.get_index_of(&node.name)?;
        parent.children.get_index(pos + 1).map(|(_, sibling)| *sibling)
    }

    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let parent = self.nodes.get(&node.parent?)?;
        let pos = parent.children.get_index_of(&node.name)?;
        let prev = pos.checked_sub(1)?;
        parent.children.get_index(prev).map(|(_, sibling)| *sibling)
    }

    /// The visible item directly above `id`: the deepest visible descendant of
    /// the previous sibling, or else the parent.
    #[must_use]
    pub fn item_above(&self, id: NodeId) -> Option<NodeId> {
        match self.previous_sibling(id) {
            Some(sibling) => Some(self.last_visible_descendant(sibling)),
            None => self.nodes.get(&id)?.parent,
        }
    }

    /// The visible item directly below `id`.
    #[must_use]
    pub fn item_below(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        if node.open {
            if let Some((_, first)) = node.children.first() {
                return Some(*first);
            }
        }
        self.item_after_subtree(id)
    }

    /// First visible item after everything below `id`.
    fn item_after_subtree(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        loop {
            if let Some(sibling) = self.next_sibling(cursor) {
                return Some(sibling);
            }
            cursor = self.nodes.get(&cursor)?.parent?;
        }
    }

    fn last_visible_descendant(&self, id: NodeId) -> NodeId {
        let mut cursor = id;
        while let Some(node) = self.nodes.get(&cursor) {
            match node.children.last() {
                Some((_, last)) if node.open => cursor = *last,
                _ => break,
            }
        }
        cursor
    }

    /// If the selection is on `id` or inside its subtree, move it to the nearest
    /// item outside: next sibling, else the item above, else the next item in
    /// document order.
    pub(crate) fn move_selection_away(&mut self, id: NodeId) {
        match self.selection {
            Some(selected) if self.is_ancestor(id, selected) => {}
            _ => return,
        }
        self.selection = self
            .next_sibling(id)
            .or_else(|| self.item_above(id))
            .or_else(|| self.item_after_subtree(id));
        if self.selection.is_none() {
            info!(node = %id, "removed the last selectable item from the tree");
        }
    }
}
