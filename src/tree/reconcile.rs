//! Reconciliation of a node's children against the model.
//!
//! A pass walks the names the model currently expects, in model order, and for
//! each one decides whether the existing child can be reused as is, repointed
//! in place (deep reload), or must be replaced. Reused children are visited
//! recursively so nested structure stays fresh. Children whose names are no
//! longer expected are destroyed at the end, and the new child map replaces the
//! old one in a single step.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::ReconcileError;

use super::node::{NodeId, NodeKind};
use super::source::TreeSource;
use super::tree::Tree;

/// Flags of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReloadOptions {
    /// Refresh the node's own label before its children.
    pub reload_self: bool,
    /// Discard and recreate every child, bypassing reuse.
    pub force: bool,
}

impl ReloadOptions {
    /// Refresh the node itself and reconcile its children.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            reload_self: true,
            force: false,
        }
    }

    #[must_use]
    pub const fn children_only() -> Self {
        Self {
            reload_self: false,
            force: false,
        }
    }

    /// Cache-busting refresh: every child is recreated.
    #[must_use]
    pub const fn forced() -> Self {
        Self {
            reload_self: true,
            force: true,
        }
    }
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self::full()
    }
}

/// A subtree whose reconciliation failed during a pass over its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadFailure {
    /// Path of the node whose pass failed.
    pub path: String,
    /// Why it failed.
    pub error: ReconcileError,
}

/// What a pass did, summed over every node it visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadReport {
    /// Children materialized, replacements included.
    pub created: usize,
    /// Existing children kept.
    pub reused: usize,
    /// Reused children that changed position relative to their reused siblings.
    pub moved: usize,
    /// Reused children repointed at a new model value in place.
    pub deep_reloaded: usize,
    /// Existing children discarded and recreated under the same name.
    pub replaced: usize,
    /// Children destroyed because the model no longer lists them.
    pub deleted: usize,
    /// Paths of children that disappeared between enumeration and lookup.
    pub vanished: Vec<String>,
    /// Nested subtrees that could not be reconciled.
    pub failures: Vec<ReloadFailure>,
}

impl ReloadReport {
    /// True when no nested subtree failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when the pass changed nothing structurally.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.moved == 0
            && self.deep_reloaded == 0
            && self.replaced == 0
            && self.deleted == 0
            && self.vanished.is_empty()
    }
}

impl<M: TreeSource> Tree<M> {
    /// Bring the children of `id` back in sync with the model.
    ///
    /// Unparsed nodes only refresh whether they look expandable.
    ///
    /// # Errors
    /// `NodeNotFound` for unknown ids and `ReconciliationFailure` when the model
    /// lists a child of `id` that cannot be materialized. Failures deeper down are
    /// reported in [`ReloadReport::failures`] instead.
    pub fn reload(&mut self, id: NodeId, options: ReloadOptions) -> Result<ReloadReport, ReconcileError> {
        let mut report = ReloadReport::default();
        self.reconcile(id, options, &mut report)?;
        debug!(
            node = %id,
            created = report.created,
            reused = report.reused,
            deleted = report.deleted,
            failures = report.failures.len(),
            "reload finished"
        );
        Ok(report)
    }

    /// Refresh the node's own presentation.
    pub fn reload_self(&mut self, id: NodeId) -> Result<(), ReconcileError> {
        let node = self.get(id)?;
        let parent_kind = node.parent.and_then(|p| self.nodes.get(&p)).map(|p| p.kind);
        let label = self.source.label(parent_kind, &node.name, &node.value);
        self.get_mut(id)?.label = label;
        Ok(())
    }

    fn reconcile(&mut self, id: NodeId, options: ReloadOptions, report: &mut ReloadReport) -> Result<(), ReconcileError> {
        if options.reload_self {
            self.reload_self(id)?;
        }

        let node = self.get(id)?;
        let value = Rc::clone(&node.value);
        if !node.parsed {
            let expandable = node.kind.is_composite() && self.source.has_children(&value);
            self.get_mut(id)?.expandable = expandable;
            return Ok(());
        }

        let names = self.source.child_names(&value);
        let mut old = std::mem::take(&mut self.get_mut(id)?.children);
        let old_positions: HashMap<NodeId, usize> =
            old.values().enumerate().map(|(pos, child)| (*child, pos)).collect();
        let mut fresh: IndexMap<String, NodeId> = IndexMap::with_capacity(names.len());
        let mut last_reused_pos: Option<usize> = None;

        for name in names {
            if fresh.contains_key(&name) {
                warn!(node = %id, %name, "duplicate child name in enumeration, ignoring");
                continue;
            }
            let mut existing = old.swap_remove(&name);

            let Some(child_type) = self.source.child_type(&value, &name) else {
                let path = self.child_path(id, &name);
                debug!(%path, "child vanished during reconciliation");
                if let Some(stale) = existing {
                    self.delete_subtree(stale);
                    report.deleted += 1;
                }
                report.vanished.push(path);
                continue;
            };

            if let Some(current) = existing {
                let recorded = self.get(current)?.child_type.as_ref();
                if options.force {
                    existing = None;
                } else if recorded != Some(&child_type) {
                    trace!(node = %current, ?recorded, new = ?child_type, "child type changed");
                    existing = None;
                } else if !self.valid_child(&value, &name, current) {
                    if self.deep_reload_child(&value, &name, current)? {
                        report.deep_reloaded += 1;
                    } else {
                        existing = None;
                    }
                }
                if existing.is_none() {
                    self.delete_subtree(current);
                    report.replaced += 1;
                }
            }

            let child = if let Some(current) = existing {
                report.reused += 1;
                let pos = old_positions.get(&current).copied().unwrap_or_default();
                match last_reused_pos {
                    Some(last) if pos < last => report.moved += 1,
                    _ => last_reused_pos = Some(pos),
                }
                if let Err(error) = self.reconcile(current, ReloadOptions::children_only(), report) {
                    let path = self.path(current).unwrap_or_else(|_| self.child_path(id, &name));
                    warn!(%path, %error, "subtree reconciliation failed");
                    report.failures.push(ReloadFailure { path, error });
                }
                current
            } else if let Some(created) = self.create_child(id, &value, &name, child_type) {
                report.created += 1;
                created
            } else {
                let error = ReconcileError::ReconciliationFailure {
                    path: self.path(id)?,
                    name,
                };
                self.restore_children(id, fresh, old, &old_positions)?;
                return Err(error);
            };
            fresh.insert(name, child);
        }

        for (_, stale) in old {
            self.delete_subtree(stale);
            report.deleted += 1;
        }

        let node = self.get_mut(id)?;
        node.expandable = !fresh.is_empty();
        node.children = fresh;
        Ok(())
    }

    fn valid_child(&self, parent_value: &Rc<M::Value>, name: &str, child: NodeId) -> bool {
        let (Some(current), Some(node)) = (self.source.child(parent_value, name), self.nodes.get(&child)) else {
            return false;
        };
        self.source.same_value(&node.value, &current)
    }

    fn deep_reload_child(&mut self, parent_value: &Rc<M::Value>, name: &str, child: NodeId) -> Result<bool, ReconcileError> {
        let Some(current) = self.source.child(parent_value, name) else {
            return Ok(false);
        };
        let existing = Rc::clone(&self.get(child)?.value);
        if !self.source.deep_reload(name, &existing, &current) {
            return Ok(false);
        }
        trace!(node = %child, %name, "deep reload");
        self.repoint(child, current)?;
        Ok(true)
    }

    fn create_child(&mut self, parent: NodeId, parent_value: &Rc<M::Value>, name: &str, child_type: M::ChildType) -> Option<NodeId> {
        let value = self.source.child(parent_value, name)?;
        Some(self.alloc_node(Some(parent), name.to_string(), value, Some(child_type)))
    }

    /// Commit what a failed pass verified, keeping every unvisited old child.
    fn restore_children(
        &mut self,
        id: NodeId,
        mut fresh: IndexMap<String, NodeId>,
        old: IndexMap<String, NodeId>,
        old_positions: &HashMap<NodeId, usize>,
    ) -> Result<(), ReconcileError> {
        let mut leftover: Vec<(String, NodeId)> = old.into_iter().collect();
        leftover.sort_by_key(|(_, child)| old_positions.get(child).copied().unwrap_or(usize::MAX));
        for (name, child) in leftover {
            fresh.entry(name).or_insert(child);
        }
        let node = self.get_mut(id)?;
        node.expandable = !fresh.is_empty() || node.kind != NodeKind::Leaf;
        node.children = fresh;
        Ok(())
    }
}
