//! Persistent UI tree mirroring a hierarchical model.
//!
//! Nodes live in an arena owned by [`Tree`] and are addressed by [`NodeId`].
//! Children are materialized lazily on first expansion and afterwards kept in
//! sync by [`Tree::reload`], which preserves node identity, expansion state and
//! selection for everything the model did not actually change.

/// Node, id and snapshot types.
pub mod node;
/// The reconciliation pass.
pub mod reconcile;
/// Selection tracking and visible-order traversal.
pub mod selection;
/// Model and presentation collaborator traits.
pub mod source;
#[allow(clippy::module_inception)]
mod tree;

pub use node::{NodeId, NodeKind, NodeState, TreeId, TreeNode, TreeSnapshot};
pub use reconcile::{ReloadFailure, ReloadOptions, ReloadReport};
pub use source::{NodeLifecycle, NodeRemoval, TreeSource, TreeWindow};
pub use tree::Tree;
