//! # treesync - persistent UI trees over live documents
//!
//! treesync keeps a tree of UI nodes in step with a mutable hierarchical model.
//! When the model changes, the affected node is reconciled: children that still
//! denote the same model value keep their identity, expansion state and
//! selection, and only what actually changed is created or destroyed.
//!
//! ## Core Concepts
//!
//! - **NotificationHub**: priority-ordered observers of a single subject
//! - **ChangeContext**: what changed (basic, keyed/indexed, or scoped)
//! - **Tree**: arena of lazily expanded nodes mirroring a [`TreeSource`]
//! - **Reload**: the reconciliation pass that diffs children against the model
//! - **SyncedTree**: a tree wired to a [`Property`] document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treesync::{Property, SyncedTree, TreeConfig};
//!
//! let doc = Property::from_json(&serde_json::json!({"Pages": [{}, {}]}));
//! let synced = SyncedTree::new("doc", doc.clone(), TreeConfig::default());
//! synced.expand(synced.root())?;
//!
//! // Edits notify the tree, which reconciles the affected node.
//! doc.expect_dict()?.set("Title", Property::from_json(&"Report".into()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observer;
pub mod tree;

// Document model and binding
pub mod model;
pub mod sync;

pub use config::TreeConfig;
pub use error::{ModelError, ObserverError, ReconcileError, SyncError, SyncResult};
pub use model::{Array, Dict, Property, PropertySource, PropertyType};
pub use observer::{
    ChangeContext, ChangeContextType, FnObserver, NotificationHub, Observer, ObserverRegistry, Priority,
    SharedObserver, Subscription, ValueId,
};
pub use sync::SyncedTree;
pub use tree::{
    NodeId, NodeKind, NodeLifecycle, NodeRemoval, NodeState, ReloadFailure, ReloadOptions, ReloadReport, Tree,
    TreeId, TreeNode, TreeSnapshot, TreeSource, TreeWindow,
};
