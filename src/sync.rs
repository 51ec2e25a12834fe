//! Binding between a [`Property`] document and its tree.
//!
//! Every node showing a composite value registers an observer on that value's
//! hub. A change queues the node for a children-only reload. Queued reloads run
//! as soon as the tree is free: immediately when the edit happened outside any
//! tree operation, or right after the operation that was in progress.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use crate::config::TreeConfig;
use crate::error::{ModelError, ReconcileError, SyncError, SyncResult};
use crate::model::{Property, PropertySource};
use crate::observer::{ChangeContext, Observer, Priority, SharedObserver};
use crate::tree::{NodeId, NodeLifecycle, ReloadOptions, ReloadReport, Tree, TreeSnapshot};

type SharedTree = Rc<RefCell<Tree<PropertySource>>>;

/// A tree kept in sync with a live document.
///
/// The tree sits behind a `RefCell`; use [`SyncedTree::with_tree`] and
/// [`SyncedTree::with_tree_mut`] for anything not wrapped here. Model edits made
/// while the tree is borrowed are applied when the borrow ends.
pub struct SyncedTree {
    tree: SharedTree,
    binder: Rc<Binder>,
    root: NodeId,
    root_value: Rc<Property>,
}

impl SyncedTree {
    /// Mirror `root`, which must stay alive as long as the tree observes it.
    pub fn new(root_name: impl Into<String>, root: Rc<Property>, config: TreeConfig) -> Self {
        let priority = config.observer_priority;
        let tree: SharedTree = Rc::new(RefCell::new(Tree::new(
            PropertySource::new(config),
            root_name,
            Rc::clone(&root),
        )));
        let binder = Rc::new_cyclic(|me| Binder {
            me: me.clone(),
            tree: Rc::downgrade(&tree),
            priority: Cell::new(priority),
            watches: RefCell::new(HashMap::new()),
            pending: RefCell::new(VecDeque::new()),
        });
        let hook: Rc<dyn NodeLifecycle<Property>> = binder.clone();
        let root_id = {
            let mut guard = tree.borrow_mut();
            guard.set_lifecycle(hook);
            guard.root()
        };
        Self {
            tree,
            binder,
            root: root_id,
            root_value: root,
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub const fn root_value(&self) -> &Rc<Property> {
        &self.root_value
    }

    /// Read access to the tree. Reloads queued meanwhile run afterwards.
    ///
    /// # Errors
    /// `Internal` if the tree is mutably borrowed, i.e. when called from inside
    /// [`SyncedTree::with_tree_mut`].
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree<PropertySource>) -> R) -> SyncResult<R> {
        let result = {
            let tree = self.tree.try_borrow().map_err(|_| busy())?;
            f(&tree)
        };
        self.flush();
        Ok(result)
    }

    /// Write access to the tree. Reloads queued meanwhile run afterwards.
    ///
    /// # Errors
    /// `Internal` if the tree is already borrowed.
    pub fn with_tree_mut<R>(&self, f: impl FnOnce(&mut Tree<PropertySource>) -> R) -> SyncResult<R> {
        let result = {
            let mut tree = self.tree.try_borrow_mut().map_err(|_| busy())?;
            f(&mut tree)
        };
        self.flush();
        Ok(result)
    }

    /// Open a node, materializing its children on first expansion.
    pub fn expand(&self, id: NodeId) -> SyncResult<ReloadReport> {
        self.with_tree_mut(|tree| tree.expand(id))?.map_err(SyncError::from)
    }

    /// Reconcile `id` against the document.
    pub fn reload(&self, id: NodeId, options: ReloadOptions) -> SyncResult<ReloadReport> {
        self.with_tree_mut(|tree| tree.reload(id, options))?.map_err(SyncError::from)
    }

    /// Run every queued reload. Returns how many nodes were reloaded.
    pub fn flush(&self) -> usize {
        self.binder.drain()
    }

    /// Reloads waiting for the tree to become free.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.binder.pending.borrow().len()
    }

    /// Number of nodes currently observing their model value.
    #[must_use]
    pub fn observed_nodes(&self) -> usize {
        self.binder.watches.borrow().len()
    }

    /// Remove element `index` of the array shown by `node`.
    ///
    /// The tree shifts its children first, moving the selection off the
    /// removed item; the model's change notification then finds every
    /// surviving node still valid and reuses it.
    ///
    /// # Errors
    /// `NotIndexed` for nodes that do not show an array. `IndexOutOfRange`
    /// from the model when the array has no such element; the tree is left
    /// untouched in that case.
    pub fn remove_array_item(&self, node: NodeId, index: usize) -> SyncResult<Option<NodeId>> {
        let value = self
            .with_tree(|tree| tree.node(node).map(|n| Rc::clone(n.value())))?
            .ok_or(ReconcileError::NodeNotFound { id: node })?;
        if let Some(array) = value.as_array() {
            let len = array.len();
            if index >= len {
                return Err(ModelError::IndexOutOfRange { index, len }.into());
            }
        }
        let removed = self.with_tree_mut(|tree| tree.remove_child_preserving_selection(node, index))??;
        value.expect_array()?.remove(index)?;
        self.flush();
        Ok(removed)
    }

    /// Apply a new configuration and reconcile the whole materialized tree.
    ///
    /// The observer priority only affects observers registered afterwards.
    pub fn reconfigure(&self, config: TreeConfig) -> SyncResult<ReloadReport> {
        self.binder.priority.set(config.observer_priority);
        self.with_tree_mut(|tree| {
            tree.source_mut().set_config(config);
            let root = tree.root();
            tree.reload(root, ReloadOptions::full())
        })?
        .map_err(SyncError::from)
    }

    /// Slash-joined names from the root down to `id`.
    pub fn path(&self, id: NodeId) -> SyncResult<String> {
        self.with_tree(|tree| tree.path(id))?.map_err(SyncError::from)
    }

    /// Snapshot of the whole materialized tree.
    pub fn snapshot(&self) -> SyncResult<TreeSnapshot> {
        self.with_tree(|tree| tree.snapshot(tree.root()))?.map_err(SyncError::from)
    }
}

impl fmt::Debug for SyncedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedTree")
            .field("tree", &self.tree)
            .field("observed_nodes", &self.observed_nodes())
            .field("pending", &self.pending())
            .finish()
    }
}

fn busy() -> SyncError {
    SyncError::internal("tree is already borrowed")
}

struct Watch {
    value: Rc<Property>,
    observer: SharedObserver<Property>,
}

/// Lifecycle hook that keeps one model observer per composite node.
struct Binder {
    me: Weak<Binder>,
    tree: Weak<RefCell<Tree<PropertySource>>>,
    priority: Cell<Priority>,
    watches: RefCell<HashMap<NodeId, Watch>>,
    pending: RefCell<VecDeque<NodeId>>,
}

impl Binder {
    fn schedule(&self, node: NodeId) {
        {
            let mut pending = self.pending.borrow_mut();
            if !pending.contains(&node) {
                pending.push_back(node);
            }
        }
        self.drain();
    }

    fn drain(&self) -> usize {
        let Some(tree) = self.tree.upgrade() else {
            self.pending.borrow_mut().clear();
            return 0;
        };
        let Ok(mut tree) = tree.try_borrow_mut() else {
            debug!(pending = self.pending.borrow().len(), "tree busy, deferring reload");
            return 0;
        };

        let mut reloaded = 0;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(node) = next else {
                break;
            };
            if !tree.contains(node) {
                trace!(node = %node, "dropping reload of deleted node");
                continue;
            }
            match tree.reload(node, ReloadOptions::children_only()) {
                Ok(report) => {
                    for failure in &report.failures {
                        error!(path = %failure.path, error = %failure.error, "nested reload failed");
                    }
                }
                Err(error) => error!(node = %node, %error, "reload after model change failed"),
            }
            reloaded += 1;
        }
        reloaded
    }
}

impl NodeLifecycle<Property> for Binder {
    fn attached(&self, node: NodeId, value: &Rc<Property>) {
        let Some(hub) = value.hub() else {
            return;
        };
        let observer: SharedObserver<Property> = Rc::new(ReloadObserver {
            node,
            binder: self.me.clone(),
            priority: self.priority.get(),
        });
        if let Err(error) = hub.register_observer(Some(Rc::clone(&observer))) {
            error!(node = %node, %error, "could not observe model value");
            return;
        }
        let previous = self.watches.borrow_mut().insert(
            node,
            Watch {
                value: Rc::clone(value),
                observer,
            },
        );
        if let Some(previous) = previous {
            release(node, &previous);
        }
    }

    fn detached(&self, node: NodeId, _value: &Rc<Property>) {
        let watch = self.watches.borrow_mut().remove(&node);
        if let Some(watch) = watch {
            release(node, &watch);
        }
    }
}

fn release(node: NodeId, watch: &Watch) {
    if let Some(hub) = watch.value.hub() {
        if let Err(error) = hub.unregister_observer(Some(&watch.observer)) {
            error!(node = %node, %error, "model observer was already gone");
        }
    }
}

/// Queues a reload of one node whenever its value changes.
struct ReloadObserver {
    node: NodeId,
    binder: Weak<Binder>,
    priority: Priority,
}

impl Observer<Property> for ReloadObserver {
    fn notify(&self, _new_value: Option<&Rc<Property>>, context: &ChangeContext<Property>) {
        trace!(node = %self.node, context = %context.context_type(), "model changed");
        if let Some(binder) = self.binder.upgrade() {
            binder.schedule(self.node);
        }
    }

    fn priority(&self) -> Priority {
        self.priority
    }
}
