use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use treesync::{
    ChangeContext, FnObserver, NodeId, NodeKind, NodeRemoval, NodeState, ReconcileError, ReloadOptions, Tree,
    TreeSource, TreeWindow,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Model entity: `ty` 'd' is keyed, 'a' is indexed, anything else is a leaf.
/// `phantom` names a child that is listed and classified but never materializes.
struct Item {
    ty: Cell<char>,
    children: RefCell<Vec<(String, Rc<Item>)>>,
    phantom: RefCell<Option<String>>,
}

impl Item {
    fn with(ty: char, children: Vec<(String, Rc<Item>)>) -> Rc<Self> {
        Rc::new(Self {
            ty: Cell::new(ty),
            children: RefCell::new(children),
            phantom: RefCell::new(None),
        })
    }

    fn get(&self, name: &str) -> Option<Rc<Item>> {
        self.children.borrow().iter().find(|(n, _)| n == name).map(|(_, v)| Rc::clone(v))
    }

    fn put(&self, name: &str, value: Rc<Item>) {
        let mut children = self.children.borrow_mut();
        match children.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => children.push((name.to_string(), value)),
        }
    }

    fn drop_child(&self, name: &str) {
        self.children.borrow_mut().retain(|(n, _)| n != name);
    }
}

fn leaf(ty: char) -> Rc<Item> {
    Item::with(ty, Vec::new())
}

fn dict(entries: Vec<(&str, Rc<Item>)>) -> Rc<Item> {
    Item::with('d', entries.into_iter().map(|(n, v)| (n.to_string(), v)).collect())
}

fn array(items: Vec<Rc<Item>>) -> Rc<Item> {
    Item::with('a', items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect())
}

struct Mock;

impl TreeSource for Mock {
    type Value = Item;
    type ChildType = char;

    fn child_names(&self, parent: &Rc<Item>) -> Vec<String> {
        let mut names: Vec<String> = parent.children.borrow().iter().map(|(n, _)| n.clone()).collect();
        names.extend(parent.phantom.borrow().clone());
        names
    }

    fn child_type(&self, parent: &Rc<Item>, name: &str) -> Option<char> {
        if parent.phantom.borrow().as_deref() == Some(name) {
            return Some('x');
        }
        parent.get(name).map(|v| v.ty.get())
    }

    fn child(&self, parent: &Rc<Item>, name: &str) -> Option<Rc<Item>> {
        parent.get(name)
    }

    fn kind_of(&self, value: &Rc<Item>) -> NodeKind {
        match value.ty.get() {
            'd' => NodeKind::Keyed,
            'a' => NodeKind::Indexed,
            _ => NodeKind::Leaf,
        }
    }
}

fn child(tree: &Tree<Mock>, parent: NodeId, name: &str) -> NodeId {
    tree.node(parent).unwrap().child(name).unwrap()
}

fn names(tree: &Tree<Mock>, id: NodeId) -> Vec<String> {
    tree.node(id).unwrap().child_names().into_iter().map(str::to_string).collect()
}

#[test]
fn unchanged_children_keep_identity_and_state() {
    init_tracing();
    let model = dict(vec![("a", leaf('i')), ("b", dict(vec![("c", leaf('i'))]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let a = child(&tree, root, "a");
    let b = child(&tree, root, "b");
    tree.expand(b).unwrap();
    tree.select(b).unwrap();

    let report = tree.reload(root, ReloadOptions::full()).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.reused, 3);
    assert_eq!(child(&tree, root, "a"), a);
    assert_eq!(child(&tree, root, "b"), b);
    assert!(tree.node(b).unwrap().is_open());
    assert_eq!(tree.selection(), Some(b));
}

#[test]
fn children_follow_model_order() {
    init_tracing();
    let model = dict(vec![("a", leaf('i')), ("b", leaf('i')), ("c", leaf('i'))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let before: Vec<NodeId> = tree.children(root).unwrap();

    model.children.borrow_mut().reverse();
    model.put("d", leaf('s'));
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();

    assert_eq!(names(&tree, root), vec!["c", "b", "a", "d"]);
    assert_eq!(report.created, 1);
    assert_eq!(report.reused, 3);
    let after = tree.children(root).unwrap();
    assert_eq!(&after[..3], &[before[2], before[1], before[0]]);
}

#[test]
fn type_change_replaces_the_node() {
    init_tracing();
    let value = leaf('i');
    let model = dict(vec![("a", Rc::clone(&value))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let old = child(&tree, root, "a");

    // Same model entity, new classification.
    value.ty.set('s');
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();

    let new = child(&tree, root, "a");
    assert_ne!(old, new);
    assert_eq!(tree.node_state(old), NodeState::Deleted);
    assert_eq!(tree.node(new).unwrap().child_type(), Some(&'s'));
    assert_eq!((report.replaced, report.created), (1, 1));
}

#[test]
fn replaced_value_recreates_without_deep_reload() {
    init_tracing();
    let model = dict(vec![("a", leaf('i'))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let old = child(&tree, root, "a");

    model.put("a", leaf('i'));
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();
    assert_ne!(child(&tree, root, "a"), old);
    assert_eq!(report.deep_reloaded, 0);
    assert_eq!(report.replaced, 1);
}

#[test]
fn forced_reload_recreates_every_child() {
    init_tracing();
    let model = dict(vec![("a", leaf('i')), ("b", dict(vec![("c", leaf('i'))]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let before = tree.children(root).unwrap();

    let report = tree.reload(root, ReloadOptions::forced()).unwrap();
    let after = tree.children(root).unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|id| !before.contains(id)));
    assert_eq!(report.created, 2);
    assert_eq!(report.replaced, 2);
    assert_eq!(names(&tree, root), vec!["a", "b"]);
}

#[test]
fn vanished_names_are_pruned_with_their_subtrees() {
    init_tracing();
    let model = dict(vec![("a", leaf('i')), ("b", dict(vec![("c", leaf('i'))]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let b = child(&tree, root, "b");
    tree.expand(b).unwrap();
    let c = child(&tree, b, "c");
    assert_eq!(tree.len(), 4);

    model.drop_child("b");
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.node_state(b), NodeState::Deleted);
    assert_eq!(tree.node_state(c), NodeState::Deleted);
    assert_eq!(names(&tree, root), vec!["a"]);
}

#[test]
fn index_removal_shifts_names_and_moves_selection() {
    init_tracing();
    let model = array((0..5).map(|_| leaf('i')).collect());
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let ids = tree.children(root).unwrap();
    tree.select(ids[2]).unwrap();

    let removed = tree.remove_child_preserving_selection(root, 2).unwrap();
    assert_eq!(removed, Some(ids[2]));
    assert_eq!(tree.selection(), Some(ids[3]));
    assert_eq!(names(&tree, root), vec!["0", "1", "2", "3"]);
    assert_eq!(tree.node(ids[3]).unwrap().name(), "2");

    // Now the model catches up; every survivor still matches.
    let items: Vec<Rc<Item>> = {
        let mut items: Vec<Rc<Item>> = model.children.borrow().iter().map(|(_, v)| Rc::clone(v)).collect();
        items.remove(2);
        items
    };
    *model.children.borrow_mut() = items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect();
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.reused, 4);
    assert_eq!(tree.children(root).unwrap(), vec![ids[0], ids[1], ids[3], ids[4]]);
    assert_eq!(tree.selection(), Some(ids[3]));
}

#[test]
fn index_removal_rejects_bad_targets() {
    init_tracing();
    let model = dict(vec![("list", array(vec![leaf('i')]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let list = child(&tree, root, "list");

    assert!(matches!(
        tree.remove_child_preserving_selection(root, 0),
        Err(ReconcileError::NotIndexed { .. })
    ));
    assert_eq!(tree.remove_child_preserving_selection(list, 0), Ok(None), "unparsed arrays have nothing to shift");

    tree.expand(list).unwrap();
    assert_eq!(
        tree.remove_child_preserving_selection(list, 3),
        Err(ReconcileError::IndexOutOfRange {
            path: "root/list".to_string(),
            index: 3,
            len: 1,
        })
    );
}

#[test]
fn unmaterializable_child_fails_the_pass() {
    init_tracing();
    let model = dict(vec![("a", leaf('i')), ("b", leaf('i'))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let before = tree.children(root).unwrap();

    *model.phantom.borrow_mut() = Some("ghost".to_string());
    let err = tree.reload(root, ReloadOptions::children_only()).unwrap_err();
    assert_eq!(
        err,
        ReconcileError::ReconciliationFailure {
            path: "root".to_string(),
            name: "ghost".to_string(),
        }
    );
    assert_eq!(tree.children(root).unwrap(), before);
}

#[test]
fn nested_failure_is_recorded_and_siblings_continue() {
    init_tracing();
    let inner = dict(vec![("x", leaf('i'))]);
    let model = dict(vec![("a", Rc::clone(&inner)), ("b", leaf('i'))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let a = child(&tree, root, "a");
    tree.expand(a).unwrap();

    *inner.phantom.borrow_mut() = Some("ghost".to_string());
    model.put("c", leaf('i'));
    let report = tree.reload(root, ReloadOptions::children_only()).unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "root/a");
    assert!(matches!(report.failures[0].error, ReconcileError::ReconciliationFailure { .. }));
    assert_eq!(names(&tree, root), vec!["a", "b", "c"]);
    assert_eq!(names(&tree, a), vec!["x"]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["created"], 1);
    assert_eq!(json["failures"][0]["path"], "root/a");
    assert_eq!(json["failures"][0]["error"]["kind"], "reconciliation_failure");
    assert_eq!(json["failures"][0]["error"]["name"], "ghost");
    let back: treesync::ReloadReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn children_move_between_nodes_with_identity() {
    init_tracing();
    let src = dict(vec![("x", leaf('i')), ("y", dict(vec![]))]);
    let dst = dict(vec![("z", leaf('i'))]);
    let model = dict(vec![("src", src), ("dst", dst)]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let s = child(&tree, root, "src");
    let d = child(&tree, root, "dst");
    tree.expand(s).unwrap();
    tree.expand(d).unwrap();
    let moved = tree.children(s).unwrap();
    let z = child(&tree, d, "z");

    tree.move_all_children_from(d, s).unwrap();
    assert_eq!(tree.children(d).unwrap(), moved);
    assert!(tree.children(s).unwrap().is_empty());
    assert_eq!(tree.node_state(z), NodeState::Deleted);
    assert_eq!(tree.node(moved[0]).unwrap().parent(), Some(d));
    assert_eq!(tree.path(moved[1]).unwrap(), "root/dst/y");

    assert_eq!(
        tree.move_all_children_from(d, root),
        Err(ReconcileError::InvalidMove { from: root, to: d })
    );
}

#[test]
fn paths_resolve_lazily() {
    init_tracing();
    let model = dict(vec![("b", dict(vec![("list", array(vec![leaf('i'), leaf('s')]))]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    assert_eq!(tree.len(), 1);

    let id = tree.resolve_path("root/b/list/1").unwrap().unwrap();
    assert_eq!(tree.path(id).unwrap(), "root/b/list/1");
    assert_eq!(tree.node(id).unwrap().child_type(), Some(&'s'));
    assert_eq!(tree.resolve_path("root/b/missing").unwrap(), None);
    assert_eq!(tree.resolve_path("other/b").unwrap(), None);

    let b = child(&tree, tree.root(), "b");
    assert_eq!(tree.lookup_child(b, "list").unwrap(), tree.node(b).unwrap().child("list"));
}

struct Window {
    deleted: RefCell<Vec<String>>,
}

impl TreeWindow for Window {
    fn delete_notify(&self, _node: NodeId, path: &str) {
        self.deleted.borrow_mut().push(path.to_string());
    }
}

#[test]
fn teardown_notifies_window_and_hub_for_every_node() {
    init_tracing();
    let model = dict(vec![("a", dict(vec![("x", leaf('i'))])), ("b", leaf('i'))]);
    let window = Rc::new(Window {
        deleted: RefCell::new(Vec::new()),
    });
    let handle: Rc<dyn TreeWindow> = window.clone();
    let removals: Rc<RefCell<Vec<String>>> = Rc::default();

    {
        let mut tree = Tree::new(Mock, "root", Rc::clone(&model)).with_window(&handle);
        let sink = Rc::clone(&removals);
        tree.deletion_hub()
            .register_observer(Some(Rc::new(FnObserver::new(
                0,
                move |_: Option<&Rc<NodeId>>, ctx: &ChangeContext<NodeId, NodeRemoval>| {
                    if let Some(scope) = ctx.scope() {
                        sink.borrow_mut().push(scope.path.clone());
                    }
                },
            ))))
            .unwrap();
        let root = tree.root();
        tree.expand(root).unwrap();
        let a = child(&tree, root, "a");
        tree.expand(a).unwrap();

        model.drop_child("b");
        tree.reload(root, ReloadOptions::children_only()).unwrap();
        assert_eq!(*window.deleted.borrow(), vec!["root/b"]);
    }

    let expected = vec!["root/b", "root", "root/a", "root/a/x"];
    assert_eq!(*window.deleted.borrow(), expected);
    assert_eq!(*removals.borrow(), expected);
}

#[test]
fn collapse_keeps_materialized_children() {
    init_tracing();
    let model = dict(vec![("b", dict(vec![("c", leaf('i')), ("d", leaf('i'))]))]);
    let mut tree = Tree::new(Mock, "root", Rc::clone(&model));
    let root = tree.root();
    tree.expand(root).unwrap();
    let b = child(&tree, root, "b");
    tree.expand(b).unwrap();
    let kids = tree.children(b).unwrap();

    tree.collapse(b).unwrap();
    assert!(!tree.node(b).unwrap().is_open());
    assert_eq!(tree.children(b).unwrap(), kids);
    assert_eq!(tree.node_state(b), NodeState::Parsed);

    let report = tree.expand(b).unwrap();
    assert!(report.is_noop());
    assert_eq!(tree.children(b).unwrap(), kids);
}
