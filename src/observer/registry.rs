//! Priority-ordered observer storage.
//!
//! Observers are kept in a `BTreeMap` keyed by `(priority, sequence)` plus an
//! identity index, so insert, erase and membership checks are all logarithmic
//! (or better) instead of a linear scan followed by re-heapifying.
//!
//! The order of observers sharing a priority is unspecified. The current
//! implementation happens to serve them in registration order, but callers must
//! not depend on that.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::context::ChangeContext;

/// Observer priority. Lower values are served first.
pub type Priority = i32;

/// A listener interested in value changes of some subject.
pub trait Observer<T, S = ()> {
    /// Deliver a change. Implementations must not panic across this call.
    fn notify(&self, new_value: Option<&Rc<T>>, context: &ChangeContext<T, S>);

    /// Dispatch priority; read once when the observer is registered.
    fn priority(&self) -> Priority;
}

/// Shared observer handle. Identity is the allocation, not the value.
pub type SharedObserver<T, S = ()> = Rc<dyn Observer<T, S>>;

/// Identity of an observer allocation (thin data pointer address).
pub(crate) fn observer_key<T, S>(observer: &SharedObserver<T, S>) -> usize {
    Rc::as_ptr(observer).cast::<()>() as usize
}

/// Closure-backed observer.
pub struct FnObserver<F> {
    priority: Priority,
    callback: F,
}

impl<F> FnObserver<F> {
    #[must_use]
    pub const fn new(priority: Priority, callback: F) -> Self {
        Self { priority, callback }
    }
}

impl<T, S, F> Observer<T, S> for FnObserver<F>
where
    F: Fn(Option<&Rc<T>>, &ChangeContext<T, S>),
{
    fn notify(&self, new_value: Option<&Rc<T>>, context: &ChangeContext<T, S>) {
        (self.callback)(new_value, context);
    }

    fn priority(&self) -> Priority {
        self.priority
    }
}

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver").field("priority", &self.priority).finish_non_exhaustive()
    }
}

type SlotKey = (Priority, u64);

/// Ordered multiset of observers, unique by identity.
pub struct ObserverRegistry<T, S = ()> {
    ordered: BTreeMap<SlotKey, SharedObserver<T, S>>,
    index: HashMap<usize, SlotKey>,
    next_seq: u64,
}

impl<T, S> ObserverRegistry<T, S> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ordered: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn contains(&self, observer: &SharedObserver<T, S>) -> bool {
        self.index.contains_key(&observer_key(observer))
    }

    /// Insert an observer. Returns false (and changes nothing) if it is already present.
    pub fn insert(&mut self, observer: SharedObserver<T, S>) -> bool {
        let key = observer_key(&observer);
        if self.index.contains_key(&key) {
            return false;
        }
        let slot = (observer.priority(), self.next_seq);
        self.next_seq += 1;
        self.index.insert(key, slot);
        self.ordered.insert(slot, observer);
        true
    }

    /// Remove an observer by identity.
    pub fn remove(&mut self, observer: &SharedObserver<T, S>) -> Option<SharedObserver<T, S>> {
        let slot = self.index.remove(&observer_key(observer))?;
        self.ordered.remove(&slot)
    }

    /// Iterate in ascending priority.
    pub fn iter(&self) -> impl Iterator<Item = &SharedObserver<T, S>> {
        self.ordered.values()
    }

    /// Clone the handles in dispatch order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SharedObserver<T, S>> {
        self.ordered.values().cloned().collect()
    }

    /// Forget every observer.
    pub fn clear(&mut self) {
        self.ordered.clear();
        self.index.clear();
    }
}

impl<T, S> Default for ObserverRegistry<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> fmt::Debug for ObserverRegistry<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let priorities: Vec<Priority> = self.ordered.keys().map(|(p, _)| *p).collect();
        f.debug_struct("ObserverRegistry").field("priorities", &priorities).finish()
    }
}
