//! Notification hub: one subject, many prioritized observers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::ObserverError;

use super::context::ChangeContext;
use super::registry::{ObserverRegistry, SharedObserver};

/// Owns the observer registry of a single subject and dispatches changes to it.
///
/// Dispatch iterates over a snapshot taken when `notify_observers` starts, so an
/// observer may register or unregister observers (itself included) while being
/// notified. Such changes apply from the next notification on.
pub struct NotificationHub<T, S = ()> {
    observers: Rc<RefCell<ObserverRegistry<T, S>>>,
}

impl<T, S> NotificationHub<T, S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Rc::new(RefCell::new(ObserverRegistry::new())),
        }
    }

    /// Register an observer.
    ///
    /// Registering an observer that is already present is a no-op.
    ///
    /// # Errors
    /// `InvalidObserver` if no observer is supplied.
    pub fn register_observer(&self, observer: Option<SharedObserver<T, S>>) -> Result<(), ObserverError> {
        let observer = observer.ok_or(ObserverError::InvalidObserver)?;
        let priority = observer.priority();
        let inserted = self.observers.borrow_mut().insert(observer);
        trace!(priority, inserted, "observer registered");
        Ok(())
    }

    /// Unregister a previously registered observer.
    ///
    /// # Errors
    /// `UnknownObserver` if no observer is supplied or it is not registered.
    pub fn unregister_observer(&self, observer: Option<&SharedObserver<T, S>>) -> Result<(), ObserverError> {
        let observer = observer.ok_or(ObserverError::UnknownObserver)?;
        self.observers
            .borrow_mut()
            .remove(observer)
            .ok_or(ObserverError::UnknownObserver)?;
        trace!(priority = observer.priority(), "observer unregistered");
        Ok(())
    }

    /// Register an observer and get a guard that unregisters it when dropped.
    ///
    /// # Errors
    /// Never fails today; kept fallible to match `register_observer`.
    pub fn subscribe(&self, observer: SharedObserver<T, S>) -> Result<Subscription<T, S>, ObserverError> {
        self.register_observer(Some(Rc::clone(&observer)))?;
        Ok(Subscription {
            registry: Rc::downgrade(&self.observers),
            observer: Some(observer),
        })
    }

    /// Deliver a change to every registered observer in ascending priority.
    ///
    /// Returns the number of observers notified.
    pub fn notify_observers(&self, new_value: Option<Rc<T>>, context: &ChangeContext<T, S>) -> usize {
        let snapshot = self.observers.borrow().snapshot();
        trace!(
            observers = snapshot.len(),
            context = %context.context_type(),
            "dispatching change"
        );
        for observer in &snapshot {
            observer.notify(new_value.as_ref(), context);
        }
        snapshot.len()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    #[must_use]
    pub fn has_observer(&self, observer: &SharedObserver<T, S>) -> bool {
        self.observers.borrow().contains(observer)
    }
}

impl<T, S> Default for NotificationHub<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> fmt::Debug for NotificationHub<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Registration guard returned by [`NotificationHub::subscribe`].
///
/// Dropping the guard unregisters the observer. Both drop and `unsubscribe` are
/// idempotent and do nothing once the hub itself is gone.
pub struct Subscription<T, S = ()> {
    registry: Weak<RefCell<ObserverRegistry<T, S>>>,
    observer: Option<SharedObserver<T, S>>,
}

impl<T, S> Subscription<T, S> {
    /// The subscribed observer, until unsubscribed.
    #[must_use]
    pub fn observer(&self) -> Option<&SharedObserver<T, S>> {
        self.observer.as_ref()
    }

    /// Explicitly unregister. Returns true if the observer was still registered.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(observer) = self.observer.take() else {
            return false;
        };
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let Ok(mut registry) = registry.try_borrow_mut() else {
            return false;
        };
        registry.remove(&observer).is_some()
    }
}

impl<T, S> Drop for Subscription<T, S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T, S> fmt::Debug for Subscription<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.observer.is_some())
            .finish()
    }
}
