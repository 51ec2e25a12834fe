//! Typed, priority-ordered change notification.
//!
//! A subject owns a [`NotificationHub`]; interested parties register
//! [`Observer`]s with a priority and receive every change together with a
//! [`ChangeContext`] describing it.

/// Change payload variants.
pub mod context;
/// Dispatch hub and subscription guards.
pub mod hub;
/// Observer trait and priority-ordered storage.
pub mod registry;

pub use context::{ChangeContext, ChangeContextType, ValueId};
pub use hub::{NotificationHub, Subscription};
pub use registry::{FnObserver, Observer, ObserverRegistry, Priority, SharedObserver};
