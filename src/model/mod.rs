//! In-memory dictionary/array document.
//!
//! Composite values notify their observers on every edit, which is what keeps
//! a [`SyncedTree`](crate::sync::SyncedTree) current.

/// Values, arrays and dictionaries.
pub mod property;
/// Tree adapter.
pub mod source;

pub use property::{Array, Dict, Property, PropertyType};
pub use source::PropertySource;
