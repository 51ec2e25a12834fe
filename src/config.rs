//! Tree presentation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::observer::Priority;

/// Settings of a document tree.
///
/// Missing fields fall back to their defaults when deserialized, so hosts can
/// persist only what the user changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Show scalar values as tree items. When off only composites are listed.
    pub show_simple: bool,
    /// Repoint a same-typed node at a replaced value instead of recreating it,
    /// keeping its expansion state and descendants.
    pub deep_reload: bool,
    /// Priority of the observers the tree registers on model values.
    pub observer_priority: Priority,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            show_simple: true,
            deep_reload: false,
            observer_priority: 0,
        }
    }
}

impl TreeConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    /// `InvalidConfig` if the text is not a JSON object with the expected field types.
    pub fn from_json_str(text: &str) -> SyncResult<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::InvalidConfig {
            reason: format!("invalid tree config: {e}"),
        })
    }
}
