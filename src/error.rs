//! Error types for treesync.
//!
//! Errors are grouped by the layer that raises them. Registry misuse and
//! reconciliation failures indicate wiring bugs; model errors are data
//! conditions reported back to whoever attempted the edit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised by observer registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error("Invalid observer: no observer handle was supplied")]
    InvalidObserver,

    #[error("Unknown observer: the observer is not registered with this hub")]
    UnknownObserver,
}

/// Errors raised while reconciling or restructuring the tree.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileError {
    #[error("Reconciliation failed at '{path}': child '{name}' was announced but could not be materialized")]
    ReconciliationFailure {
        path: String,
        name: String,
    },

    #[error("Node not found: {id}")]
    NodeNotFound {
        id: NodeId,
    },

    #[error("Child index {index} is out of range at '{path}' (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Node '{path}' is not an indexed collection")]
    NotIndexed {
        path: String,
    },

    #[error("Cannot move children from {from} to {to}: one node contains the other")]
    InvalidMove {
        from: NodeId,
        to: NodeId,
    },
}

/// Errors raised by edits on the in-memory document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Array index {index} is out of range (len {len})")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    #[error("Dictionary key not found: '{key}'")]
    KeyNotFound {
        key: String,
    },

    #[error("Expected a composite value, found {actual}")]
    NotComposite {
        actual: String,
    },
}

/// Top-level error type for treesync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Observer error: {0}")]
    Observer(#[from] ObserverError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SyncError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is an observer registry error.
    #[must_use]
    pub const fn is_observer(&self) -> bool {
        matches!(self, Self::Observer(_))
    }

    /// Returns true if this is a reconciliation error.
    #[must_use]
    pub const fn is_reconcile(&self) -> bool {
        matches!(self, Self::Reconcile(_))
    }

    /// Returns true if this is a document edit error.
    #[must_use]
    pub const fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error points at a wiring bug rather than a data condition.
    ///
    /// Registry misuse and failed materialization both mean some collaborator
    /// broke its contract; presentation layers should report them as internal bugs.
    #[must_use]
    pub const fn is_bug(&self) -> bool {
        match self {
            Self::Observer(_) => true,
            Self::Reconcile(e) => matches!(e, ReconcileError::ReconciliationFailure { .. }),
            Self::Model(_) | Self::InvalidConfig { .. } => false,
            Self::Internal { .. } => true,
        }
    }
}

/// Result type alias for treesync operations.
pub type SyncResult<T> = Result<T, SyncError>;
