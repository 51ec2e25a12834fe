//! Change context payloads delivered alongside a notification.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Discriminator for [`ChangeContext`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeContextType {
    /// Only the prior value is known.
    Basic,
    /// Prior value plus the key of the changed part of a composite.
    Complex,
    /// Auxiliary scope data instead of a prior value.
    Scoped,
}

impl fmt::Display for ChangeContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Basic => "BasicChangeContext",
            Self::Complex => "ComplexChangeContext",
            Self::Scoped => "ScopedChangeContext",
        };
        f.write_str(name)
    }
}

/// Identifies which part of a composite value changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ValueId {
    /// Position inside an array-like value.
    Index(usize),
    /// Key inside a dictionary-like value.
    Name(String),
}

impl ValueId {
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(_) => None,
        }
    }

    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl From<usize> for ValueId {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ValueId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ValueId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// What kind of change a notification describes.
///
/// Exactly one variant is active. The payload is immutable once built; observers
/// receive it by reference and may clone the `Rc`s they want to keep.
#[derive(Debug)]
pub enum ChangeContext<T, S = ()> {
    /// The subject was replaced as a whole.
    Basic {
        /// Value before the change, if any.
        original: Option<Rc<T>>,
    },
    /// One element of a composite subject changed.
    Complex {
        /// Element before the change, `None` if it was added.
        original: Option<Rc<T>>,
        /// Key or index of the element.
        value_id: ValueId,
    },
    /// Change described by an opaque scope object.
    Scoped {
        /// Whatever the emitter considers the affected region.
        scope: Rc<S>,
    },
}

impl<T, S> ChangeContext<T, S> {
    /// Plain change, with the prior value if one existed.
    #[must_use]
    pub fn basic(original: Option<Rc<T>>) -> Self {
        Self::Basic { original }
    }

    /// Change to one member of a container, identified by `value_id`.
    #[must_use]
    pub fn complex(original: Option<Rc<T>>, value_id: impl Into<ValueId>) -> Self {
        Self::Complex {
            original,
            value_id: value_id.into(),
        }
    }

    /// Change confined to `scope`.
    #[must_use]
    pub fn scoped(scope: S) -> Self {
        Self::Scoped { scope: Rc::new(scope) }
    }

    /// Pure discriminator of the active variant.
    #[must_use]
    pub const fn context_type(&self) -> ChangeContextType {
        match self {
            Self::Basic { .. } => ChangeContextType::Basic,
            Self::Complex { .. } => ChangeContextType::Complex,
            Self::Scoped { .. } => ChangeContextType::Scoped,
        }
    }

    /// The value before the change. Scoped contexts carry none.
    #[must_use]
    pub const fn original_value(&self) -> Option<&Rc<T>> {
        match self {
            Self::Basic { original } | Self::Complex { original, .. } => original.as_ref(),
            Self::Scoped { .. } => None,
        }
    }

    /// The changed member. Only complex contexts carry one.
    #[must_use]
    pub const fn value_id(&self) -> Option<&ValueId> {
        match self {
            Self::Complex { value_id, .. } => Some(value_id),
            _ => None,
        }
    }

    /// The scope of a scoped context.
    #[must_use]
    pub const fn scope(&self) -> Option<&Rc<S>> {
        match self {
            Self::Scoped { scope } => Some(scope),
            _ => None,
        }
    }
}

impl<T, S> Clone for ChangeContext<T, S> {
    fn clone(&self) -> Self {
        match self {
            Self::Basic { original } => Self::Basic {
                original: original.clone(),
            },
            Self::Complex { original, value_id } => Self::Complex {
                original: original.clone(),
                value_id: value_id.clone(),
            },
            Self::Scoped { scope } => Self::Scoped {
                scope: Rc::clone(scope),
            },
        }
    }
}
