//! Dictionary/array document values.
//!
//! Composite values keep their contents behind a `RefCell` so they can be
//! edited through shared references, and each owns a [`NotificationHub`].
//! Every edit notifies after the contents borrow is released, so observers may
//! read the value they are told about.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::observer::{ChangeContext, NotificationHub, ValueId};

/// Classification of a [`Property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PropertyType {
    Null,
    Bool,
    Int,
    Real,
    String,
    Array,
    Dict,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Real => "real",
            Self::String => "string",
            Self::Array => "array",
            Self::Dict => "dict",
        };
        f.write_str(name)
    }
}

/// A document value. Shared as `Rc<Property>`; identity is the allocation.
#[derive(Debug)]
pub enum Property {
    /// Explicit null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Real(f64),
    /// String scalar.
    String(String),
    /// Ordered list; children are named by index.
    Array(Array),
    /// Ordered mapping; children are named by key.
    Dict(Dict),
}

impl Property {
    /// Type tag, recorded by tree nodes to detect kind changes.
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::Null => PropertyType::Null,
            Self::Bool(_) => PropertyType::Bool,
            Self::Int(_) => PropertyType::Int,
            Self::Real(_) => PropertyType::Real,
            Self::String(_) => PropertyType::String,
            Self::Array(_) => PropertyType::Array,
            Self::Dict(_) => PropertyType::Dict,
        }
    }

    /// Scalars are "simple"; composites are not.
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Dict(_))
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Array view, or `NotComposite` naming the actual type.
    pub fn expect_array(&self) -> Result<&Array, ModelError> {
        self.as_array().ok_or_else(|| ModelError::NotComposite {
            actual: self.property_type().to_string(),
        })
    }

    /// Dictionary view, or `NotComposite` naming the actual type.
    pub fn expect_dict(&self) -> Result<&Dict, ModelError> {
        self.as_dict().ok_or_else(|| ModelError::NotComposite {
            actual: self.property_type().to_string(),
        })
    }

    /// Change hub of a composite value.
    #[must_use]
    pub const fn hub(&self) -> Option<&NotificationHub<Property>> {
        match self {
            Self::Array(a) => Some(&a.hub),
            Self::Dict(d) => Some(&d.hub),
            _ => None,
        }
    }

    /// Build a value tree from JSON. Objects keep their key order.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Rc<Self> {
        let property = match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(Array::from_items(items.iter().map(Self::from_json).collect()))
            }
            serde_json::Value::Object(map) => Self::Dict(Dict::from_entries(
                map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect(),
            )),
        };
        Rc::new(property)
    }

    /// Current contents as JSON. Non-finite reals become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(a) => serde_json::Value::Array(a.items().iter().map(|p| p.to_json()).collect()),
            Self::Dict(d) => serde_json::Value::Object(
                d.entries().into_iter().map(|(k, v)| (k, v.to_json())).collect(),
            ),
        }
    }

    /// Short human-readable rendering of scalars.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Real(r) => r.to_string(),
            Self::String(s) => format!("{s:?}"),
            Self::Array(a) => format!("[{} items]", a.len()),
            Self::Dict(d) => format!("<<{} entries>>", d.len()),
        }
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Array> for Property {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

impl From<Dict> for Property {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

/// Ordered list of values.
#[derive(Debug, Default)]
pub struct Array {
    items: RefCell<Vec<Rc<Property>>>,
    hub: NotificationHub<Property>,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_items(items: Vec<Rc<Property>>) -> Self {
        Self {
            items: RefCell::new(items),
            hub: NotificationHub::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Rc<Property>> {
        self.items.borrow().get(index).cloned()
    }

    /// Snapshot of the current items.
    #[must_use]
    pub fn items(&self) -> Vec<Rc<Property>> {
        self.items.borrow().clone()
    }

    #[must_use]
    pub const fn hub(&self) -> &NotificationHub<Property> {
        &self.hub
    }

    pub fn push(&self, value: Rc<Property>) {
        let index = {
            let mut items = self.items.borrow_mut();
            items.push(Rc::clone(&value));
            items.len() - 1
        };
        self.changed(Some(value), None, index);
    }

    /// Insert at `index`, shifting later items up.
    pub fn insert(&self, index: usize, value: Rc<Property>) -> Result<(), ModelError> {
        {
            let mut items = self.items.borrow_mut();
            if index > items.len() {
                return Err(ModelError::IndexOutOfRange { index, len: items.len() });
            }
            items.insert(index, Rc::clone(&value));
        }
        self.changed(Some(value), None, index);
        Ok(())
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: Rc<Property>) -> Result<Rc<Property>, ModelError> {
        let previous = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            let slot = items.get_mut(index).ok_or(ModelError::IndexOutOfRange { index, len })?;
            std::mem::replace(slot, Rc::clone(&value))
        };
        self.changed(Some(value), Some(Rc::clone(&previous)), index);
        Ok(previous)
    }

    /// Remove the item at `index`, shifting later items down.
    pub fn remove(&self, index: usize) -> Result<Rc<Property>, ModelError> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Err(ModelError::IndexOutOfRange { index, len: items.len() });
            }
            items.remove(index)
        };
        self.changed(None, Some(Rc::clone(&removed)), index);
        Ok(removed)
    }

    fn changed(&self, new_value: Option<Rc<Property>>, original: Option<Rc<Property>>, index: usize) {
        self.hub
            .notify_observers(new_value, &ChangeContext::complex(original, ValueId::Index(index)));
    }
}

/// Ordered mapping from names to values.
#[derive(Debug, Default)]
pub struct Dict {
    entries: RefCell<IndexMap<String, Rc<Property>>>,
    hub: NotificationHub<Property>,
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: IndexMap<String, Rc<Property>>) -> Self {
        Self {
            entries: RefCell::new(entries),
            hub: NotificationHub::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Rc<Property>> {
        self.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the current entries, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Rc<Property>)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), Rc::clone(v)))
            .collect()
    }

    #[must_use]
    pub const fn hub(&self) -> &NotificationHub<Property> {
        &self.hub
    }

    /// Insert or replace. New keys are appended; replaced keys keep their position.
    pub fn set(&self, key: impl Into<String>, value: Rc<Property>) -> Option<Rc<Property>> {
        let key = key.into();
        let previous = self.entries.borrow_mut().insert(key.clone(), Rc::clone(&value));
        self.changed(Some(value), previous.clone(), key);
        previous
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&self, key: &str) -> Result<Rc<Property>, ModelError> {
        let removed = self
            .entries
            .borrow_mut()
            .shift_remove(key)
            .ok_or_else(|| ModelError::KeyNotFound { key: key.to_string() })?;
        self.changed(None, Some(Rc::clone(&removed)), key.to_string());
        Ok(removed)
    }

    fn changed(&self, new_value: Option<Rc<Property>>, original: Option<Rc<Property>>, key: String) {
        self.hub
            .notify_observers(new_value, &ChangeContext::complex(original, ValueId::Name(key)));
    }
}
