//! Adapter exposing a [`Property`] document to the tree.

use std::rc::Rc;

use crate::config::TreeConfig;
use crate::tree::{NodeKind, TreeSource};

use super::property::{Property, PropertyType};

/// [`TreeSource`] over dictionaries and arrays.
///
/// Dictionary keys and array indices become child names. Scalars are hidden
/// unless `show_simple` is set.
#[derive(Debug, Clone, Default)]
pub struct PropertySource {
    config: TreeConfig,
}

impl PropertySource {
    #[must_use]
    pub const fn new(config: TreeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TreeConfig) {
        self.config = config;
    }

    fn visible(&self, value: &Property) -> bool {
        self.config.show_simple || !value.is_simple()
    }
}

impl TreeSource for PropertySource {
    type Value = Property;
    type ChildType = PropertyType;

    fn child_names(&self, parent: &Rc<Property>) -> Vec<String> {
        match &**parent {
            Property::Dict(dict) => dict
                .entries()
                .into_iter()
                .filter(|(_, value)| self.visible(value))
                .map(|(key, _)| key)
                .collect(),
            Property::Array(array) => array
                .items()
                .iter()
                .enumerate()
                .filter(|(_, value)| self.visible(value))
                .map(|(index, _)| index.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn child_type(&self, parent: &Rc<Property>, name: &str) -> Option<PropertyType> {
        self.child(parent, name).map(|value| value.property_type())
    }

    fn child(&self, parent: &Rc<Property>, name: &str) -> Option<Rc<Property>> {
        match &**parent {
            Property::Dict(dict) => dict.get(name),
            Property::Array(array) => name.parse().ok().and_then(|index| array.get(index)),
            _ => None,
        }
    }

    fn has_children(&self, value: &Rc<Property>) -> bool {
        match &**value {
            Property::Dict(dict) if self.config.show_simple => !dict.is_empty(),
            Property::Array(array) if self.config.show_simple => !array.is_empty(),
            Property::Dict(dict) => dict.entries().iter().any(|(_, v)| !v.is_simple()),
            Property::Array(array) => array.items().iter().any(|v| !v.is_simple()),
            _ => false,
        }
    }

    fn kind_of(&self, value: &Rc<Property>) -> NodeKind {
        match **value {
            Property::Dict(_) => NodeKind::Keyed,
            Property::Array(_) => NodeKind::Indexed,
            _ => NodeKind::Leaf,
        }
    }

    fn label(&self, parent_kind: Option<NodeKind>, name: &str, _value: &Rc<Property>) -> String {
        match parent_kind {
            Some(NodeKind::Indexed) => format!("[{name}]"),
            _ => name.to_string(),
        }
    }

    fn deep_reload(&self, _name: &str, existing: &Rc<Property>, current: &Rc<Property>) -> bool {
        self.config.deep_reload && existing.property_type() == current.property_type()
    }
}
