//! Flattened, keyed view of a connector schema document used for diffing.

use crate::identity::{component_groups, name_of, ComponentKey};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// One component in a [`ComponentMap`].
#[derive(Debug, Clone)]
pub struct ComponentEntry {
    pub key: ComponentKey,
    pub raw: Value,
    /// Names of the component's top-level config fields, in schema order.
    pub fields: Vec<String>,
}

impl ComponentEntry {
    /// The raw definition of a top-level field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        field_children(&self.key.component_type, &self.raw)
            .iter()
            .find(|f| name_of(f) == Some(name))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn status(&self) -> Option<&str> {
        self.raw.get("status").and_then(Value::as_str)
    }
}

/// Components keyed by `type:name`, iterable in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ComponentMap {
    entries: Vec<ComponentEntry>,
    index: HashMap<String, usize>,
}

impl ComponentMap {
    pub fn get(&self, key: &str) -> Option<&ComponentEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: ComponentEntry) {
        let key = entry.key.to_string();
        match self.index.get(&key) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// Builds a [`ComponentMap`] from a schema document. Components without a
/// `name` cannot be keyed and are dropped.
pub fn build_component_map(schema: &Value) -> ComponentMap {
    let mut map = ComponentMap::default();
    for (component_type, components) in component_groups(schema) {
        for component in components {
            let Some(name) = name_of(component) else {
                debug!(component_type = %component_type, "Skipping unnamed component");
                continue;
            };
            let fields = field_children(component_type, component)
                .iter()
                .filter_map(name_of)
                .map(str::to_string)
                .collect();
            map.insert(ComponentEntry {
                key: ComponentKey::new(component_type, name),
                raw: component.clone(),
                fields,
            });
        }
    }
    map
}

/// Top-level field definitions of a component: `children` for the special
/// `config` type, `config.children` otherwise.
pub fn field_children<'a>(component_type: &str, component: &'a Value) -> &'a [Value] {
    let children = if component_type == "config" {
        component.get("children")
    } else {
        component.get("config").and_then(|c| c.get("children"))
    };
    children
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
