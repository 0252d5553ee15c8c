//! Identity keys for components: the `type:name` string used to correlate
//! the same connector across schema versions and across binary inventories.
//!
//! The exact format is shared with stored diff artifacts and must not change.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// `type:name` identity of a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    pub component_type: String,
    pub name: String,
}

impl ComponentKey {
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component_type, self.name)
    }
}

impl FromStr for ComponentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((t, n)) if !t.is_empty() && !n.is_empty() => Ok(ComponentKey::new(t, n)),
            _ => Err(format!("invalid component key: {s}")),
        }
    }
}

/// Yields `(component_type, components)` for every top-level key whose value
/// is an array, in document order. Other keys (e.g. `definitions`) are skipped.
pub fn component_groups(doc: &Value) -> impl Iterator<Item = (&str, &[Value])> {
    doc.as_object()
        .into_iter()
        .flat_map(|obj| obj.iter())
        .filter_map(|(k, v)| v.as_array().map(|arr| (k.as_str(), arr.as_slice())))
}

/// The `name` of a component or field, when it is a string.
pub fn name_of(node: &Value) -> Option<&str> {
    node.get("name").and_then(Value::as_str)
}
