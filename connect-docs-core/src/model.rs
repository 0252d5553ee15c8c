//! Typed view of merged component definitions, used when rendering docs.
//!
//! Diffing and merging work on raw JSON; these types only need the keys the
//! doc templates read, so unknown keys are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Stable,
    Beta,
    Experimental,
    Deprecated,
    Community,
    Certified,
    /// Statuses the docs do not special-case, such as `hidden`.
    Other,
}

impl Status {
    /// Case-insensitive; unknown statuses map to [`Status::Other`].
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "stable" => Status::Stable,
            "beta" => Status::Beta,
            "experimental" => Status::Experimental,
            "deprecated" => Status::Deprecated,
            "community" => Status::Community,
            "certified" => Status::Certified,
            _ => Status::Other,
        }
    }
}

// Missing, null or non-string statuses read as the default.
impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Status::parse).unwrap_or_default())
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent key is `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Scalar,
    Array,
    Map,
    /// Kinds emitted by newer binaries that the docs do not special-case.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` means the field has no default; `Some(Value::Null)` is a
    /// declared `null` default.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub is_deprecated: bool,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub is_advanced: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub examples: Vec<Value>,
    #[serde(default)]
    pub annotated_options: Vec<(String, String)>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub children: Vec<Field>,
}

impl Field {
    pub fn is_object(&self) -> bool {
        self.field_type.as_deref() == Some("object")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub children: Vec<Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Filled from the grouping key, not from the definition.
    #[serde(skip)]
    pub component_type: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Option<ComponentConfig>,
    /// Top-level fields of `config`-type components.
    #[serde(default)]
    pub children: Vec<Field>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

impl Component {
    /// Parses a raw definition found under `component_type`.
    pub fn from_raw(component_type: &str, raw: &Value) -> serde_json::Result<Self> {
        let mut component: Component = serde_json::from_value(raw.clone())?;
        component.component_type = component_type.to_string();
        Ok(component)
    }

    pub fn fields(&self) -> &[Field] {
        if self.component_type == "config" {
            &self.children
        } else {
            self.config.as_ref().map(|c| c.children.as_slice()).unwrap_or(&[])
        }
    }
}
