//! Structural diff between two versions of a connector schema document.
//!
//! Both documents are flattened with [`build_component_map`] and compared by
//! `type:name` key. Detail lists follow discovery order; sorting is left to
//! the presentation layer.

use crate::component_map::{build_component_map, ComponentEntry, ComponentMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Version labels and timestamp stamped onto a [`DiffResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOptions {
    pub old_version: String,
    pub new_version: String,
    pub timestamp: String,
}

pub type Comparison = DiffOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub comparison: Comparison,
    pub summary: DiffSummary,
    pub details: DiffDetails,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.summary == DiffSummary::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub new_components: usize,
    pub removed_components: usize,
    pub new_fields: usize,
    pub removed_fields: usize,
    pub deprecated_components: usize,
    pub deprecated_fields: usize,
    pub changed_defaults: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffDetails {
    pub new_components: Vec<NewComponent>,
    pub removed_components: Vec<ComponentRef>,
    pub new_fields: Vec<NewField>,
    pub removed_fields: Vec<FieldRef>,
    pub deprecated_components: Vec<ComponentRef>,
    pub deprecated_fields: Vec<FieldRef>,
    pub changed_defaults: Vec<ChangedDefault>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComponent {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    pub component: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub component: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedDefault {
    pub component: String,
    pub field: String,
    pub old_default: Value,
    pub new_default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Compares two schema documents.
pub fn generate_connector_diff(old: &Value, new: &Value, options: DiffOptions) -> DiffResult {
    let old_map = build_component_map(old);
    let new_map = build_component_map(new);
    let details = diff_maps(&old_map, &new_map);
    let summary = DiffSummary {
        new_components: details.new_components.len(),
        removed_components: details.removed_components.len(),
        new_fields: details.new_fields.len(),
        removed_fields: details.removed_fields.len(),
        deprecated_components: details.deprecated_components.len(),
        deprecated_fields: details.deprecated_fields.len(),
        changed_defaults: details.changed_defaults.len(),
    };
    info!(
        old_version = %options.old_version,
        new_version = %options.new_version,
        new_components = summary.new_components,
        removed_components = summary.removed_components,
        new_fields = summary.new_fields,
        removed_fields = summary.removed_fields,
        "Generated connector diff"
    );
    DiffResult {
        comparison: options,
        summary,
        details,
    }
}

fn diff_maps(old: &ComponentMap, new: &ComponentMap) -> DiffDetails {
    let mut details = DiffDetails::default();

    for entry in new.iter().filter(|e| !old.contains_key(&e.key.to_string())) {
        details.new_components.push(NewComponent {
            key: entry.key.to_string(),
            name: entry.key.name.clone(),
            component_type: entry.key.component_type.clone(),
            status: str_attr(&entry.raw, "status"),
            version: str_attr(&entry.raw, "version"),
            description: str_attr(&entry.raw, "description"),
        });
    }

    for entry in old.iter().filter(|e| !new.contains_key(&e.key.to_string())) {
        details.removed_components.push(component_ref(entry));
    }

    for new_entry in new.iter() {
        let key = new_entry.key.to_string();
        let Some(old_entry) = old.get(&key) else {
            continue;
        };

        for field in new_entry.fields.iter().filter(|f| !old_entry.has_field(f)) {
            let def = new_entry.field(field);
            details.new_fields.push(NewField {
                component: key.clone(),
                field: field.clone(),
                introduced_in: def.and_then(|d| str_attr(d, "version")),
                description: def.and_then(|d| str_attr(d, "description")),
            });
        }

        if !is_deprecated_status(old_entry.status()) && is_deprecated_status(new_entry.status()) {
            details.deprecated_components.push(component_ref(new_entry));
        }

        for field in new_entry.fields.iter().filter(|f| old_entry.has_field(f)) {
            let (Some(old_def), Some(new_def)) = (old_entry.field(field), new_entry.field(field)) else {
                continue;
            };

            if !is_field_deprecated(old_def) && is_field_deprecated(new_def) {
                details.deprecated_fields.push(FieldRef {
                    component: key.clone(),
                    field: field.clone(),
                });
            }

            if let (Some(old_default), Some(new_default)) = (old_def.get("default"), new_def.get("default")) {
                if !same_default(old_default, new_default) {
                    details.changed_defaults.push(ChangedDefault {
                        component: key.clone(),
                        field: field.clone(),
                        old_default: old_default.clone(),
                        new_default: new_default.clone(),
                        description: str_attr(new_def, "description"),
                    });
                }
            }
        }
    }

    for old_entry in old.iter() {
        let key = old_entry.key.to_string();
        let Some(new_entry) = new.get(&key) else {
            continue;
        };
        for field in old_entry.fields.iter().filter(|f| !new_entry.has_field(f)) {
            details.removed_fields.push(FieldRef {
                component: key.clone(),
                field: field.clone(),
            });
        }
    }

    details
}

fn component_ref(entry: &ComponentEntry) -> ComponentRef {
    ComponentRef {
        key: entry.key.to_string(),
        name: entry.key.name.clone(),
        component_type: entry.key.component_type.clone(),
    }
}

fn str_attr(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Structural equality with key-order-insensitive objects. Numbers compare by
/// value when either side is a float, so `1` and `1.0` are the same default.
pub fn same_default(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| same_default(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| same_default(v, w)))
        }
        _ => a == b,
    }
}

fn is_deprecated_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.eq_ignore_ascii_case("deprecated"))
}

/// A field counts as deprecated through `is_deprecated`, `deprecated`, or a
/// `deprecated` status.
pub fn is_field_deprecated(field: &Value) -> bool {
    field.get("is_deprecated") == Some(&Value::Bool(true))
        || field.get("deprecated") == Some(&Value::Bool(true))
        || is_deprecated_status(field.get("status").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options() -> DiffOptions {
        DiffOptions {
            old_version: "4.0.0".into(),
            new_version: "4.1.0".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn identical_schemas_have_no_changes() {
        let schema = json!({
            "inputs": [{"name": "a", "status": "stable", "config": {"children": [{"name": "x", "default": 1}]}}]
        });
        let result = generate_connector_diff(&schema, &schema, options());
        assert!(result.is_empty());
        assert_eq!(result.details, DiffDetails::default());
    }

    #[test]
    fn detects_added_and_removed_components() {
        let old = json!({"inputs": [{"name": "a"}, {"name": "gone"}]});
        let new = json!({"inputs": [{"name": "a"}, {"name": "b", "status": "beta", "version": "4.1.0"}]});
        let result = generate_connector_diff(&old, &new, options());

        assert_eq!(result.details.new_components.len(), 1);
        let added = &result.details.new_components[0];
        assert_eq!(added.name, "b");
        assert_eq!(added.component_type, "inputs");
        assert_eq!(added.status.as_deref(), Some("beta"));

        assert_eq!(
            result.details.removed_components,
            vec![ComponentRef {
                key: "inputs:gone".into(),
                name: "gone".into(),
                component_type: "inputs".into()
            }]
        );
    }

    #[test]
    fn detects_field_changes_with_metadata() {
        let old = json!({"outputs": [{"name": "s3", "config": {"children": [
            {"name": "bucket"}, {"name": "legacy"}
        ]}}]});
        let new = json!({"outputs": [{"name": "s3", "config": {"children": [
            {"name": "bucket"}, {"name": "region", "version": "4.1.0", "description": "AWS region"}
        ]}}]});
        let result = generate_connector_diff(&old, &new, options());

        assert_eq!(
            result.details.new_fields,
            vec![NewField {
                component: "outputs:s3".into(),
                field: "region".into(),
                introduced_in: Some("4.1.0".into()),
                description: Some("AWS region".into()),
            }]
        );
        assert_eq!(
            result.details.removed_fields,
            vec![FieldRef {
                component: "outputs:s3".into(),
                field: "legacy".into()
            }]
        );
    }

    #[test]
    fn deprecation_is_one_directional() {
        let old = json!({"processors": [
            {"name": "a", "status": "stable"},
            {"name": "b", "status": "deprecated"},
            {"name": "c", "status": "deprecated"}
        ]});
        let new = json!({"processors": [
            {"name": "a", "status": "Deprecated"},
            {"name": "b", "status": "deprecated"},
            {"name": "c", "status": "stable"}
        ]});
        let result = generate_connector_diff(&old, &new, options());
        let names: Vec<&str> = result
            .details
            .deprecated_components
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn field_deprecation_flags() {
        assert!(is_field_deprecated(&json!({"is_deprecated": true})));
        assert!(is_field_deprecated(&json!({"deprecated": true})));
        assert!(is_field_deprecated(&json!({"status": "DEPRECATED"})));
        assert!(!is_field_deprecated(&json!({"is_deprecated": false})));
    }

    #[test]
    fn config_type_reads_children_directly() {
        let old = json!({"config": [{"name": "http", "children": [{"name": "address"}]}]});
        let new = json!({"config": [{"name": "http", "children": [{"name": "address"}, {"name": "cors"}]}]});
        let result = generate_connector_diff(&old, &new, options());
        assert_eq!(result.details.new_fields[0].component, "config:http");
        assert_eq!(result.details.new_fields[0].field, "cors");
    }

    #[test]
    fn changed_defaults_use_structural_equality() {
        let old = json!({"inputs": [{"name": "http", "config": {"children": [
            {"name": "timeout", "default": "5s"},
            {"name": "headers", "default": {"a": 1, "b": 2}},
            {"name": "no_default"}
        ]}}]});
        let new = json!({"inputs": [{"name": "http", "config": {"children": [
            {"name": "timeout", "default": "10s", "description": "Request timeout"},
            {"name": "headers", "default": {"b": 2, "a": 1}},
            {"name": "no_default", "default": 3}
        ]}}]});
        let result = generate_connector_diff(&old, &new, options());
        assert_eq!(
            result.details.changed_defaults,
            vec![ChangedDefault {
                component: "inputs:http".into(),
                field: "timeout".into(),
                old_default: json!("5s"),
                new_default: json!("10s"),
                description: Some("Request timeout".into()),
            }]
        );
    }

    #[test]
    fn numeric_defaults_compare_by_value() {
        let old = json!({"outputs": [{"name": "kafka", "config": {"children": [
            {"name": "max_in_flight", "default": 1},
            {"name": "backoff", "default": {"factor": 2, "steps": [1, 2]}},
            {"name": "ratio", "default": 0.5},
            {"name": "partition", "default": 9007199254740993u64}
        ]}}]});
        let new = json!({"outputs": [{"name": "kafka", "config": {"children": [
            {"name": "max_in_flight", "default": 1.0},
            {"name": "backoff", "default": {"steps": [1.0, 2], "factor": 2.0}},
            {"name": "ratio", "default": 0.75},
            {"name": "partition", "default": 9007199254740992u64}
        ]}}]});
        let result = generate_connector_diff(&old, &new, options());
        let changed: Vec<&str> = result
            .details
            .changed_defaults
            .iter()
            .map(|c| c.field.as_str())
            .collect();
        assert_eq!(changed, vec!["ratio", "partition"]);
    }

    #[test]
    fn null_default_is_a_defined_default() {
        assert!(same_default(&json!(null), &json!(null)));
        assert!(!same_default(&json!(null), &json!(0)));
        assert!(!same_default(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let result = generate_connector_diff(&json!({}), &json!({"inputs": [{"name": "b"}]}), options());
        let out = serde_json::to_value(&result).unwrap();
        assert_eq!(out["comparison"]["oldVersion"], "4.0.0");
        assert_eq!(out["summary"]["newComponents"], 1);
        assert_eq!(out["details"]["newComponents"][0]["type"], "inputs");
        assert!(out["details"]["changedDefaults"].as_array().unwrap().is_empty());
    }
}
