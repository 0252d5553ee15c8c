//! Deep merge of an override document into a connector schema document.
//!
//! Matching is always by key or by `name`/`title`, never by position, so
//! applying the same overrides twice yields the same document.

use crate::error::{DocsError, DocsResult};
use crate::identity::name_of;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Keys an override may overwrite directly.
const SCALAR_KEYS: [&str; 4] = ["description", "type", "annotated_field", "version"];

/// Example keys taken from a matching override example.
const EXAMPLE_KEYS: [&str; 2] = ["summary", "config"];

/// Shape of a schema node, used to pick a merge rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaNode {
    Scalar,
    ArrayOfScalar,
    ArrayOfObject,
    Object,
}

impl SchemaNode {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => SchemaNode::Object,
            Value::Array(items) if items.iter().all(Value::is_object) => SchemaNode::ArrayOfObject,
            Value::Array(_) => SchemaNode::ArrayOfScalar,
            _ => SchemaNode::Scalar,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, SchemaNode::ArrayOfScalar | SchemaNode::ArrayOfObject)
    }
}

/// Merges `overrides` into `target` in place.
///
/// A missing or non-object `overrides` leaves `target` untouched; a
/// non-object `target` is an error.
pub fn merge_overrides(target: &mut Value, overrides: &Value) -> DocsResult<()> {
    let Some(overrides) = overrides.as_object() else {
        return Ok(());
    };
    let target = match target {
        Value::Object(obj) => obj,
        other => return Err(DocsError::InvalidMergeTarget(kind_name(other))),
    };
    merge_object(target, overrides)
}

fn merge_object(target: &mut Map<String, Value>, overrides: &Map<String, Value>) -> DocsResult<()> {
    for (key, override_value) in overrides {
        let target_shape = target.get(key).map(SchemaNode::of);
        let override_shape = SchemaNode::of(override_value);

        match (key.as_str(), target_shape, override_shape) {
            ("annotated_options", Some(t), o) if t.is_array() && o.is_array() => {
                if let (Some(Value::Array(existing)), Value::Array(incoming)) =
                    (target.get_mut(key), override_value)
                {
                    merge_annotated_options(existing, incoming);
                }
            }
            ("examples", _, o) if o.is_array() => {
                let slot = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !slot.is_array() {
                    *slot = Value::Array(Vec::new());
                }
                if let (Value::Array(existing), Value::Array(incoming)) = (slot, override_value) {
                    merge_examples(existing, incoming);
                }
            }
            (_, Some(t), o) if t.is_array() && o.is_array() => {
                if let (Some(Value::Array(existing)), Value::Array(incoming)) =
                    (target.get_mut(key), override_value)
                {
                    merge_named_items(existing, incoming)?;
                }
            }
            (_, Some(SchemaNode::Object), SchemaNode::Object) => {
                if let (Some(Value::Object(existing)), Value::Object(incoming)) =
                    (target.get_mut(key), override_value)
                {
                    merge_object(existing, incoming)?;
                }
            }
            (k, _, _) if SCALAR_KEYS.contains(&k) => {
                target.insert(key.clone(), override_value.clone());
            }
            _ => debug!(key = %key, "Ignoring override key with no merge rule"),
        }
    }
    Ok(())
}

/// `[name, summary]` pairs: replace summaries by name, keep target order,
/// append pairs the target did not have.
fn merge_annotated_options(existing: &mut Vec<Value>, incoming: &[Value]) {
    let lookup: HashMap<&str, &Value> = incoming
        .iter()
        .filter_map(|pair| Some((option_name(pair)?, pair.get(1)?)))
        .collect();

    for pair in existing.iter_mut() {
        let Some(name) = option_name(pair) else {
            continue;
        };
        if let Some(summary) = lookup.get(name).map(|s| (*s).clone()) {
            if let Some(slot) = pair.get_mut(1) {
                *slot = summary;
            }
        }
    }

    let known: Vec<String> = existing
        .iter()
        .filter_map(option_name)
        .map(str::to_string)
        .collect();
    for pair in incoming {
        if let Some(name) = option_name(pair) {
            if !known.iter().any(|k| k == name) {
                existing.push(pair.clone());
            }
        }
    }
}

fn option_name(pair: &Value) -> Option<&str> {
    pair.get(0).and_then(Value::as_str)
}

/// Examples matched by `title`: only `summary` and `config` are taken from
/// the override; unmatched override examples are appended.
fn merge_examples(existing: &mut Vec<Value>, incoming: &[Value]) {
    for example in existing.iter_mut() {
        let Some(title) = title_of(example).map(str::to_string) else {
            continue;
        };
        let Some(replacement) = incoming.iter().find(|o| title_of(o) == Some(title.as_str())) else {
            continue;
        };
        if let Value::Object(obj) = example {
            for key in EXAMPLE_KEYS {
                if let Some(v) = replacement.get(key) {
                    obj.insert(key.to_string(), v.clone());
                }
            }
        }
    }

    for example in incoming {
        let title = title_of(example);
        let exists = existing.iter().any(|e| title_of(e) == title);
        if !exists {
            existing.push(example.clone());
        }
    }
}

fn title_of(example: &Value) -> Option<&str> {
    example.get("title").and_then(Value::as_str)
}

/// Component or field lists: override items patch the target item with the
/// same `name`. Override items without a counterpart are not added.
fn merge_named_items(existing: &mut [Value], incoming: &[Value]) -> DocsResult<()> {
    for item in existing.iter_mut() {
        let Some(name) = name_of(item).map(str::to_string) else {
            continue;
        };
        let Some(patch) = incoming.iter().find(|o| name_of(o) == Some(name.as_str())) else {
            continue;
        };
        let (Value::Object(target), Value::Object(patch)) = (item, patch) else {
            continue;
        };

        for key in SCALAR_KEYS.iter().chain(std::iter::once(&"selfManagedOnly")) {
            if let Some(v) = patch.get(*key) {
                target.insert(key.to_string(), v.clone());
            }
        }
        merge_object(target, patch)?;
    }

    for patch in incoming {
        if let Some(name) = name_of(patch) {
            if !existing.iter().any(|e| name_of(e) == Some(name)) {
                debug!(name = %name, "Override entry has no matching target, skipping");
            }
        }
    }
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn array_override_merges_by_name() {
        let mut base = json!({
            "config": [
                {"name": "foo", "description": "d1"},
                {"name": "bar", "description": "d2"}
            ]
        });
        let overrides = json!({"config": [{"name": "bar", "description": "overridden"}]});
        merge_overrides(&mut base, &overrides).unwrap();

        let items = base["config"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], json!({"name": "foo", "description": "d1"}));
        assert_eq!(items[1]["description"], "overridden");
    }

    #[test]
    fn unmatched_override_items_are_not_appended() {
        let mut base = json!({"inputs": [{"name": "a"}]});
        merge_overrides(&mut base, &json!({"inputs": [{"name": "zzz", "description": "x"}]})).unwrap();
        assert_eq!(base, json!({"inputs": [{"name": "a"}]}));
    }

    #[test]
    fn nested_children_are_merged() {
        let mut base = json!({
            "inputs": [{
                "name": "kafka",
                "config": {"children": [
                    {"name": "tls", "type": "object", "children": [{"name": "enabled", "description": "old"}]}
                ]}
            }]
        });
        let overrides = json!({
            "inputs": [{
                "name": "kafka",
                "config": {"children": [
                    {"name": "tls", "children": [{"name": "enabled", "description": "new"}]}
                ]}
            }]
        });
        merge_overrides(&mut base, &overrides).unwrap();
        assert_eq!(
            base["inputs"][0]["config"]["children"][0]["children"][0]["description"],
            "new"
        );
    }

    #[test]
    fn annotated_options_replace_and_append() {
        let mut base = json!({
            "annotated_options": [["none", "No compression"], ["gzip", "Gzip"]]
        });
        let overrides = json!({
            "annotated_options": [["gzip", "Gzip compression"], ["zstd", "Zstandard"]]
        });
        merge_overrides(&mut base, &overrides).unwrap();
        assert_eq!(
            base["annotated_options"],
            json!([["none", "No compression"], ["gzip", "Gzip compression"], ["zstd", "Zstandard"]])
        );
    }

    #[test]
    fn examples_merge_by_title() {
        let mut base = json!({
            "examples": [{"title": "Basic", "summary": "old", "config": "a: 1", "extra": true}]
        });
        let overrides = json!({
            "examples": [
                {"title": "Basic", "summary": "new", "ignored": 1},
                {"title": "Advanced", "summary": "more", "config": "b: 2"}
            ]
        });
        merge_overrides(&mut base, &overrides).unwrap();
        assert_eq!(
            base["examples"],
            json!([
                {"title": "Basic", "summary": "new", "config": "a: 1", "extra": true},
                {"title": "Advanced", "summary": "more", "config": "b: 2"}
            ])
        );
    }

    #[test]
    fn examples_initialised_when_missing() {
        let mut base = json!({"name": "x", "examples": "not-an-array"});
        merge_overrides(&mut base, &json!({"examples": [{"title": "T"}]})).unwrap();
        assert_eq!(base["examples"], json!([{"title": "T"}]));
    }

    #[test]
    fn scalar_keys_overwrite_and_others_are_ignored() {
        let mut base = json!({"description": "a", "status": "beta"});
        merge_overrides(
            &mut base,
            &json!({"description": "b", "version": "4.2.0", "status": "stable", "brand_new": 1}),
        )
        .unwrap();
        assert_eq!(base, json!({"description": "b", "status": "beta", "version": "4.2.0"}));
    }

    #[test]
    fn self_managed_only_is_copied_on_named_items() {
        let mut base = json!({"outputs": [{"name": "file"}]});
        merge_overrides(&mut base, &json!({"outputs": [{"name": "file", "selfManagedOnly": true}]})).unwrap();
        assert_eq!(base["outputs"][0]["selfManagedOnly"], true);
    }

    #[test]
    fn merge_is_idempotent() {
        let base = json!({
            "inputs": [{
                "name": "kafka",
                "annotated_options": [["a", "1"]],
                "examples": [{"title": "One", "summary": "s"}],
                "config": {"children": [{"name": "topic", "description": "t"}]}
            }]
        });
        let overrides = json!({
            "inputs": [{
                "name": "kafka",
                "description": "Kafka input",
                "annotated_options": [["a", "one"], ["b", "two"]],
                "examples": [{"title": "Two", "summary": "s2"}],
                "config": {"children": [{"name": "topic", "description": "Topic name"}]}
            }]
        });
        let mut once = base.clone();
        merge_overrides(&mut once, &overrides).unwrap();
        let mut twice = once.clone();
        merge_overrides(&mut twice, &overrides).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn non_object_target_is_rejected() {
        let mut target = json!([1, 2]);
        let err = merge_overrides(&mut target, &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, DocsError::InvalidMergeTarget("array")));
    }

    #[test]
    fn absent_overrides_leave_target_unchanged() {
        let mut target = json!({"a": 1});
        merge_overrides(&mut target, &Value::Null).unwrap();
        assert_eq!(target, json!({"a": 1}));
    }

    #[test]
    fn shapes_are_classified() {
        assert_eq!(SchemaNode::of(&json!("x")), SchemaNode::Scalar);
        assert_eq!(SchemaNode::of(&json!([["a", "b"]])), SchemaNode::ArrayOfScalar);
        assert_eq!(SchemaNode::of(&json!([{"name": "a"}])), SchemaNode::ArrayOfObject);
        assert_eq!(SchemaNode::of(&json!({})), SchemaNode::Object);
    }
}
