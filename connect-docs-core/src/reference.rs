//! `$ref` resolution for override documents.
//!
//! A `$ref` value of the form `#/definitions/a/b` is looked up inside the root
//! document and its properties are spliced into the object carrying the
//! reference. Targets are spliced as-is: a `$ref` inside a definition is not
//! chased, which keeps resolution bounded even for self-referencing
//! definitions.

use crate::error::{DocsError, DocsResult};
use serde_json::{Map, Value};
use tracing::debug;

const REF_KEY: &str = "$ref";

/// Returns a copy of `node` with every `$ref` replaced by the properties of
/// its target in `root`.
pub fn resolve_references(node: &Value, root: &Value) -> DocsResult<Value> {
    match node {
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_references(item, root))
            .collect::<DocsResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, value) in obj {
                match (key.as_str(), value) {
                    (REF_KEY, Value::String(reference)) => {
                        let target = lookup(reference, root)?;
                        debug!(reference = %reference, "Resolved $ref");
                        splice(&mut out, target);
                    }
                    _ => {
                        out.insert(key.clone(), resolve_references(value, root)?);
                    }
                }
            }
            Ok(Value::Object(out))
        }
        _ => Ok(node.clone()),
    }
}

fn lookup<'a>(reference: &str, root: &'a Value) -> DocsResult<&'a Value> {
    let path = reference
        .strip_prefix("#/")
        .ok_or_else(|| DocsError::UnsupportedReference(reference.to_string()))?;

    let mut current = root;
    for segment in path.split('/') {
        current = match current {
            Value::Object(obj) => obj.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| DocsError::UnresolvedReference(reference.to_string()))?;
    }
    Ok(current)
}

/// Shallow-assigns the target's properties. Non-object targets carry no
/// properties and leave the position empty apart from sibling keys.
fn splice(out: &mut Map<String, Value>, target: &Value) {
    if let Value::Object(props) = target {
        for (k, v) in props {
            out.insert(k.clone(), v.clone());
        }
    }
}

/// Counts remaining `$ref` keys anywhere in `node`.
pub fn count_references(node: &Value) -> usize {
    match node {
        Value::Array(items) => items.iter().map(count_references).sum(),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| usize::from(k == REF_KEY) + count_references(v))
            .sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_definition_in_place() {
        let root = json!({
            "definitions": {
                "tls": {"description": "TLS settings", "type": "object"}
            }
        });
        let node = json!({
            "inputs": [
                {"name": "kafka", "config": {"children": [{"name": "tls", "$ref": "#/definitions/tls"}]}}
            ]
        });
        let out = resolve_references(&node, &root).unwrap();
        let tls = &out["inputs"][0]["config"]["children"][0];
        assert_eq!(tls["name"], "tls");
        assert_eq!(tls["description"], "TLS settings");
        assert!(tls.get("$ref").is_none());
        assert_eq!(count_references(&out), 0);
    }

    #[test]
    fn missing_target_is_an_error() {
        let err = resolve_references(
            &json!({"a": {"$ref": "#/definitions/missing"}}),
            &json!({"definitions": {}}),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to resolve reference \"#/definitions/missing\""));
    }

    #[test]
    fn non_local_reference_is_unsupported() {
        let err = resolve_references(
            &json!({"a": {"$ref": "invalid-ref-format"}}),
            &json!({"definitions": {}}),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Unsupported reference format: invalid-ref-format"));
    }

    #[test]
    fn nested_refs_in_targets_are_not_chased() {
        let root = json!({
            "definitions": {
                "loop": {"description": "self", "$ref": "#/definitions/loop"}
            }
        });
        let out = resolve_references(&json!({"x": {"$ref": "#/definitions/loop"}}), &root).unwrap();
        assert_eq!(out["x"]["description"], "self");
        assert_eq!(out["x"]["$ref"], "#/definitions/loop");
    }

    #[test]
    fn primitives_pass_through() {
        let root = json!({});
        assert_eq!(resolve_references(&json!(3), &root).unwrap(), json!(3));
        assert_eq!(resolve_references(&json!(null), &root).unwrap(), json!(null));
        assert_eq!(
            resolve_references(&json!(["a", true]), &root).unwrap(),
            json!(["a", true])
        );
    }
}
