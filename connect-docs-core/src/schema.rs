//! Loading schema and override documents from disk, and applying overrides.

use crate::error::{DocsError, DocsResult};
use crate::merge::merge_overrides;
use crate::reference::resolve_references;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads a connector schema document; the format follows the file extension.
pub fn load_schema<P: AsRef<Path>>(path: P) -> DocsResult<Value> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read schema file");
        e
    })?;

    let doc = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => return Err(DocsError::UnsupportedFormat(path.to_path_buf())),
    };
    info!(path = %path.display(), "Loaded schema document");
    Ok(doc)
}

/// Loads an override document. Overrides are always JSON.
pub fn load_overrides<P: AsRef<Path>>(path: P) -> DocsResult<Value> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let doc = serde_json::from_str(&content)?;
    info!(path = %path.display(), "Loaded override document");
    Ok(doc)
}

/// Resolves every `$ref` in `overrides` against itself, then merges the
/// result into a copy of `base`. Any error aborts with no partial output.
pub fn apply_overrides(base: &Value, overrides: &Value) -> DocsResult<Value> {
    let resolved = resolve_references(overrides, overrides)?;
    let mut merged = base.clone();
    merge_overrides(&mut merged, &resolved)?;
    Ok(merged)
}

/// Loads a schema and, when given, applies an override file to it.
pub fn load_merged_schema(schema: &Path, overrides: Option<&Path>) -> DocsResult<Value> {
    let base = load_schema(schema)?;
    match overrides {
        Some(path) => apply_overrides(&base, &load_overrides(path)?),
        None => Ok(base),
    }
}
