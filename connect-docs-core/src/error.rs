//! Error types shared by every stage of the documentation data pipeline.
//!
//! Structural problems (bad `$ref`, malformed input, non-object merge targets)
//! abort processing of the current document. Binary download and
//! introspection failures are also expressed here, but the binary analysis
//! orchestrator downgrades them to skipped phases for the cloud and cgo
//! inventories.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for connect-docs-core operations
pub type DocsResult<T> = Result<T, DocsError>;

/// Main error type for connect-docs-core
#[derive(Debug, Error)]
pub enum DocsError {
    /// A `#/...` pointer whose target path does not exist
    #[error("Failed to resolve reference \"{0}\"")]
    UnresolvedReference(String),

    /// A `$ref` that is not a local `#/` pointer
    #[error("Unsupported reference format: {0}")]
    UnsupportedReference(String),

    #[error("Merge target must be an object, got {0}")]
    InvalidMergeTarget(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema file with an extension other than json/yaml/yml
    #[error("Unsupported schema format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Rate limited while fetching {url}; set GITHUB_TOKEN to raise the limit")]
    RateLimited { url: String },
}

/// Failures from running a binary's `list --format json-full` command.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read output of {program}: {source}")]
    Read {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("inventory output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("inventory output is not a JSON object: {0}")]
    InvalidOutput(String),

    #[error("container runtime unavailable: {0}")]
    ContainerUnavailable(String),
}

impl From<handlebars::RenderError> for DocsError {
    fn from(e: handlebars::RenderError) -> Self {
        DocsError::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for DocsError {
    fn from(e: handlebars::TemplateError) -> Self {
        DocsError::Template(e.to_string())
    }
}
