//! # contract: seams between binary analysis and the outside world
//!
//! Binary analysis needs two things it cannot do purely: getting a binary
//! onto local disk, and asking that binary which connectors it was compiled
//! with. Both are traits so the orchestrator in
//! [`crate::binary_analysis`] can be driven by real implementations
//! ([`crate::fetch::ReleaseFetcher`], [`crate::inventory::NativeProcessSource`],
//! [`crate::inventory::ContainerProcessSource`]) or by mocks.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; `MockInventorySource` and
//!   `MockBinaryFetcher` are exported under the `test-export-mocks` feature.

use crate::binary_analysis::BinarySpec;
use crate::error::{DocsResult, InventoryError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Runs a binary's self-introspection and returns its raw inventory
/// (`{type: [connector, ...]}`).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// List every connector compiled into `binary`.
    async fn list_connectors(&self, binary: &Path) -> Result<Value, InventoryError>;

    /// Short label for logs, e.g. `native` or `container(ubuntu:22.04)`.
    fn describe(&self) -> String;
}

/// Makes a binary available on local disk.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    /// Stage the binary described by `spec` under `staging_dir` (or locate it
    /// in place) and return the path of the executable.
    async fn fetch(&self, spec: &BinarySpec, staging_dir: &Path) -> DocsResult<PathBuf>;
}
