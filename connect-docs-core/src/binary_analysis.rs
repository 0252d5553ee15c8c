//! Binary analysis: fetch → introspect → reconcile for the OSS, Cloud and
//! cgo builds of the connector binary.
//!
//! Phases run one after another inside a single temporary staging directory,
//! which is removed on every exit path.
//!
//! # Error Handling
//! - The OSS phase is mandatory: any failure there is returned to the caller.
//! - Cloud and cgo phases degrade: a failure is logged and recorded as
//!   [`PhaseOutcome::Skipped`], and the remaining results are still produced.
//!
//! # Navigation
//! - Main entrypoint: [`analyze_binaries`]
//! - Post-processing: [`annotate_availability`]

use crate::contract::{BinaryFetcher, InventorySource};
use crate::error::DocsResult;
use crate::identity::{name_of, ComponentKey};
use crate::inventory::DEFAULT_DOCKER_IMAGE;
use crate::reconcile::{
    compare_oss_with_cloud, find_cgo_only_connectors, CgoOnlyConnector, CloudComparison, ConnectorIndex,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn default_binary_name() -> String {
    "redpanda-connect".to_string()
}

fn default_docker_image() -> String {
    DEFAULT_DOCKER_IMAGE.to_string()
}

/// Where a binary comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BinarySpec {
    /// An executable already on disk.
    Path {
        path: PathBuf,
        #[serde(default)]
        linux_only: bool,
    },
    /// A release asset: either the executable itself or a `.tar.gz` holding it.
    Release {
        url: String,
        #[serde(default = "default_binary_name")]
        binary_name: String,
        #[serde(default)]
        linux_only: bool,
    },
}

impl BinarySpec {
    pub fn linux_only(&self) -> bool {
        match self {
            BinarySpec::Path { linux_only, .. } | BinarySpec::Release { linux_only, .. } => *linux_only,
        }
    }
}

impl fmt::Display for BinarySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinarySpec::Path { path, .. } => write!(f, "{}", path.display()),
            BinarySpec::Release { url, .. } => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinarySet {
    pub oss: BinarySpec,
    #[serde(default)]
    pub cloud: Option<BinarySpec>,
    #[serde(default)]
    pub cgo: Option<BinarySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub binaries: BinarySet,
    #[serde(default = "default_docker_image")]
    pub docker_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryRole {
    Oss,
    Cloud,
    Cgo,
}

impl fmt::Display for BinaryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryRole::Oss => "oss",
            BinaryRole::Cloud => "cloud",
            BinaryRole::Cgo => "cgo",
        })
    }
}

/// Result of an optional phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum PhaseOutcome<T> {
    Ok(T),
    Skipped { reason: String },
}

impl<T> PhaseOutcome<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            PhaseOutcome::Ok(v) => Some(v),
            PhaseOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PhaseOutcome::Ok(_))
    }
}

/// What one phase looked at and found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub binary: String,
    pub runner: String,
    pub connectors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryAnalysis {
    pub oss: PhaseSummary,
    pub cloud: PhaseOutcome<PhaseSummary>,
    pub cgo: PhaseOutcome<PhaseSummary>,
    /// Present only when the cloud phase succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<CloudComparison>,
    #[serde(default)]
    pub cgo_only: Vec<CgoOnlyConnector>,
    #[serde(skip)]
    pub oss_index: ConnectorIndex,
    #[serde(skip)]
    pub cloud_index: Option<ConnectorIndex>,
}

impl BinaryAnalysis {
    pub fn cgo_only_keys(&self) -> HashSet<String> {
        self.cgo_only.iter().map(|c| c.key().to_string()).collect()
    }

    /// Keys known to be available in Cloud, when cloud data exists.
    pub fn cloud_keys(&self) -> Option<HashSet<String>> {
        if let Some(index) = &self.cloud_index {
            return Some(index.iter().map(|c| c.key.to_string()).collect());
        }
        // Deserialised analyses carry only the comparison.
        self.comparison.as_ref().map(|c| {
            c.in_cloud
                .iter()
                .chain(c.cloud_only.iter())
                .map(|x| x.key().to_string())
                .collect()
        })
    }
}

/// Runs every configured phase and reconciles the inventories.
///
/// `source_for` picks how each binary is introspected, normally
/// [`crate::inventory::select_source`] for the current platform.
pub async fn analyze_binaries<F, S>(
    config: &AnalysisConfig,
    fetcher: &F,
    source_for: S,
) -> DocsResult<BinaryAnalysis>
where
    F: BinaryFetcher + ?Sized,
    S: Fn(BinaryRole, &BinarySpec) -> Box<dyn InventorySource>,
{
    let staging = tempfile::Builder::new().prefix("connect-docs-").tempdir()?;
    info!(staging = %staging.path().display(), "Starting binary analysis");

    let (oss_index, oss) = run_phase(
        BinaryRole::Oss,
        &config.binaries.oss,
        staging.path(),
        fetcher,
        &source_for,
    )
    .await?;

    let (cloud, cloud_index) = optional_phase(
        BinaryRole::Cloud,
        config.binaries.cloud.as_ref(),
        staging.path(),
        fetcher,
        &source_for,
    )
    .await;

    let (cgo, cgo_index) = optional_phase(
        BinaryRole::Cgo,
        config.binaries.cgo.as_ref(),
        staging.path(),
        fetcher,
        &source_for,
    )
    .await;

    let comparison = cloud_index
        .as_ref()
        .map(|cloud| compare_oss_with_cloud(&oss_index, cloud));
    let cgo_only = cgo_index
        .as_ref()
        .map(|cgo| find_cgo_only_connectors(&oss_index, cgo))
        .unwrap_or_default();

    if let Err(e) = staging.close() {
        warn!(error = ?e, "Failed to remove staging directory");
    }

    info!(
        oss = oss.connectors,
        cloud = cloud.is_ok(),
        cgo = cgo.is_ok(),
        cgo_only = cgo_only.len(),
        "Binary analysis complete"
    );

    Ok(BinaryAnalysis {
        oss,
        cloud,
        cgo,
        comparison,
        cgo_only,
        oss_index,
        cloud_index,
    })
}

async fn optional_phase<F, S>(
    role: BinaryRole,
    spec: Option<&BinarySpec>,
    staging: &Path,
    fetcher: &F,
    source_for: &S,
) -> (PhaseOutcome<PhaseSummary>, Option<ConnectorIndex>)
where
    F: BinaryFetcher + ?Sized,
    S: Fn(BinaryRole, &BinarySpec) -> Box<dyn InventorySource>,
{
    let Some(spec) = spec else {
        info!(role = %role, "Phase not configured, skipping");
        return (
            PhaseOutcome::Skipped {
                reason: "not configured".to_string(),
            },
            None,
        );
    };
    match run_phase(role, spec, staging, fetcher, source_for).await {
        Ok((index, summary)) => (PhaseOutcome::Ok(summary), Some(index)),
        Err(e) => {
            warn!(role = %role, binary = %spec, error = %e, "Phase failed, continuing without it");
            (
                PhaseOutcome::Skipped {
                    reason: e.to_string(),
                },
                None,
            )
        }
    }
}

async fn run_phase<F, S>(
    role: BinaryRole,
    spec: &BinarySpec,
    staging: &Path,
    fetcher: &F,
    source_for: &S,
) -> DocsResult<(ConnectorIndex, PhaseSummary)>
where
    F: BinaryFetcher + ?Sized,
    S: Fn(BinaryRole, &BinarySpec) -> Box<dyn InventorySource>,
{
    let dir = staging.join(role.to_string());
    std::fs::create_dir_all(&dir)?;

    let binary = fetcher.fetch(spec, &dir).await?;
    let source = source_for(role, spec);
    info!(role = %role, binary = %binary.display(), runner = %source.describe(), "Introspecting binary");

    let inventory = source.list_connectors(&binary).await?;
    let index = ConnectorIndex::from_inventory(&inventory);
    let summary = PhaseSummary {
        binary: spec.to_string(),
        runner: source.describe(),
        connectors: index.len(),
    };
    info!(role = %role, connectors = index.len(), "Indexed inventory");
    Ok((index, summary))
}

/// Stamps availability onto components of a merged schema:
/// `cloudSupported` when cloud data exists, `requiresCgo` for cgo-only keys.
/// Returns the number of components touched.
pub fn annotate_availability(schema: &mut Value, analysis: &BinaryAnalysis) -> usize {
    let cloud = analysis.cloud_keys();
    let cgo_only = analysis.cgo_only_keys();
    let mut touched = 0;

    let Some(groups) = schema.as_object_mut() else {
        return 0;
    };
    for (component_type, components) in groups.iter_mut() {
        let Some(components) = components.as_array_mut() else {
            continue;
        };
        for component in components.iter_mut() {
            let Some(name) = name_of(component).map(str::to_string) else {
                continue;
            };
            let key = ComponentKey::new(component_type.as_str(), name).to_string();
            let Some(obj) = component.as_object_mut() else {
                continue;
            };
            if let Some(cloud) = &cloud {
                obj.insert("cloudSupported".to_string(), Value::Bool(cloud.contains(&key)));
            }
            if cgo_only.contains(&key) {
                obj.insert("requiresCgo".to_string(), Value::Bool(true));
            }
            touched += 1;
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockBinaryFetcher, MockInventorySource};
    use crate::error::{DocsError, InventoryError};
    use serde_json::json;

    fn path_spec(name: &str) -> BinarySpec {
        BinarySpec::Path {
            path: PathBuf::from(format!("/bin/{name}")),
            linux_only: false,
        }
    }

    fn passthrough_fetcher() -> MockBinaryFetcher {
        let mut fetcher = MockBinaryFetcher::new();
        fetcher.expect_fetch().returning(|spec, _dir| match spec {
            BinarySpec::Path { path, .. } => Ok(path.clone()),
            BinarySpec::Release { url, .. } => Err(DocsError::Download {
                url: url.clone(),
                message: "offline".into(),
            }),
        });
        fetcher
    }

    fn source_returning(result: Result<Value, ()>) -> Box<dyn InventorySource> {
        let mut source = MockInventorySource::new();
        source.expect_describe().return_const("mock".to_string());
        source.expect_list_connectors().returning(move |_| match &result {
            Ok(v) => Ok(v.clone()),
            Err(()) => Err(InventoryError::NonZeroExit {
                program: "mock".into(),
                code: Some(1),
                stderr: "exploded".into(),
            }),
        });
        Box::new(source)
    }

    #[tokio::test]
    async fn cloud_failure_degrades_to_skipped() {
        let config = AnalysisConfig {
            binaries: BinarySet {
                oss: path_spec("oss"),
                cloud: Some(path_spec("cloud")),
                cgo: Some(path_spec("cgo")),
            },
            docker_image: default_docker_image(),
        };
        let fetcher = passthrough_fetcher();
        let analysis = analyze_binaries(&config, &fetcher, |role, _| match role {
            BinaryRole::Oss => source_returning(Ok(json!({"processors": [{"name": "x"}]}))),
            BinaryRole::Cloud => source_returning(Err(())),
            BinaryRole::Cgo => source_returning(Ok(json!({"processors": [{"name": "x"}, {"name": "y"}]}))),
        })
        .await
        .unwrap();

        assert_eq!(analysis.oss.connectors, 1);
        assert!(matches!(analysis.cloud, PhaseOutcome::Skipped { ref reason } if reason.contains("exploded")));
        assert!(analysis.comparison.is_none());
        assert_eq!(analysis.cgo_only.len(), 1);
        assert_eq!(analysis.cgo_only[0].name, "y");
    }

    #[tokio::test]
    async fn oss_failure_is_fatal() {
        let config = AnalysisConfig {
            binaries: BinarySet {
                oss: path_spec("oss"),
                cloud: None,
                cgo: None,
            },
            docker_image: default_docker_image(),
        };
        let fetcher = passthrough_fetcher();
        let result = analyze_binaries(&config, &fetcher, |_, _| source_returning(Err(()))).await;
        assert!(matches!(result, Err(DocsError::Inventory(_))));
    }

    #[test]
    fn annotates_cloud_and_cgo_availability() {
        let oss = ConnectorIndex::from_inventory(&json!({"inputs": [{"name": "kafka"}, {"name": "file"}]}));
        let cloud = ConnectorIndex::from_inventory(&json!({"inputs": [{"name": "kafka"}]}));
        let cgo = ConnectorIndex::from_inventory(&json!({"inputs": [{"name": "kafka"}, {"name": "tigerbeetle_cdc"}]}));
        let analysis = BinaryAnalysis {
            oss: PhaseSummary {
                binary: "oss".into(),
                runner: "native".into(),
                connectors: 2,
            },
            cloud: PhaseOutcome::Skipped { reason: "n/a".into() },
            cgo: PhaseOutcome::Skipped { reason: "n/a".into() },
            comparison: Some(compare_oss_with_cloud(&oss, &cloud)),
            cgo_only: find_cgo_only_connectors(&oss, &cgo),
            oss_index: oss,
            cloud_index: Some(cloud),
        };

        let mut schema = json!({
            "inputs": [{"name": "kafka"}, {"name": "file"}, {"name": "tigerbeetle_cdc"}],
            "definitions": {}
        });
        assert_eq!(annotate_availability(&mut schema, &analysis), 3);
        assert_eq!(schema["inputs"][0]["cloudSupported"], true);
        assert_eq!(schema["inputs"][1]["cloudSupported"], false);
        assert_eq!(schema["inputs"][2]["requiresCgo"], true);
        assert!(schema["inputs"][0].get("requiresCgo").is_none());
    }

    #[test]
    fn spec_deserializes_from_tagged_yaml() {
        let spec: BinarySpec = serde_yaml::from_str(
            "type: release\nurl: https://example.com/connect.tar.gz\nlinux_only: true\n",
        )
        .unwrap();
        assert_eq!(
            spec,
            BinarySpec::Release {
                url: "https://example.com/connect.tar.gz".into(),
                binary_name: "redpanda-connect".into(),
                linux_only: true,
            }
        );
        assert!(spec.linux_only());
    }
}
