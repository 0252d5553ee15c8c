/// `load_config` module: loads the YAML config that drives binary analysis.
///
/// This is the only place where the analysis config file is parsed. Secrets
/// never live in the file: the GitHub token for release downloads is read
/// from `GITHUB_TOKEN` by the fetcher.
///
/// # Accepted YAML
/// ```yaml
/// output_dir: ./docs-data
/// docker_image: ubuntu:22.04        # optional
/// binaries:
///   oss:
///     type: release
///     url: https://github.com/redpanda-data/connect/releases/download/v4.38.0/redpanda-connect_4.38.0_linux_amd64.tar.gz
///   cloud:                          # optional
///     type: path
///     path: ./bin/redpanda-connect-cloud
///     linux_only: true
///   cgo:                            # optional
///     type: release
///     url: https://example.com/redpanda-connect-cgo.tar.gz
///     linux_only: true
/// ```
///
/// Relative `path` entries are resolved against the directory holding the
/// config file.
use anyhow::Result;
use connect_docs_core::binary_analysis::{AnalysisConfig, BinarySet, BinarySpec};
use connect_docs_core::inventory::DEFAULT_DOCKER_IMAGE;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn default_docker_image() -> String {
    DEFAULT_DOCKER_IMAGE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub output_dir: PathBuf,
    #[serde(default = "default_docker_image")]
    pub docker_image: String,
    pub binaries: BinarySet,
}

impl CliConfig {
    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            binaries: self.binaries.clone(),
            docker_image: self.docker_image.clone(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
    resolve_relative(&mut config.binaries.oss, base);
    for spec in [&mut config.binaries.cloud, &mut config.binaries.cgo]
        .into_iter()
        .flatten()
    {
        resolve_relative(spec, base);
    }
    if config.output_dir.is_relative() {
        config.output_dir = base.join(&config.output_dir);
    }

    info!(
        output_dir = %config.output_dir.display(),
        cloud = config.binaries.cloud.is_some(),
        cgo = config.binaries.cgo.is_some(),
        "Config loaded successfully"
    );
    Ok(config)
}

fn resolve_relative(spec: &mut BinarySpec, base: &Path) {
    if let BinarySpec::Path { path, .. } = spec {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}
