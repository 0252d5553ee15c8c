//! Staging binaries for introspection: local paths are used in place,
//! release assets are downloaded and unpacked into the staging directory.

use crate::binary_analysis::BinarySpec;
use crate::contract::BinaryFetcher;
use crate::error::{DocsError, DocsResult};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info};
use walkdir::WalkDir;

const USER_AGENT_VALUE: &str = concat!("connect-docs/", env!("CARGO_PKG_VERSION"));

/// Downloads release assets with an optional GitHub token.
pub struct ReleaseFetcher {
    client: reqwest::Client,
    token: Option<String>,
}

impl ReleaseFetcher {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Reads `GITHUB_TOKEN` from the environment (or a `.env` file loaded by
    /// the caller). Unauthenticated requests work but hit lower rate limits.
    pub fn new_from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        info!(token_set = token.is_some(), "Initialised release fetcher from environment");
        Self::new(token)
    }

    async fn download(&self, url: &str, dest: &Path) -> DocsResult<()> {
        let mut request = self.client.get(url).header(USER_AGENT, USER_AGENT_VALUE);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| DocsError::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            error!(url, status = %status, "Release download was rate limited");
            return Err(DocsError::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            error!(url, status = %status, "Release download failed");
            return Err(DocsError::Download {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DocsError::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        tokio::fs::write(dest, &bytes).await?;
        info!(url, path = %dest.display(), size = bytes.len(), "Downloaded release asset");
        Ok(())
    }
}

#[async_trait]
impl BinaryFetcher for ReleaseFetcher {
    async fn fetch(&self, spec: &BinarySpec, staging_dir: &Path) -> DocsResult<PathBuf> {
        match spec {
            BinarySpec::Path { path, .. } => {
                if !path.is_file() {
                    return Err(DocsError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("binary not found: {}", path.display()),
                    )));
                }
                debug!(path = %path.display(), "Using local binary");
                Ok(path.clone())
            }
            BinarySpec::Release { url, binary_name, .. } => {
                fs::create_dir_all(staging_dir)?;
                let asset = staging_dir.join(asset_file_name(url));
                self.download(url, &asset).await?;

                let binary = if is_tarball(&asset) {
                    unpack_tarball(&asset, staging_dir)?;
                    find_file(staging_dir, binary_name)?.ok_or_else(|| DocsError::Download {
                        url: url.clone(),
                        message: format!("archive does not contain {binary_name}"),
                    })?
                } else {
                    asset
                };
                make_executable(&binary)?;
                Ok(binary)
            }
        }
    }
}

/// Last path segment of a URL, without query string.
pub fn asset_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("asset")
        .to_string()
}

fn is_tarball(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

fn unpack_tarball(archive: &Path, dest: &Path) -> DocsResult<()> {
    let status = Command::new("tar")
        .arg("-xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .status()?;
    if !status.success() {
        error!(archive = %archive.display(), status = ?status, "tar exited with non-zero code");
        return Err(DocsError::Download {
            url: archive.display().to_string(),
            message: format!("failed to unpack archive: {status}"),
        });
    }
    debug!(archive = %archive.display(), dest = %dest.display(), "Unpacked archive");
    Ok(())
}

/// Depth-first search, in file-name order, for a regular file called `name`
/// under `dir`.
pub fn find_file(dir: &Path, name: &str) -> DocsResult<Option<PathBuf>> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == name {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> DocsResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> DocsResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn asset_names_come_from_url_path() {
        assert_eq!(
            asset_file_name("https://github.com/o/r/releases/download/v4.1.0/connect_4.1.0_linux_amd64.tar.gz?x=1"),
            "connect_4.1.0_linux_amd64.tar.gz"
        );
        assert_eq!(asset_file_name("https://example.com/bin/"), "bin");
    }

    #[test]
    fn finds_nested_binary() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("redpanda-connect"), b"#!/bin/sh").unwrap();
        let found = find_file(dir.path(), "redpanda-connect").unwrap();
        assert_eq!(found, Some(nested.join("redpanda-connect")));
        assert_eq!(find_file(dir.path(), "missing").unwrap(), None);
    }

    #[test]
    fn skips_directories_with_the_binary_name() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/redpanda-connect")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/redpanda-connect"), b"").unwrap();
        fs::write(dir.path().join("c-redpanda-connect"), b"").unwrap();
        let found = find_file(dir.path(), "redpanda-connect").unwrap();
        assert_eq!(found, Some(dir.path().join("b/redpanda-connect")));
    }

    #[tokio::test]
    async fn local_path_spec_is_used_in_place() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("connect");
        fs::write(&binary, b"").unwrap();
        let fetcher = ReleaseFetcher::new(None);
        let spec = BinarySpec::Path {
            path: binary.clone(),
            linux_only: false,
        };
        assert_eq!(fetcher.fetch(&spec, dir.path()).await.unwrap(), binary);

        let missing = BinarySpec::Path {
            path: dir.path().join("nope"),
            linux_only: false,
        };
        assert!(matches!(fetcher.fetch(&missing, dir.path()).await, Err(DocsError::Io(_))));
    }

    #[test]
    #[serial_test::serial]
    fn empty_token_is_treated_as_unset() {
        std::env::set_var("GITHUB_TOKEN", "");
        assert!(ReleaseFetcher::new_from_env().token.is_none());
        std::env::set_var("GITHUB_TOKEN", "ghp_example");
        assert_eq!(ReleaseFetcher::new_from_env().token.as_deref(), Some("ghp_example"));
        std::env::remove_var("GITHUB_TOKEN");
        assert!(ReleaseFetcher::new_from_env().token.is_none());
    }
}
