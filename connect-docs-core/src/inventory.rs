//! Inventory sources: run `<binary> list --format json-full` either directly
//! or inside a Linux container, for binaries that only ship for linux/amd64.

use crate::contract::InventorySource;
use crate::error::InventoryError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread;
use tracing::{debug, error, info};

pub const LIST_ARGS: [&str; 3] = ["list", "--format", "json-full"];

/// Upper bound on accepted introspection output.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

pub const DEFAULT_DOCKER_IMAGE: &str = "ubuntu:22.04";

const CONTAINER_MOUNT: &str = "/work";

/// Host OS/architecture, as reported by the Rust standard library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn is_linux_amd64(&self) -> bool {
        self.os == "linux" && self.arch == "x86_64"
    }
}

/// Picks how to run a binary: natively unless it only runs on linux/amd64
/// and the host is something else.
pub fn select_source(platform: &Platform, linux_only: bool, image: &str) -> Box<dyn InventorySource> {
    if linux_only && !platform.is_linux_amd64() {
        info!(os = %platform.os, arch = %platform.arch, image, "Using container to run linux-only binary");
        Box::new(ContainerProcessSource::new(image))
    } else {
        Box::new(NativeProcessSource)
    }
}

/// Runs the binary as a child process of this one.
#[derive(Debug, Clone, Default)]
pub struct NativeProcessSource;

#[async_trait]
impl InventorySource for NativeProcessSource {
    async fn list_connectors(&self, binary: &Path) -> Result<Value, InventoryError> {
        let program = binary.display().to_string();
        let mut cmd = Command::new(binary);
        cmd.args(LIST_ARGS);
        debug!(program = %program, "Running native inventory listing");
        let output = run_bounded(&mut cmd, &program, MAX_OUTPUT_BYTES)?;
        parse_listing(&program, output)
    }

    fn describe(&self) -> String {
        "native".to_string()
    }
}

/// Runs the binary inside `docker run --platform linux/amd64`, with the
/// binary's directory mounted read-only.
#[derive(Debug, Clone)]
pub struct ContainerProcessSource {
    image: String,
    runtime: String,
}

impl ContainerProcessSource {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            runtime: "docker".to_string(),
        }
    }

    /// Arguments passed to the container runtime for `binary`.
    pub fn run_args(&self, binary: &Path) -> Result<Vec<String>, InventoryError> {
        let dir = binary.parent().ok_or_else(|| {
            InventoryError::InvalidOutput(format!("binary path has no parent: {}", binary.display()))
        })?;
        let file = binary.file_name().ok_or_else(|| {
            InventoryError::InvalidOutput(format!("binary path has no file name: {}", binary.display()))
        })?;

        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--platform".to_string(),
            "linux/amd64".to_string(),
            "-v".to_string(),
            format!("{}:{}:ro", dir.display(), CONTAINER_MOUNT),
            self.image.clone(),
            format!("{}/{}", CONTAINER_MOUNT, file.to_string_lossy()),
        ];
        args.extend(LIST_ARGS.iter().map(|a| a.to_string()));
        Ok(args)
    }

    fn ensure_runtime(&self) -> Result<(), InventoryError> {
        match Command::new(&self.runtime).arg("version").output() {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(InventoryError::ContainerUnavailable(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            )),
            Err(e) => Err(InventoryError::ContainerUnavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl InventorySource for ContainerProcessSource {
    async fn list_connectors(&self, binary: &Path) -> Result<Value, InventoryError> {
        self.ensure_runtime()?;
        let args = self.run_args(binary)?;
        debug!(runtime = %self.runtime, ?args, "Running containerised inventory listing");
        let mut cmd = Command::new(&self.runtime);
        cmd.args(&args);
        let output = run_bounded(&mut cmd, &self.runtime, MAX_OUTPUT_BYTES)?;
        parse_listing(&self.runtime, output)
    }

    fn describe(&self) -> String {
        format!("container({})", self.image)
    }
}

/// Runs `cmd` to completion, reading at most `limit` bytes of stdout.
///
/// A child that writes more than `limit` bytes is killed and the call fails
/// with [`InventoryError::OutputTooLarge`]; nothing past the limit is buffered.
/// Stderr is kept up to the same limit and the rest discarded.
pub fn run_bounded(cmd: &mut Command, program: &str, limit: usize) -> Result<Output, InventoryError> {
    let read_err = |source: io::Error| InventoryError::Read {
        program: program.to_string(),
        source,
    };

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| InventoryError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = (&mut stderr).take(limit as u64).read_to_end(&mut buf);
            let _ = io::copy(&mut stderr, &mut io::sink());
            buf
        })
    });

    let mut stdout = Vec::new();
    if let Some(out) = child.stdout.take() {
        out.take(limit as u64 + 1)
            .read_to_end(&mut stdout)
            .map_err(read_err)?;
    }

    if stdout.len() > limit {
        error!(program, limit, "Inventory output exceeded limit, killing process");
        let _ = child.kill();
        let _ = child.wait();
        return Err(InventoryError::OutputTooLarge { limit });
    }

    let status = child.wait().map_err(read_err)?;
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Turns the captured process output into an inventory document.
pub fn parse_listing(program: &str, output: Output) -> Result<Value, InventoryError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(program, code = ?output.status.code(), stderr = %stderr, "Inventory listing failed");
        return Err(InventoryError::NonZeroExit {
            program: program.to_string(),
            code: output.status.code(),
            stderr,
        });
    }
    let value: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| InventoryError::InvalidOutput(e.to_string()))?;
    if !value.is_object() {
        return Err(InventoryError::InvalidOutput(
            "expected a mapping from component type to connectors".to_string(),
        ));
    }
    Ok(value)
}
