///
/// This module implements the full CLI interface for connect-docs: command
/// parsing, argument exposure, and the async entrypoint used by `main` and by
/// integration tests.
///
/// All business logic (merging, diffing, reconciliation, rendering) lives in
/// the [`connect-docs-core`] crate. This module only wires files to it.
///
/// ## How To Use
/// - For command-line users: run the `connect-docs` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`connect-docs-core`]: ../../connect-docs-core/
use crate::load_config::load_config;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use connect_docs_core::binary_analysis::{analyze_binaries, annotate_availability, BinaryAnalysis};
use connect_docs_core::diff::{generate_connector_diff, DiffOptions};
use connect_docs_core::emit::emit_component_docs;
use connect_docs_core::fetch::ReleaseFetcher;
use connect_docs_core::inventory::{select_source, Platform};
use connect_docs_core::report::{read_diff, render_availability, render_summary, write_diff};
use connect_docs_core::schema::{load_merged_schema, load_schema};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ANALYSIS_FILE_NAME: &str = "binary-analysis.json";

/// CLI for connect-docs: build documentation data for Redpanda Connect.
#[derive(Parser)]
#[clap(
    name = "connect-docs",
    version,
    about = "Merge, diff, render and reconcile Redpanda Connect connector data for documentation"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply an override file to a connector schema
    Merge {
        /// Connector schema (JSON or YAML)
        #[clap(long)]
        schema: PathBuf,
        /// Override document (JSON)
        #[clap(long)]
        overrides: Option<PathBuf>,
        /// Where to write the merged schema
        #[clap(long)]
        output: PathBuf,
    },
    /// Compare two connector schema versions and write the diff artifact
    Diff {
        #[clap(long)]
        old: PathBuf,
        #[clap(long)]
        new: PathBuf,
        #[clap(long)]
        old_version: String,
        #[clap(long)]
        new_version: String,
        #[clap(long)]
        old_overrides: Option<PathBuf>,
        #[clap(long)]
        new_overrides: Option<PathBuf>,
        /// Directory for connect-diff-<old>_to_<new>.json
        #[clap(long)]
        output_dir: PathBuf,
    },
    /// Render AsciiDoc field and example partials for every component
    Docs {
        #[clap(long)]
        schema: PathBuf,
        #[clap(long)]
        overrides: Option<PathBuf>,
        #[clap(long)]
        output_dir: PathBuf,
    },
    /// Introspect the OSS, Cloud and cgo binaries and reconcile their connectors
    Analyze {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Schema to annotate with cloudSupported/requiresCgo
        #[clap(long, requires = "annotated_output")]
        schema: Option<PathBuf>,
        #[clap(long, requires = "schema")]
        annotated_output: Option<PathBuf>,
    },
    /// Print a Markdown summary of a diff artifact, optionally with availability
    Report {
        #[clap(long)]
        diff: PathBuf,
        #[clap(long)]
        analysis: Option<PathBuf>,
    },
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Merge {
            schema,
            overrides,
            output,
        } => {
            tracing::info!(command = "merge", schema = %schema.display(), "Merging overrides");
            let merged = load_merged_schema(&schema, overrides.as_deref())
                .with_context(|| format!("Failed to merge overrides into {}", schema.display()))?;
            write_json(&output, &merged)?;
            println!("Merged schema written to {}", output.display());
            Ok(())
        }
        Commands::Diff {
            old,
            new,
            old_version,
            new_version,
            old_overrides,
            new_overrides,
            output_dir,
        } => {
            tracing::info!(command = "diff", %old_version, %new_version, "Diffing connector schemas");
            let old_doc = load_merged_schema(&old, old_overrides.as_deref())
                .with_context(|| format!("Failed to load old schema {}", old.display()))?;
            let new_doc = load_merged_schema(&new, new_overrides.as_deref())
                .with_context(|| format!("Failed to load new schema {}", new.display()))?;
            let result = generate_connector_diff(
                &old_doc,
                &new_doc,
                DiffOptions {
                    old_version,
                    new_version,
                    timestamp: now(),
                },
            );
            let path = write_diff(&output_dir, &result)?;
            println!("{}", render_summary(&result));
            println!("Diff written to {}", path.display());
            Ok(())
        }
        Commands::Docs {
            schema,
            overrides,
            output_dir,
        } => {
            tracing::info!(command = "docs", schema = %schema.display(), "Emitting doc fragments");
            let merged = load_merged_schema(&schema, overrides.as_deref())
                .with_context(|| format!("Failed to load schema {}", schema.display()))?;
            let written = emit_component_docs(&merged, &output_dir)?;
            println!("Wrote {} fragments to {}", written.len(), output_dir.display());
            Ok(())
        }
        Commands::Analyze {
            config,
            schema,
            annotated_output,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "analyze", "Starting binary analysis");
            let analysis_config = config.analysis();
            let fetcher = ReleaseFetcher::new_from_env();
            let platform = Platform::current();
            let analysis = analyze_binaries(&analysis_config, &fetcher, |_, spec| {
                select_source(&platform, spec.linux_only(), &analysis_config.docker_image)
            })
            .await
            .context("Binary analysis failed")?;

            let out = config.output_dir.join(ANALYSIS_FILE_NAME);
            write_json(&out, &analysis)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            tracing::info!(command = "analyze", path = %out.display(), "Analysis written");

            if let (Some(schema), Some(annotated_output)) = (schema, annotated_output) {
                let mut doc = load_schema(&schema)?;
                let touched = annotate_availability(&mut doc, &analysis);
                write_json(&annotated_output, &doc)?;
                tracing::info!(touched, path = %annotated_output.display(), "Annotated schema written");
            }
            Ok(())
        }
        Commands::Report { diff, analysis } => {
            tracing::info!(command = "report", diff = %diff.display(), "Rendering report");
            let result = read_diff(&diff)
                .with_context(|| format!("Failed to read diff {}", diff.display()))?;
            let mut out = render_summary(&result);
            if let Some(path) = analysis {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read analysis {}", path.display()))?;
                let analysis: BinaryAnalysis = serde_json::from_str(&content)?;
                out.push_str(&render_availability(&analysis));
            }
            println!("{out}");
            Ok(())
        }
    }
}
