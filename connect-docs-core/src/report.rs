//! Diff artifacts on disk and human-readable summaries of diffs and binary
//! analyses. Entries are sorted by key here, and only here.

use crate::binary_analysis::{BinaryAnalysis, PhaseOutcome};
use crate::diff::DiffResult;
use crate::error::DocsResult;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// `connect-diff-<old>_to_<new>.json`
pub fn diff_file_name(old_version: &str, new_version: &str) -> String {
    format!("connect-diff-{old_version}_to_{new_version}.json")
}

/// Writes `result` as pretty JSON into `dir` and returns the file path.
pub fn write_diff(dir: &Path, result: &DiffResult) -> DocsResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(diff_file_name(
        &result.comparison.old_version,
        &result.comparison.new_version,
    ));
    fs::write(&path, serde_json::to_string_pretty(result)?)?;
    info!(path = %path.display(), "Wrote connector diff");
    Ok(path)
}

pub fn read_diff(path: &Path) -> DocsResult<DiffResult> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn section(out: &mut String, title: &str, mut lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    lines.sort();
    let _ = writeln!(out, "\n### {title}\n");
    for line in lines {
        let _ = writeln!(out, "- {line}");
    }
}

/// Markdown summary of a diff.
pub fn render_summary(result: &DiffResult) -> String {
    let c = &result.comparison;
    let s = &result.summary;
    let d = &result.details;
    let mut out = String::new();

    let _ = writeln!(out, "## Connector changes: {} → {}\n", c.old_version, c.new_version);
    let _ = writeln!(out, "_Generated {}_\n", c.timestamp);
    let _ = writeln!(out, "| Change | Count |");
    let _ = writeln!(out, "| --- | ---: |");
    for (label, count) in [
        ("New components", s.new_components),
        ("Removed components", s.removed_components),
        ("New fields", s.new_fields),
        ("Removed fields", s.removed_fields),
        ("Deprecated components", s.deprecated_components),
        ("Deprecated fields", s.deprecated_fields),
        ("Changed defaults", s.changed_defaults),
    ] {
        let _ = writeln!(out, "| {label} | {count} |");
    }

    if result.is_empty() {
        out.push_str("\nNo connector changes.\n");
        return out;
    }

    section(
        &mut out,
        "New components",
        d.new_components
            .iter()
            .map(|n| match &n.status {
                Some(status) => format!("`{}` ({status})", n.key),
                None => format!("`{}`", n.key),
            })
            .collect(),
    );
    section(
        &mut out,
        "Removed components",
        d.removed_components.iter().map(|r| format!("`{}`", r.key)).collect(),
    );
    section(
        &mut out,
        "New fields",
        d.new_fields
            .iter()
            .map(|f| match &f.introduced_in {
                Some(v) => format!("`{}`: `{}` (since {v})", f.component, f.field),
                None => format!("`{}`: `{}`", f.component, f.field),
            })
            .collect(),
    );
    section(
        &mut out,
        "Removed fields",
        d.removed_fields
            .iter()
            .map(|f| format!("`{}`: `{}`", f.component, f.field))
            .collect(),
    );
    section(
        &mut out,
        "Deprecated components",
        d.deprecated_components.iter().map(|r| format!("`{}`", r.key)).collect(),
    );
    section(
        &mut out,
        "Deprecated fields",
        d.deprecated_fields
            .iter()
            .map(|f| format!("`{}`: `{}`", f.component, f.field))
            .collect(),
    );
    section(
        &mut out,
        "Changed defaults",
        d.changed_defaults
            .iter()
            .map(|c| format!("`{}`: `{}` {} → {}", c.component, c.field, c.old_default, c.new_default))
            .collect(),
    );
    out
}

/// Markdown summary of a binary analysis.
pub fn render_availability(analysis: &BinaryAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n## Connector availability\n");
    let _ = writeln!(
        out,
        "- OSS: {} connectors ({})",
        analysis.oss.connectors, analysis.oss.binary
    );
    for (label, phase) in [("Cloud", &analysis.cloud), ("cgo", &analysis.cgo)] {
        let _ = match phase {
            PhaseOutcome::Ok(summary) => writeln!(
                out,
                "- {label}: {} connectors ({})",
                summary.connectors, summary.binary
            ),
            PhaseOutcome::Skipped { reason } => writeln!(out, "- {label}: skipped ({reason})"),
        };
    }

    if let Some(comparison) = &analysis.comparison {
        let _ = writeln!(
            out,
            "\n{} of {} OSS connectors are available in Cloud.",
            comparison.in_cloud.len(),
            comparison.total_oss
        );
        section(
            &mut out,
            "Self-hosted only",
            comparison.not_in_cloud.iter().map(|c| format!("`{}`", c.key())).collect(),
        );
        section(
            &mut out,
            "Cloud only",
            comparison.cloud_only.iter().map(|c| format!("`{}`", c.key())).collect(),
        );
    }
    section(
        &mut out,
        "Requires cgo",
        analysis.cgo_only.iter().map(|c| format!("`{}`", c.key())).collect(),
    );
    out
}
