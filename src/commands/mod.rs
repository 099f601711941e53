use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::model::{FileOutcome, FileStatus, RunReport};
use crate::util::{now_utc_string, write_json_pretty};

pub mod apply;
pub mod auto;
pub mod extract;
pub mod inspect;

/// Per-file result of one conversion, before it is joined with the file's
/// identity for the run report.
pub(crate) struct Conversion {
    pub status: FileStatus,
    pub detail: Option<String>,
    pub warnings: Vec<String>,
    pub bookmark_count: Option<usize>,
}

impl Conversion {
    pub fn success(warnings: Vec<String>, bookmark_count: Option<usize>) -> Self {
        Self {
            status: FileStatus::Success,
            detail: None,
            warnings,
            bookmark_count,
        }
    }

    pub fn skipped(detail: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            status: FileStatus::Skipped,
            detail: Some(detail.into()),
            warnings,
            bookmark_count: None,
        }
    }

    pub fn into_outcome(self, filename: String, sha256: Option<String>) -> FileOutcome {
        FileOutcome {
            filename,
            sha256,
            status: self.status,
            detail: self.detail,
            warnings: self.warnings,
            bookmark_count: self.bookmark_count,
        }
    }
}

pub(crate) fn failed_outcome(
    filename: String,
    sha256: Option<String>,
    error: &anyhow::Error,
) -> FileOutcome {
    FileOutcome {
        filename,
        sha256,
        status: FileStatus::Failed,
        detail: Some(format!("{error:#}")),
        warnings: Vec::new(),
        bookmark_count: None,
    }
}

pub(crate) fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Logs per-file outcomes, writes the JSON run report into the output folder,
/// and summarizes the batch. A failed file never fails the run.
pub(crate) fn finish_run(
    command: &str,
    source: &Path,
    output: &Path,
    outcomes: Vec<FileOutcome>,
) -> Result<()> {
    for outcome in &outcomes {
        let detail = outcome.detail.as_deref().unwrap_or("");
        match outcome.status {
            FileStatus::Success => {
                info!(file = %outcome.filename, "converted");
            }
            FileStatus::Skipped => {
                info!(file = %outcome.filename, detail = %detail, "skipped");
            }
            FileStatus::Failed => {
                warn!(file = %outcome.filename, detail = %detail, "conversion failed");
            }
        }
        for warning in &outcome.warnings {
            warn!(file = %outcome.filename, warning = %warning, "conversion warning");
        }
    }

    let report = build_report(command, source, output, outcomes);

    let report_path = output.join(format!("{command}_report.json"));
    write_json_pretty(&report_path, &report)?;

    info!(
        path = %report_path.display(),
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        "batch completed"
    );
    Ok(())
}

pub(crate) fn build_report(
    command: &str,
    source: &Path,
    output: &Path,
    outcomes: Vec<FileOutcome>,
) -> RunReport {
    let count_with = |status: FileStatus| {
        outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    };

    RunReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        command: command.to_string(),
        source_directory: source.display().to_string(),
        output_directory: output.display().to_string(),
        file_count: outcomes.len(),
        succeeded: count_with(FileStatus::Success),
        skipped: count_with(FileStatus::Skipped),
        failed: count_with(FileStatus::Failed),
        outcomes,
    }
}
