pub mod playwright;
pub mod structured;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ActionError, ErrorCode, Severity};
use crate::models::FailureSummary;

pub use structured::StructuredExport;

/// Read a report from disk and extract its failure summary.
pub fn load(path: &Path, max_failures: Option<usize>) -> Result<FailureSummary, ActionError> {
    let bytes = read_file(path, "Playwright report")?;
    let summary = playwright::parse(&bytes, max_failures)?;

    tracing::info!(
        "Parsed {} tests ({} failed, {} failure records)",
        summary.total_tests,
        summary.failed_tests,
        summary.failures.len()
    );
    Ok(summary)
}

/// Read a summary written by an earlier `parse` step.
pub fn read_summary(path: &Path) -> Result<FailureSummary, ActionError> {
    read_json(path, "Failure summary")
}

pub fn write_summary(path: &Path, summary: &FailureSummary) -> Result<(), ActionError> {
    write_json(path, summary)
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>, ActionError> {
    if path.as_os_str().is_empty() {
        return Err(ActionError::new(
            ErrorCode::InvalidConfig,
            Severity::High,
            format!("{} path is required", what),
        )
        .with_suggestions(["Specify a valid path to the JSON file"]));
    }

    if !path.exists() {
        return Err(ActionError::new(
            ErrorCode::FileNotFound,
            Severity::High,
            format!("{} file not found: {}", what, path.display()),
        )
        .with_detail("path", path.display().to_string())
        .with_suggestions([
            "Ensure Playwright tests have run and generated a JSON report",
            "Check the report path configuration",
            "Verify the report file wasn't deleted or moved",
        ]));
    }

    std::fs::read(path).map_err(|e| {
        ActionError::new(
            ErrorCode::FileReadError,
            Severity::High,
            format!("Failed to read {}: {}", path.display(), e),
        )
        .with_detail("path", path.display().to_string())
        .with_suggestions(["Check file permissions and disk space"])
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, ActionError> {
    let bytes = read_file(path, what)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ActionError::new(
            ErrorCode::InvalidJson,
            Severity::High,
            format!("Invalid JSON in {}: {}", path.display(), e),
        )
        .with_suggestions(["Check that the previous step completed successfully"])
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ActionError> {
    let write_error = |e: String| {
        ActionError::new(
            ErrorCode::FileWriteError,
            Severity::High,
            format!("Failed to write output file {}: {}", path.display(), e),
        )
        .with_suggestions(["Check file permissions and disk space"])
    };

    let json = serde_json::to_string_pretty(value).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| write_error(e.to_string()))
}
