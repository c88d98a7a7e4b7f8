//! Machine-oriented export of a summary for automated fix tooling.
//!
//! Each failure carries its classification so consumers can pick a fix
//! strategy without re-deriving it from the message.

use serde::Serialize;

use crate::classify;
use crate::context::RunContext;
use crate::models::{FailureSummary, RunMetadata, TestFailure};

pub const FORMAT_VERSION: &str = "1.0";
pub const FORMAT_NAME: &str = "playwright-failure-analyzer-structured";

#[derive(Debug, Serialize)]
pub struct StructuredExport<'a> {
    pub version: &'static str,
    pub format: &'static str,
    pub generated_at: String,
    pub summary: ExportCounts,
    pub failures: Vec<ClassifiedFailure<'a>>,
    pub metadata: &'a RunMetadata,
    pub auto_fix_context: AutoFixContext,
}

#[derive(Debug, Serialize)]
pub struct ExportCounts {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    pub duration_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct ClassifiedFailure<'a> {
    pub test_name: &'a str,
    pub file_path: &'a str,
    pub line_number: Option<u32>,
    pub error_message: &'a str,
    pub error_type: &'static str,
    pub stack_trace: &'a str,
    pub duration_ms: f64,
    pub retry_count: u32,
    pub project_name: Option<&'a str>,
    pub browser: Option<&'a str>,
    pub fixability_hint: &'static str,
    pub suggested_pattern: &'static str,
}

impl<'a> From<&'a TestFailure> for ClassifiedFailure<'a> {
    fn from(f: &'a TestFailure) -> Self {
        Self {
            test_name: &f.test_name,
            file_path: &f.file_path,
            line_number: f.line_number,
            error_message: &f.error_message,
            error_type: classify::classify_error_type(&f.error_message).as_str(),
            stack_trace: &f.stack_trace,
            duration_ms: f.duration,
            retry_count: f.retry_count,
            project_name: f.project_name.as_deref(),
            browser: f.browser.as_deref(),
            fixability_hint: classify::fixability_hint(&f.error_message),
            suggested_pattern: classify::detect_pattern(&f.error_message).as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AutoFixContext {
    pub repository: String,
    pub sha: String,
    pub branch: String,
    pub workflow: String,
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".into()
    } else {
        value.to_string()
    }
}

impl<'a> StructuredExport<'a> {
    pub fn new(summary: &'a FailureSummary, ctx: &RunContext) -> Self {
        Self {
            version: FORMAT_VERSION,
            format: FORMAT_NAME,
            generated_at: if ctx.run_id.is_empty() {
                "local".into()
            } else {
                ctx.run_id.clone()
            },
            summary: ExportCounts {
                total_tests: summary.total_tests,
                passed_tests: summary.passed_tests,
                failed_tests: summary.failed_tests,
                skipped_tests: summary.skipped_tests,
                duration_ms: summary.duration_ms,
            },
            failures: summary.failures.iter().map(ClassifiedFailure::from).collect(),
            metadata: &summary.metadata,
            auto_fix_context: AutoFixContext {
                repository: or_unknown(&ctx.repository),
                sha: or_unknown(&ctx.sha),
                branch: ctx.branch_name(),
                workflow: or_unknown(&ctx.workflow),
            },
        }
    }
}
