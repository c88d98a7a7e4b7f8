use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ActionError, ErrorCode, Severity};
use crate::models::{FailureSummary, ResultStatus, RunMetadata, TestFailure};
use crate::text::strip_ansi;

const REQUIRED_FIELDS: [&str; 2] = ["stats", "suites"];

/// Parse raw report bytes into a summary.
pub fn parse(bytes: &[u8], max_failures: Option<usize>) -> Result<FailureSummary, ActionError> {
    let report: Value = serde_json::from_slice(bytes).map_err(|e| {
        ActionError::new(
            ErrorCode::InvalidJson,
            Severity::High,
            format!("Invalid JSON in report file: {}", e),
        )
        .with_suggestions([
            "Ensure the report file is complete and not truncated",
            "Regenerate the Playwright report",
            "Check that Playwright completed successfully",
        ])
    })?;

    parse_value(&report, max_failures)
}

/// Validate the report shape, flatten the suite tree and assemble the summary.
pub fn parse_value(
    report: &Value,
    max_failures: Option<usize>,
) -> Result<FailureSummary, ActionError> {
    let empty = Map::new();
    let root = report.as_object().unwrap_or(&empty);

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !root.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(ActionError::new(
            ErrorCode::InvalidReportFormat,
            Severity::High,
            format!("Report missing required fields: {}", missing.join(", ")),
        )
        .with_detail("missing_fields", missing)
        .with_detail("available_fields", root.keys().cloned().collect::<Vec<_>>())
        .with_suggestions([
            "Ensure Playwright is configured to generate JSON reports",
            "Check that the report file is complete and not truncated",
            "Verify you're using a compatible version of Playwright",
        ]));
    }

    let stats = root
        .get("stats")
        .and_then(Value::as_object)
        .ok_or_else(|| corrupted("Report stats section is not in expected format"))?;
    let suites = root
        .get("suites")
        .and_then(Value::as_array)
        .ok_or_else(|| corrupted("Report suites section is not in expected format"))?;

    let passed_tests = stat_count(stats, "expected")?;
    let failed_tests = stat_count(stats, "unexpected")?;
    let skipped_tests = stat_count(stats, "skipped")?;
    let total_tests = passed_tests + failed_tests + skipped_tests;

    if total_tests == 0 {
        return Err(ActionError::new(
            ErrorCode::NoTestResults,
            Severity::Medium,
            "No test results found in the report",
        )
        .with_suggestions([
            "Ensure tests were actually executed",
            "Check that test files are being discovered by Playwright",
            "Verify the test configuration is correct",
        ]));
    }

    let duration_ms = stats.get("duration").and_then(Value::as_f64).unwrap_or(0.0);

    let mut failures = Vec::new();
    for suite in suites {
        collect_suite(suite, &mut failures);
    }

    // Never more records than failed tests, whatever the cap.
    let failed = usize::try_from(failed_tests).unwrap_or(usize::MAX);
    let keep = max_failures.map_or(failed, |cap| cap.min(failed));
    if failures.len() > keep {
        tracing::debug!("Capping {} extracted failures at {}", failures.len(), keep);
        failures.truncate(keep);
    }

    Ok(FailureSummary {
        total_tests,
        passed_tests,
        failed_tests,
        skipped_tests,
        duration_ms,
        failures,
        metadata: run_metadata(root.get("config"), total_tests),
    })
}

fn corrupted(message: &str) -> ActionError {
    ActionError::new(ErrorCode::CorruptedReport, Severity::High, message)
        .with_suggestions(["Regenerate the Playwright report"])
}

fn stat_count(stats: &Map<String, Value>, key: &str) -> Result<u64, ActionError> {
    match stats.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or_else(|| {
            corrupted("Report stats section is not in expected format")
                .with_detail("field", key)
                .with_detail("value", value.clone())
        }),
    }
}

/// Child collection of a node. Anything that is not an array is treated as empty.
fn children<'a>(node: &'a Value, key: &str) -> &'a [Value] {
    match node.get(key) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => &[],
        Some(_) => {
            tracing::warn!("Ignoring '{}' entry that is not a list", key);
            &[]
        }
    }
}

fn collect_suite(suite: &Value, out: &mut Vec<TestFailure>) {
    if !suite.is_object() {
        tracing::warn!("Skipping suite entry that is not an object");
        return;
    }

    // Nested suites first, then this suite's own specs.
    for nested in children(suite, "suites") {
        collect_suite(nested, out);
    }

    let suite_title = suite.get("title").and_then(Value::as_str).unwrap_or("");
    for spec in children(suite, "specs") {
        collect_spec(spec, suite_title, out);
    }
}

fn collect_spec(spec: &Value, suite_title: &str, out: &mut Vec<TestFailure>) {
    let spec_file = spec.get("file").and_then(Value::as_str);

    for test in children(spec, "tests") {
        // Retries append attempts; the last one is the test's outcome.
        let Some(result) = children(test, "results").last() else {
            continue;
        };
        let status = result
            .get("status")
            .and_then(Value::as_str)
            .map(ResultStatus::from_report)
            .unwrap_or_default();
        if !status.is_failure() {
            continue;
        }

        match build_failure(test, result, spec_file, suite_title) {
            Ok(failure) => out.push(failure),
            Err(e) => tracing::warn!("Failed to parse test failure: {}", e),
        }
    }
}

fn build_failure(
    test: &Value,
    result: &Value,
    spec_file: Option<&str>,
    suite_title: &str,
) -> Result<TestFailure, serde_json::Error> {
    let test = ReportTest::deserialize(test)?;
    let result = ReportResult::deserialize(result)?;

    let (error_message, stack_trace) = match result.error {
        Some(err) => (
            err.message.map(|m| strip_ansi(&m)).unwrap_or_else(|| "Unknown error".into()),
            err.stack.map(|s| strip_ansi(&s)).unwrap_or_default(),
        ),
        None => ("Unknown error".into(), String::new()),
    };

    let (location_file, line_number) = match test.location {
        Some(loc) => (loc.file, loc.line),
        None => (None, None),
    };
    let file_path = location_file
        .or_else(|| spec_file.map(str::to_string))
        .unwrap_or_else(|| "unknown".into());

    let test_title = test.title.unwrap_or_else(|| "Unknown test".into());
    let test_name = if suite_title.is_empty() {
        test_title
    } else {
        format!("{} > {}", suite_title, test_title)
    };

    let project_name = result
        .project_name
        .or(test.project_name)
        .or_else(|| result.worker_index.map(|i| format!("worker-{}", i)));

    Ok(TestFailure {
        test_name,
        file_path,
        line_number,
        error_message,
        stack_trace,
        duration: result.duration.unwrap_or(0.0),
        retry_count: result.retry.unwrap_or(0),
        project_name,
        browser: None,
    })
}

fn run_metadata(config: Option<&Value>, total_tests: u64) -> RunMetadata {
    let mut metadata = RunMetadata {
        total_tests,
        ..RunMetadata::default()
    };
    let Some(config) = config.filter(|c| c.is_object()) else {
        return metadata;
    };

    if let Some(version) = config.get("version").and_then(Value::as_str) {
        metadata.tool_version = version.to_string();
    }
    if let Some(projects) = config.get("projects").and_then(Value::as_array) {
        metadata.projects = projects
            .iter()
            .map(|p| {
                p.get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("default")
                    .to_string()
            })
            .collect();
    }
    if let Some(workers) = config.get("workers").and_then(Value::as_u64) {
        metadata.workers = workers;
    }
    if let Some(timeout) = config.get("timeout").and_then(Value::as_u64) {
        metadata.timeout = timeout;
    }
    if let Some(test_dir) = config.get("testDir").and_then(Value::as_str) {
        metadata.test_dir = test_dir.to_string();
    }

    metadata
}

// --- Report deserialization types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportTest {
    title: Option<String>,
    location: Option<ReportLocation>,
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportLocation {
    file: Option<String>,
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResult {
    duration: Option<f64>,
    retry: Option<u32>,
    error: Option<ReportError>,
    project_name: Option<String>,
    worker_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ReportError {
    message: Option<String>,
    stack: Option<String>,
}
