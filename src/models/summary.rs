use serde::{Deserialize, Serialize};

/// A single failing result attempt, flattened out of the report tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    /// `suite > test`, or just the test title when there is no suite title.
    pub test_name: String,
    pub file_path: String,
    pub line_number: Option<u32>,
    pub error_message: String,
    pub stack_trace: String,
    /// Milliseconds.
    pub duration: f64,
    pub retry_count: u32,
    pub project_name: Option<String>,
    pub browser: Option<String>,
}

/// Run-level facts taken from the report's `config` section.
///
/// Every field is always present so downstream consumers never have to
/// guess at a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub total_tests: u64,
    pub tool_version: String,
    pub projects: Vec<String>,
    pub workers: u64,
    pub timeout: u64,
    pub test_dir: String,
    pub reporter: String,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            total_tests: 0,
            tool_version: "unknown".into(),
            projects: Vec::new(),
            workers: 1,
            timeout: 30_000,
            test_dir: String::new(),
            reporter: "json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    pub duration_ms: f64,
    /// In traversal order. May be capped; the counts above never are.
    pub failures: Vec<TestFailure>,
    pub metadata: RunMetadata,
}

impl FailureSummary {
    pub fn has_failures(&self) -> bool {
        self.failed_tests > 0
    }

    /// Number of failures left out of `failures` by the cap.
    pub fn omitted_failures(&self) -> u64 {
        self.failed_tests.saturating_sub(self.failures.len() as u64)
    }
}
