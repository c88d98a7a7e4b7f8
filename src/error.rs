use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Closed set of error codes surfaced to the workflow log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // File and I/O
    FileNotFound,
    FileReadError,
    FileWriteError,
    InvalidJson,

    // Configuration
    MissingToken,
    InvalidToken,
    MissingRepository,
    InvalidConfig,

    // Tracker API
    ApiRateLimit,
    ApiPermissionDenied,
    ApiNotFound,
    ApiServerError,
    ApiNetworkError,

    // Report parsing
    InvalidReportFormat,
    NoTestResults,
    CorruptedReport,

    UnexpectedError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileReadError => "FILE_READ_ERROR",
            ErrorCode::FileWriteError => "FILE_WRITE_ERROR",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::MissingToken => "MISSING_TOKEN",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::MissingRepository => "MISSING_REPOSITORY",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::ApiRateLimit => "API_RATE_LIMIT",
            ErrorCode::ApiPermissionDenied => "API_PERMISSION_DENIED",
            ErrorCode::ApiNotFound => "API_NOT_FOUND",
            ErrorCode::ApiServerError => "API_SERVER_ERROR",
            ErrorCode::ApiNetworkError => "API_NETWORK_ERROR",
            ErrorCode::InvalidReportFormat => "INVALID_REPORT_FORMAT",
            ErrorCode::NoTestResults => "NO_TEST_RESULTS",
            ErrorCode::CorruptedReport => "CORRUPTED_REPORT",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far an error propagates. Non-fatal conditions are logged as warnings
/// and never become an `ActionError`, so every severity ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Process exit code for an error of this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }
}

/// Error envelope carried from the point of detection up to `main`.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("[{code}] {message}")]
pub struct ActionError {
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ActionError {
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            details: None,
            suggestions: Vec::new(),
        }
    }

    /// Attach one structured detail entry.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.severity.exit_code()
    }
}

#[cfg(test)]
impl ActionError {
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }
}

/// Log an error the way the workflow expects and return the process exit code.
///
/// Emits `[CODE] message` through tracing, the structured details at debug
/// level, the suggestions on stderr, and a `::error` annotation on stdout.
pub fn report(error: &ActionError) -> i32 {
    tracing::error!("[{}] {}", error.code, error.message);

    if let Some(ref details) = error.details {
        let pretty = serde_json::to_string_pretty(details).unwrap_or_default();
        tracing::debug!("Error details: {}", pretty);
    }

    if !error.suggestions.is_empty() {
        eprintln!("\n💡 Suggestions:");
        for suggestion in &error.suggestions {
            eprintln!("  • {}", suggestion);
        }
    }

    println!("{}", crate::context::error_annotation(error));
    error.exit_code()
}
