use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ActionError, ErrorCode, Severity};
use crate::tracker::github::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::tracker::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "bundler.toml";
pub const DEFAULT_MAX_FAILURES: usize = 3;
pub const DEFAULT_ISSUE_TITLE: &str = "Playwright Test Failures";

const TOKEN_PREFIXES: [&str; 6] = ["ghp_", "gho_", "ghu_", "ghs_", "ghr_", "github_pat_"];
const CLASSIC_TOKEN_LEN: usize = 40;

/// File-level settings. CLI flags take precedence over every field here.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub issue: IssueConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportConfig {
    /// Failure records kept in the summary. Counts are never capped.
    pub max_failures: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueConfig {
    pub title: Option<String>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
    /// Update an open issue with the same title instead of creating a new one.
    pub deduplicate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackerConfig {
    /// Example: "https://github.example.com/api/v3"
    pub api_url: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load `path`, falling back to defaults if absent or invalid.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl TrackerConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            ..defaults
        }
    }
}

pub fn validate_token(token: Option<&str>) -> Result<String, ActionError> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(ActionError::new(
            ErrorCode::MissingToken,
            Severity::Critical,
            "GitHub token is required but not provided",
        )
        .with_suggestions([
            "Ensure GITHUB_TOKEN is set in your workflow",
            "Check that the token is passed to the action correctly",
            "Verify the token has not expired",
        ]));
    }

    let known_prefix = TOKEN_PREFIXES.iter().any(|p| token.starts_with(p));
    if !known_prefix && token.len() != CLASSIC_TOKEN_LEN {
        return Err(ActionError::new(
            ErrorCode::InvalidToken,
            Severity::High,
            "GitHub token appears to have invalid format",
        )
        .with_suggestions([
            "Verify the token is a valid GitHub personal access token",
            "Check that the token hasn't been truncated or modified",
            "Generate a new token if necessary",
        ]));
    }

    Ok(token.to_string())
}

/// `owner/repo`, exactly one slash.
pub fn validate_repository(repository: &str) -> Result<(), ActionError> {
    if repository.is_empty() {
        return Err(ActionError::new(
            ErrorCode::MissingRepository,
            Severity::Critical,
            "Repository information is required but not available",
        )
        .with_suggestions([
            "Ensure this action is running in a GitHub Actions workflow",
            "Check that GITHUB_REPOSITORY environment variable is set",
        ]));
    }

    if repository.matches('/').count() != 1 {
        return Err(ActionError::new(
            ErrorCode::InvalidConfig,
            Severity::High,
            format!("Invalid repository format: {}", repository),
        )
        .with_detail("repository", repository)
        .with_suggestions([
            "Repository should be in format 'owner/repo'",
            "Check GITHUB_REPOSITORY environment variable",
        ]));
    }

    Ok(())
}

pub fn validate_max_failures(value: &str) -> Result<usize, ActionError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 1 => {
            if n > 100 {
                tracing::warn!("max_failures is very high ({}). Consider using a lower value.", n);
            }
            usize::try_from(n).map_err(|_| invalid_max_failures(value))
        }
        _ => Err(invalid_max_failures(value)),
    }
}

fn invalid_max_failures(value: &str) -> ActionError {
    ActionError::new(
        ErrorCode::InvalidConfig,
        Severity::Medium,
        format!("Invalid max_failures value: {}", value),
    )
    .with_detail("max_failures", value)
    .with_suggestions([
        "max_failures must be a positive integer",
        "Typical values are between 1 and 10",
    ])
}
