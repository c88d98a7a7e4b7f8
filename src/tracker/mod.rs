pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ErrorCode, Severity};

pub use github::{GitHubClient, RetryPolicy};

/// Issue as returned by the tracker. Never cached locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl IssueUpdate {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The tracker answered with an error status.
    #[error(transparent)]
    Api(#[from] ActionError),
    /// The request never got an answer, even after retrying.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<TrackerError> for ActionError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Api(e) => e,
            TrackerError::Transport(e) => ActionError::new(
                ErrorCode::ApiNetworkError,
                Severity::Medium,
                format!("Network error talking to the issue tracker: {}", e),
            )
            .with_detail("timeout", e.is_timeout())
            .with_detail("connect", e.is_connect())
            .with_suggestions([
                "This is likely a temporary network issue",
                "Try running the action again",
            ]),
        }
    }
}

/// Operations the dedup manager needs from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Search issues; the query is scoped to the tracker's repository.
    async fn search(&self, query: &str) -> Result<Vec<Issue>, TrackerError>;

    async fn create(&self, issue: &NewIssue) -> Result<Issue, TrackerError>;

    async fn update(&self, number: u64, update: &IssueUpdate) -> Result<Issue, TrackerError>;

    /// Display name for this tracker (e.g., "GitHub").
    fn name(&self) -> &str;
}
