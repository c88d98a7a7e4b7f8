use std::sync::Arc;

use crate::advisory::Advisory;
use crate::models::FailureSummary;
use crate::tracker::{Issue, IssueTracker, IssueUpdate, NewIssue, TrackerError};

use super::IssueFormatter;

#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub title: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub deduplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome {
    pub number: u64,
    pub url: String,
    pub was_created: bool,
}

/// Creates an issue for a run, or refreshes the open one with the same title.
pub struct IssueManager {
    tracker: Arc<dyn IssueTracker>,
    formatter: IssueFormatter,
}

impl IssueManager {
    pub fn new(tracker: Arc<dyn IssueTracker>, formatter: IssueFormatter) -> Self {
        Self { tracker, formatter }
    }

    pub async fn create_or_update(
        &self,
        summary: &FailureSummary,
        request: &IssueRequest,
        advisory: Option<&Advisory>,
    ) -> Result<IssueOutcome, TrackerError> {
        let body = self.formatter.format_issue_body(summary, advisory);

        if request.deduplicate
            && let Some(existing) = self.find_existing(&request.title).await?
        {
            tracing::info!(
                "Found existing {} issue #{}: {}",
                self.tracker.name(),
                existing.number,
                existing.title
            );
            self.tracker
                .update(existing.number, &IssueUpdate::body(body))
                .await?;
            return Ok(IssueOutcome {
                number: existing.number,
                url: existing.html_url,
                was_created: false,
            });
        }

        tracing::info!("Creating new {} issue: {}", self.tracker.name(), request.title);
        let issue = self
            .tracker
            .create(&NewIssue {
                title: request.title.clone(),
                body,
                labels: request.labels.clone(),
                assignees: request.assignees.clone(),
            })
            .await?;

        Ok(IssueOutcome {
            number: issue.number,
            url: issue.html_url,
            was_created: true,
        })
    }

    /// First open issue whose title equals `title` exactly. Search matches
    /// on substrings, so near-misses are filtered out here.
    async fn find_existing(&self, title: &str) -> Result<Option<Issue>, TrackerError> {
        // Search syntax has no escape for quotes inside a phrase.
        let query = format!("is:open is:issue in:title \"{}\"", title.replace('"', ""));
        let issues = self.tracker.search(&query).await?;
        tracing::debug!("Dedup search returned {} candidates", issues.len());
        Ok(issues.into_iter().find(|issue| issue.title == title))
    }
}
