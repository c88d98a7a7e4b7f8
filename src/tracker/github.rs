use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ActionError, ErrorCode, Severity};

use super::{Issue, IssueTracker, IssueUpdate, NewIssue, TrackerError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("failure-bundler/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// How requests are retried.
///
/// Transport failures consume one attempt each and back off exponentially.
/// A 429 waits for the server-provided interval and repeats the same attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// Wait used when a 429 carries no usable `Retry-After`.
    pub default_retry_after: Duration,
    /// Upper bound on 429 waits per request.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(60),
            max_rate_limit_waits: 5,
        }
    }
}

impl RetryPolicy {
    /// `backoff_base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt.min(16))
    }
}

/// GitHub Issues REST client scoped to one repository.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    repository: String,
    token: String,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(
        token: impl Into<String>,
        repository: impl Into<String>,
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ActionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ActionError::new(
                    ErrorCode::UnexpectedError,
                    Severity::Critical,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.into(),
            token: token.into(),
            retry,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(endpoint))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send a request built by `build`, applying the retry policy.
    async fn send<F>(&self, build: F) -> Result<reqwest::Response, TrackerError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempt = 0;
        let mut rate_limit_waits = 0;

        loop {
            let response = match build().send().await {
                Ok(response) => response,
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(TrackerError::Transport(e));
                    }
                    let delay = self.retry.backoff_delay(attempt - 1);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS
                && rate_limit_waits < self.retry.max_rate_limit_waits
            {
                rate_limit_waits += 1;
                let wait =
                    retry_after(response.headers()).unwrap_or(self.retry.default_retry_after);
                tracing::warn!("Rate limited. Waiting {} seconds...", wait.as_secs());
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(translate_status(status.as_u16(), &body).into());
            }

            return Ok(response);
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TrackerError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            TrackerError::Api(
                ActionError::new(
                    ErrorCode::ApiServerError,
                    Severity::High,
                    format!("Unexpected response from GitHub API: {}", e),
                )
                .with_detail("status_code", status)
                .with_detail("response", body),
            )
        })
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn search(&self, query: &str) -> Result<Vec<Issue>, TrackerError> {
        let q = format!("repo:{} {}", self.repository, query);
        tracing::debug!("Searching issues: {}", q);

        let response = self
            .send(|| {
                self.request(reqwest::Method::GET, "/search/issues").query(&[
                    ("q", q.as_str()),
                    ("sort", "created"),
                    ("order", "desc"),
                ])
            })
            .await?;

        let results: SearchResponse = Self::decode(response).await?;
        Ok(results.items)
    }

    async fn create(&self, issue: &NewIssue) -> Result<Issue, TrackerError> {
        let endpoint = format!("/repos/{}/issues", self.repository);
        let response = self
            .send(|| self.request(reqwest::Method::POST, &endpoint).json(issue))
            .await?;
        Self::decode(response).await
    }

    async fn update(&self, number: u64, update: &IssueUpdate) -> Result<Issue, TrackerError> {
        let endpoint = format!("/repos/{}/issues/{}", self.repository, number);
        let response = self
            .send(|| self.request(reqwest::Method::PATCH, &endpoint).json(update))
            .await?;
        Self::decode(response).await
    }

    fn name(&self) -> &str {
        "GitHub"
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map an error status to the taxonomy. Status and body always go in the details.
pub fn translate_status(status: u16, body: &str) -> ActionError {
    let error = match status {
        401 => ActionError::new(
            ErrorCode::InvalidToken,
            Severity::Critical,
            "GitHub API authentication failed",
        )
        .with_suggestions([
            "Check that GITHUB_TOKEN is valid and not expired",
            "Ensure the token has the required permissions",
            "Generate a new token if necessary",
        ]),
        403 | 429 if status == 429 || body.to_lowercase().contains("rate limit") => {
            ActionError::new(
                ErrorCode::ApiRateLimit,
                Severity::Medium,
                "GitHub API rate limit exceeded",
            )
            .with_suggestions([
                "Wait for the rate limit to reset",
                "Consider using a different token with higher limits",
                "Reduce the frequency of API calls",
            ])
        }
        403 => ActionError::new(
            ErrorCode::ApiPermissionDenied,
            Severity::Critical,
            "Insufficient permissions for GitHub API operation",
        )
        .with_suggestions([
            "Ensure the token has 'issues: write' permissions",
            "Check repository access permissions",
            "Verify the workflow has the correct permissions block",
        ]),
        404 => ActionError::new(
            ErrorCode::ApiNotFound,
            Severity::High,
            "GitHub API resource not found",
        )
        .with_suggestions([
            "Check that the repository exists and is accessible",
            "Verify the repository name is correct",
            "Ensure the token has access to the repository",
        ]),
        s if s >= 500 => ActionError::new(
            ErrorCode::ApiServerError,
            Severity::Medium,
            "GitHub API server error",
        )
        .with_suggestions([
            "This is likely a temporary issue with GitHub",
            "Try running the action again",
            "Check GitHub's status page for known issues",
        ]),
        s => ActionError::new(
            ErrorCode::ApiServerError,
            Severity::High,
            format!("GitHub API error: {}", s),
        )
        .with_suggestions([
            "Check the GitHub API documentation",
            "Verify the request format is correct",
        ]),
    };

    error
        .with_detail("status_code", status)
        .with_detail("response", body)
}

// --- Response deserialization types ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Issue>,
}
