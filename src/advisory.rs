//! Exchange format with an external failure analyzer.
//!
//! `parse` can write an [`AdvisoryRequest`] for the analyzer to consume; `issue`
//! reads whatever the analyzer wrote back and folds it into the issue body.
//! A missing or unreadable advisory never blocks issue creation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{FailureSummary, RunMetadata, TestFailure};

/// Failures included in a request; the rest are only counted.
pub const MAX_REQUEST_FAILURES: usize = 5;

const DEFAULT_MODEL: &str = "external analyzer";
const DEFAULT_SUMMARY: &str = "AI analysis completed";
const DEFAULT_ROOT_CAUSE: &str = "No specific root cause identified";
const MAX_SUMMARY_CHARS: usize = 200;
const MAX_ROOT_CAUSE_CHARS: usize = 500;
const MAX_ACTIONS: usize = 5;

#[derive(Debug, Serialize)]
pub struct AdvisoryRequest<'a> {
    pub total_tests: u64,
    pub failed_tests: u64,
    pub omitted_failures: u64,
    pub metadata: &'a RunMetadata,
    pub failures: &'a [TestFailure],
}

impl<'a> AdvisoryRequest<'a> {
    pub fn new(summary: &'a FailureSummary) -> Self {
        let failures = &summary.failures[..summary.failures.len().min(MAX_REQUEST_FAILURES)];
        Self {
            total_tests: summary.total_tests,
            failed_tests: summary.failed_tests,
            omitted_failures: summary.failed_tests.saturating_sub(failures.len() as u64),
            metadata: &summary.metadata,
            failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub summary: String,
    pub root_cause_analysis: String,
    pub suggested_actions: Vec<String>,
    pub confidence_score: f64,
    pub model: String,
    pub error_patterns: Vec<String>,
}

// --- Analyzer response deserialization types ---

#[derive(Debug, Deserialize)]
struct AdvisoryResponse {
    summary: Option<String>,
    root_cause_analysis: Option<String>,
    #[serde(default)]
    suggested_actions: Vec<String>,
    confidence_score: Option<f64>,
    model: Option<String>,
    #[serde(default)]
    error_patterns: Vec<String>,
}

impl Advisory {
    /// Parse analyzer output: a JSON object, or free text as a fallback.
    pub fn parse(text: &str, model: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            match serde_json::from_str::<AdvisoryResponse>(trimmed) {
                Ok(r) => {
                    return Self {
                        summary: r.summary.unwrap_or_else(|| DEFAULT_SUMMARY.into()),
                        root_cause_analysis: r
                            .root_cause_analysis
                            .unwrap_or_else(|| DEFAULT_ROOT_CAUSE.into()),
                        suggested_actions: r.suggested_actions,
                        confidence_score: r.confidence_score.unwrap_or(0.5).clamp(0.0, 1.0),
                        model: r.model.unwrap_or_else(|| model.to_string()),
                        error_patterns: r.error_patterns,
                    };
                }
                Err(e) => tracing::debug!("Advisory is not valid JSON, parsing as text: {}", e),
            }
        }
        Self::parse_text(trimmed, model)
    }

    fn parse_text(text: &str, model: &str) -> Self {
        let summary = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(DEFAULT_SUMMARY);

        let suggested_actions = text
            .lines()
            .map(str::trim)
            .filter(|l| {
                l.starts_with("- ") || l.starts_with("* ") || l.starts_with("1.") || l.starts_with("2.")
            })
            .map(|l| {
                l.trim_start_matches(|c: char| c.is_ascii_digit() || "-*. ".contains(c))
                    .to_string()
            })
            .take(MAX_ACTIONS)
            .collect();

        Self {
            summary: summary.chars().take(MAX_SUMMARY_CHARS).collect(),
            root_cause_analysis: text.chars().take(MAX_ROOT_CAUSE_CHARS).collect(),
            suggested_actions,
            confidence_score: 0.7,
            model: model.to_string(),
            error_patterns: Vec::new(),
        }
    }

    /// One-line headline, worded by confidence.
    pub fn headline(&self) -> String {
        let prefix = if self.confidence_score >= 0.8 {
            "AI Analysis"
        } else if self.confidence_score >= 0.6 {
            "AI Insights"
        } else {
            "AI Notes"
        };
        format!("🤖 {}: {}", prefix, self.summary)
    }
}

/// Read the analyzer's output. Any failure is logged and yields `None`.
pub fn load(path: &Path) -> Option<Advisory> {
    match read(path) {
        Ok(advisory) => {
            tracing::info!("Loaded advisory: {}", advisory.headline());
            Some(advisory)
        }
        Err(e) => {
            tracing::warn!("Skipping advisory: {:#}", e);
            None
        }
    }
}

fn read(path: &Path) -> Result<Advisory> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    anyhow::ensure!(!text.trim().is_empty(), "{} is empty", path.display());
    Ok(Advisory::parse(&text, DEFAULT_MODEL))
}

/// Markdown section for the issue body.
pub fn render_section(advisory: &Advisory) -> String {
    let mut lines = vec![
        "## 🤖 AI Analysis".to_string(),
        String::new(),
        format!("**Summary**: {}", advisory.summary),
        String::new(),
        "### Root Cause Analysis".to_string(),
        advisory.root_cause_analysis.clone(),
        String::new(),
    ];

    if !advisory.suggested_actions.is_empty() {
        lines.push("### Suggested Actions".into());
        lines.push(String::new());
        for (i, action) in advisory.suggested_actions.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, action));
        }
        lines.push(String::new());
    }

    if !advisory.error_patterns.is_empty() {
        lines.push("### Error Patterns Identified".into());
        lines.push(String::new());
        for pattern in &advisory.error_patterns {
            lines.push(format!("- {}", pattern));
        }
        lines.push(String::new());
    }

    lines.push("---".into());
    lines.push(format!(
        "*Analysis generated by {} (confidence: {:.1}%)*",
        advisory.model,
        advisory.confidence_score * 100.0
    ));

    lines.join("\n")
}
