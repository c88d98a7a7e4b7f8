use std::io::Write;
use std::path::PathBuf;

use crate::error::ActionError;

/// CI run context, read once from the environment at startup and passed
/// explicitly to everything that renders or exports it.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub repository: String,
    pub sha: String,
    pub git_ref: String,
    pub run_id: String,
    pub actor: String,
    pub workflow: String,
    pub server_url: String,
    /// File that step outputs are appended to (`GITHUB_OUTPUT`).
    pub output_file: Option<PathBuf>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            repository: String::new(),
            sha: String::new(),
            git_ref: String::new(),
            run_id: String::new(),
            actor: String::new(),
            workflow: String::new(),
            server_url: "https://github.com".into(),
            output_file: None,
        }
    }
}

impl RunContext {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        let defaults = Self::default();
        Self {
            repository: var("GITHUB_REPOSITORY"),
            sha: var("GITHUB_SHA"),
            git_ref: var("GITHUB_REF"),
            run_id: var("GITHUB_RUN_ID"),
            actor: var("GITHUB_ACTOR"),
            workflow: var("GITHUB_WORKFLOW"),
            server_url: std::env::var("GITHUB_SERVER_URL").unwrap_or(defaults.server_url),
            output_file: std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Human-readable branch for `refs/heads/x`, `refs/pull/N/merge` or a raw ref.
    pub fn branch_name(&self) -> String {
        if let Some(branch) = self.git_ref.strip_prefix("refs/heads/") {
            branch.to_string()
        } else if let Some(rest) = self.git_ref.strip_prefix("refs/pull/") {
            format!("PR #{}", rest.split('/').next().unwrap_or_default())
        } else if self.git_ref.is_empty() {
            "unknown".into()
        } else {
            self.git_ref.clone()
        }
    }

    pub fn short_sha(&self) -> &str {
        match self.sha.char_indices().nth(8) {
            Some((idx, _)) => &self.sha[..idx],
            None => &self.sha,
        }
    }

    pub fn run_url(&self) -> String {
        format!(
            "{}/{}/actions/runs/{}",
            self.server_url, self.repository, self.run_id
        )
    }

    /// Publish a step output, falling back to the legacy stdout command.
    pub fn set_output(&self, name: &str, value: &str) -> std::io::Result<()> {
        match self.output_file {
            Some(ref path) => {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                writeln!(file, "{}={}", name, value)
            }
            None => {
                println!("::set-output name={}::{}", name, value);
                Ok(())
            }
        }
    }

    /// Like `set_output`, but a failure only logs a warning.
    pub fn publish(&self, name: &str, value: &str) {
        if let Err(e) = self.set_output(name, value) {
            tracing::warn!("Failed to set output '{}': {}", name, e);
        }
    }
}

/// Workflow-command annotation for an error.
pub fn error_annotation(error: &ActionError) -> String {
    format!("::error title={}::{}", error.code, error.message)
}
