use serde::{Deserialize, Serialize};

/// Outcome of a single result attempt as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
    #[default]
    #[serde(other)]
    Other,
}

impl ResultStatus {
    pub fn from_report(status: &str) -> Self {
        match status {
            "passed" => ResultStatus::Passed,
            "failed" => ResultStatus::Failed,
            "timedOut" => ResultStatus::TimedOut,
            "skipped" => ResultStatus::Skipped,
            "interrupted" => ResultStatus::Interrupted,
            _ => ResultStatus::Other,
        }
    }

    /// Only hard failures and timeouts are reported; skips and interrupts are not.
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultStatus::Failed | ResultStatus::TimedOut)
    }
}
