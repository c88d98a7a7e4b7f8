use std::path::PathBuf;

use crate::advisory::{self, Advisory};
use crate::context::RunContext;
use crate::models::{FailureSummary, TestFailure};
use crate::text;

const MAX_STACK_LINES: usize = 20;

/// Renders a failure summary as an issue body.
#[derive(Debug, Clone)]
pub struct IssueFormatter {
    ctx: RunContext,
    cwd: Option<PathBuf>,
    title: Option<String>,
}

impl IssueFormatter {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            cwd: std::env::current_dir().ok(),
            title: None,
        }
    }

    /// Include a fingerprint of `title` and the failures in the debug table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn format_issue_body(&self, summary: &FailureSummary, advisory: Option<&Advisory>) -> String {
        let mut sections = vec![header(summary), run_summary(summary)];
        if let Some(advisory) = advisory {
            sections.push(advisory::render_section(advisory));
        }
        sections.push(self.failure_details(&summary.failures));
        sections.push(self.debug_info(summary));
        sections.push(NEXT_STEPS.to_string());

        let body = sections.join("\n\n");
        text::truncate(&text::sanitize(&body), text::MAX_BODY_CHARS)
    }

    fn failure_details(&self, failures: &[TestFailure]) -> String {
        if failures.is_empty() {
            return "## 📋 Failure Details\n\nNo failure details available.".into();
        }

        let mut details = vec!["## 📋 Failure Details".to_string()];
        for (i, failure) in failures.iter().enumerate() {
            details.push(format!(
                "### {}. {}\n\n\
                 - **File**: `{}`\n\
                 - **Duration**: {}\n\
                 - **Retries**: {}\n\
                 - **Error**:{}\n\n\
                 **Stack Trace**:\n{}",
                i + 1,
                failure.test_name,
                text::relative_path(&failure.file_path, None, self.cwd.as_deref()),
                text::format_duration(failure.duration),
                failure.retry_count,
                error_markup(&failure.error_message),
                code_fence(&text::format_stack_trace(&failure.stack_trace, MAX_STACK_LINES)),
            ));
        }
        details.join("\n\n")
    }

    fn debug_info(&self, summary: &FailureSummary) -> String {
        let ctx = &self.ctx;
        let mut rows = vec![
            "## 🔍 Debug Information".to_string(),
            String::new(),
            "| Field | Value |".into(),
            "|-------|-------|".into(),
            format!("| **Repository** | {} |", ctx.repository),
            format!("| **Commit** | `{}` |", ctx.short_sha()),
            format!("| **Branch** | `{}` |", ctx.branch_name()),
            format!("| **Run ID** | [{}]({}) |", ctx.run_id, ctx.run_url()),
            format!("| **Workflow** | {} |", ctx.workflow),
            format!("| **Actor** | @{} |", ctx.actor),
            format!(
                "| **Timestamp** | {} |",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ),
        ];

        let meta = &summary.metadata;
        if !meta.tool_version.is_empty() && meta.tool_version != "unknown" {
            rows.push(format!("| **Playwright Version** | {} |", meta.tool_version));
        }
        if !meta.projects.is_empty() {
            rows.push(format!("| **Projects** | {} |", meta.projects.join(", ")));
        }
        if meta.workers > 0 {
            rows.push(format!("| **Workers** | {} |", meta.workers));
        }
        if let Some(ref title) = self.title {
            rows.push(format!(
                "| **Fingerprint** | `{}` |",
                text::issue_fingerprint(title, &summary.failures)
            ));
        }

        rows.join("\n")
    }
}

/// Inline code for a plain one-line message, a fenced block for anything else.
fn error_markup(message: &str) -> String {
    if message.is_empty() {
        " `No error message`".into()
    } else if message.contains('\n') || message.contains('`') {
        format!("\n\n{}", code_fence(message))
    } else {
        format!(" `{}`", message)
    }
}

/// Fenced code block whose fence is longer than any backtick run in `content`.
fn code_fence(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}\n{content}\n{fence}")
}

fn header(summary: &FailureSummary) -> String {
    format!(
        "# 🚨 Playwright Test Failures Detected\n\n\
         **Summary**: {} test failure{} detected out of {} total tests.",
        summary.failed_tests,
        if summary.failed_tests == 1 { "" } else { "s" },
        summary.total_tests
    )
}

fn run_summary(summary: &FailureSummary) -> String {
    let mut table = format!(
        "## 📊 Test Run Summary\n\n\
         | Metric | Value |\n\
         |--------|-------|\n\
         | **Total Tests** | {} |\n\
         | **Passed** | ✅ {} |\n\
         | **Failed** | ❌ {} |\n\
         | **Skipped** | ⏭️ {} |\n\
         | **Duration** | {} |",
        summary.total_tests,
        summary.passed_tests,
        summary.failed_tests,
        summary.skipped_tests,
        text::format_duration(summary.duration_ms)
    );
    let omitted = summary.omitted_failures();
    if omitted > 0 {
        table.push_str(&format!(
            "\n\n_Showing {} of {} failures._",
            summary.failures.len(),
            summary.failed_tests
        ));
    }
    table
}

const NEXT_STEPS: &str = "## 🚀 Next Steps

1. **Review the failure patterns** above to identify common issues
2. **Check recent changes** that might have introduced regressions
3. **Run tests locally** to reproduce the failures
4. **Verify test environment** and dependencies are up to date
5. **Consider infrastructure changes** that might affect test stability

💡 **Tip**: Look for patterns in the failed tests - are they all in the same area of the application?";
