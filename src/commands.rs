use std::sync::Arc;

use crate::advisory::{self, AdvisoryRequest};
use crate::cli::{Cli, Command, IssueArgs, IssueOptions, ParseArgs};
use crate::config::{self, Config, DEFAULT_ISSUE_TITLE, DEFAULT_MAX_FAILURES, IssueConfig};
use crate::context::RunContext;
use crate::error::ActionError;
use crate::issue::{IssueFormatter, IssueManager, IssueOutcome, IssueRequest};
use crate::models::FailureSummary;
use crate::report::{self, StructuredExport};
use crate::text;
use crate::tracker::{GitHubClient, IssueTracker};

const DEFAULT_LABELS: [&str; 2] = ["bug", "playwright"];

pub async fn dispatch(cli: &Cli, config: &Config, ctx: &RunContext) -> Result<(), ActionError> {
    match cli.command {
        Command::Parse(ref args) => {
            parse(args, config, ctx)?;
        }
        Command::Issue(ref args) => {
            issue(args, cli.token.as_deref(), config, ctx).await?;
        }
        Command::Run {
            parse: ref parse_args,
            issue: ref options,
        } => {
            let summary = parse(parse_args, config, ctx)?;
            file_issue(&summary, options, cli.token.as_deref(), config, ctx).await?;
        }
    }
    Ok(())
}

/// Extract the summary and write it, plus the optional exports.
pub fn parse(
    args: &ParseArgs,
    config: &Config,
    ctx: &RunContext,
) -> Result<FailureSummary, ActionError> {
    let max_failures = match args.max_failures {
        Some(ref value) => config::validate_max_failures(value)?,
        None => match config.report.max_failures {
            Some(n) => config::validate_max_failures(&n.to_string())?,
            None => DEFAULT_MAX_FAILURES,
        },
    };

    let summary = report::load(&args.report_path, Some(max_failures))?;
    report::write_summary(&args.output_file, &summary)?;
    tracing::info!("Wrote failure summary to {}", args.output_file.display());
    ctx.publish("failures-count", &summary.failed_tests.to_string());

    if args.export_structured_json {
        let export = StructuredExport::new(&summary, ctx);
        match report::write_json(&args.structured_json_path, &export) {
            Ok(()) => {
                tracing::info!(
                    "Wrote structured export to {}",
                    args.structured_json_path.display()
                );
                ctx.publish(
                    "structured-json-path",
                    &args.structured_json_path.display().to_string(),
                );
            }
            Err(e) => tracing::warn!("Skipping structured export: {}", e),
        }
    }

    if let Some(ref path) = args.advisory_request {
        report::write_json(path, &AdvisoryRequest::new(&summary))?;
        tracing::info!("Wrote advisory request to {}", path.display());
    }

    Ok(summary)
}

pub async fn issue(
    args: &IssueArgs,
    token: Option<&str>,
    config: &Config,
    ctx: &RunContext,
) -> Result<Option<IssueOutcome>, ActionError> {
    let summary = report::read_summary(&args.summary_file)?;
    file_issue(&summary, &args.options, token, config, ctx).await
}

/// File the issue for `summary`. A run without failures publishes empty issue outputs
/// and never contacts the tracker.
async fn file_issue(
    summary: &FailureSummary,
    options: &IssueOptions,
    token: Option<&str>,
    config: &Config,
    ctx: &RunContext,
) -> Result<Option<IssueOutcome>, ActionError> {
    if !summary.has_failures() {
        tracing::info!("No test failures found, skipping issue creation");
        ctx.publish("issue-number", "");
        ctx.publish("issue-url", "");
        return Ok(None);
    }

    let token = config::validate_token(token)?;
    config::validate_repository(&ctx.repository)?;

    let client = GitHubClient::new(
        token,
        ctx.repository.clone(),
        config.tracker.api_url(),
        config.tracker.timeout(),
        config.tracker.retry_policy(),
    )?;

    let outcome = file_with(Arc::new(client), summary, options, &config.issue, ctx).await?;
    Ok(Some(outcome))
}

async fn file_with(
    tracker: Arc<dyn IssueTracker>,
    summary: &FailureSummary,
    options: &IssueOptions,
    defaults: &IssueConfig,
    ctx: &RunContext,
) -> Result<IssueOutcome, ActionError> {
    let request = issue_request(options, defaults);
    let advisory = options.advisory_file.as_deref().and_then(advisory::load);
    let formatter = IssueFormatter::new(ctx.clone()).with_title(&request.title);

    let outcome = IssueManager::new(tracker, formatter)
        .create_or_update(summary, &request, advisory.as_ref())
        .await?;

    if outcome.was_created {
        tracing::info!("Created issue #{}: {}", outcome.number, outcome.url);
    } else {
        tracing::info!("Updated issue #{}: {}", outcome.number, outcome.url);
    }
    ctx.publish("issue-number", &outcome.number.to_string());
    ctx.publish("issue-url", &outcome.url);

    Ok(outcome)
}

/// Flags win over the config file, which wins over built-in defaults.
fn issue_request(options: &IssueOptions, defaults: &IssueConfig) -> IssueRequest {
    IssueRequest {
        title: options
            .issue_title
            .clone()
            .or_else(|| defaults.title.clone())
            .unwrap_or_else(|| DEFAULT_ISSUE_TITLE.into()),
        labels: pick_list(
            options.issue_labels.as_deref(),
            defaults.labels.as_deref(),
            &DEFAULT_LABELS,
        ),
        assignees: pick_list(options.assignees.as_deref(), defaults.assignees.as_deref(), &[]),
        deduplicate: options.deduplicate.or(defaults.deduplicate).unwrap_or(true),
    }
}

fn pick_list(flag: Option<&str>, file: Option<&[String]>, fallback: &[&str]) -> Vec<String> {
    match (flag, file) {
        (Some(value), _) => text::parse_comma_separated(value),
        (None, Some(values)) => values.to_vec(),
        (None, None) => fallback.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::TrackerConfig;
    use crate::error::{ErrorCode, Severity};

    fn options() -> IssueOptions {
        IssueOptions {
            issue_title: None,
            issue_labels: None,
            assignees: None,
            deduplicate: None,
            advisory_file: None,
        }
    }

    fn parse_args(dir: &Path, report: serde_json::Value) -> ParseArgs {
        let report_path = dir.join("report.json");
        std::fs::write(&report_path, report.to_string()).unwrap();
        ParseArgs {
            report_path,
            output_file: dir.join("summary.json"),
            max_failures: None,
            export_structured_json: false,
            structured_json_path: dir.join("structured.json"),
            advisory_request: None,
        }
    }

    fn ctx(dir: &Path) -> RunContext {
        RunContext {
            repository: "octo/app".into(),
            output_file: Some(dir.join("github_output")),
            ..RunContext::default()
        }
    }

    fn failing_report(count: usize) -> serde_json::Value {
        let tests: Vec<_> = (0..count)
            .map(|i| json!({ "title": format!("t{i}"), "results": [{ "status": "failed" }] }))
            .collect();
        json!({
            "stats": { "expected": 1, "unexpected": count },
            "suites": [{ "title": "S", "specs": [{ "file": "a.spec.ts", "tests": tests }] }]
        })
    }

    fn outputs(dir: &Path) -> String {
        std::fs::read_to_string(dir.join("github_output")).unwrap_or_default()
    }

    #[test]
    fn parse_writes_summary_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = parse_args(dir.path(), failing_report(4));
        args.export_structured_json = true;
        args.advisory_request = Some(dir.path().join("advisory-request.json"));

        let summary = parse(&args, &Config::default(), &ctx(dir.path())).unwrap();

        assert_eq!(summary.failed_tests, 4);
        assert_eq!(summary.failures.len(), DEFAULT_MAX_FAILURES);
        assert_eq!(report::read_summary(&args.output_file).unwrap(), summary);
        assert!(args.structured_json_path.exists());
        assert!(dir.path().join("advisory-request.json").exists());

        let out = outputs(dir.path());
        assert!(out.contains("failures-count=4\n"));
        assert!(out.contains(&format!(
            "structured-json-path={}\n",
            args.structured_json_path.display()
        )));
    }

    #[test]
    fn unwritable_export_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = parse_args(dir.path(), failing_report(2));
        args.export_structured_json = true;
        args.structured_json_path = dir.path().join("missing-dir").join("structured.json");

        let summary = parse(&args, &Config::default(), &ctx(dir.path())).unwrap();

        assert_eq!(summary.failed_tests, 2);
        assert!(args.output_file.exists());
        let out = outputs(dir.path());
        assert!(out.contains("failures-count=2\n"));
        assert!(!out.contains("structured-json-path"));
    }

    #[test]
    fn parse_flag_overrides_config_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = parse_args(dir.path(), failing_report(4));
        let mut config = Config::default();
        config.report.max_failures = Some(1);

        assert_eq!(parse(&args, &config, &ctx(dir.path())).unwrap().failures.len(), 1);

        args.max_failures = Some("2".into());
        assert_eq!(parse(&args, &config, &ctx(dir.path())).unwrap().failures.len(), 2);

        args.max_failures = Some("0".into());
        let err = parse(&args, &config, &ctx(dir.path())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[tokio::test]
    async fn no_failures_skips_the_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_args(
            dir.path(),
            json!({ "stats": { "expected": 25, "unexpected": 0, "skipped": 0 }, "suites": [] }),
        );
        let summary = parse(&args, &Config::default(), &ctx(dir.path())).unwrap();
        assert_eq!(summary.failed_tests, 0);

        // No token and no server: any tracker call would fail.
        let outcome = file_issue(&summary, &options(), None, &Config::default(), &ctx(dir.path()))
            .await
            .unwrap();
        assert!(outcome.is_none());
        let out = outputs(dir.path());
        assert!(out.contains("issue-number=\n"));
        assert!(out.contains("issue-url=\n"));
    }

    #[tokio::test]
    async fn failures_without_token_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse_args(dir.path(), failing_report(1));
        let summary = parse(&args, &Config::default(), &ctx(dir.path())).unwrap();

        let err = file_issue(&summary, &options(), None, &Config::default(), &ctx(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingToken);
        assert_eq!(err.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn issue_command_creates_issue_and_publishes_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/app/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "number": 123,
                "title": DEFAULT_ISSUE_TITLE,
                "html_url": "https://github.com/octo/app/issues/123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let parse_args = parse_args(dir.path(), failing_report(2));
        let config = Config {
            tracker: TrackerConfig {
                api_url: Some(server.uri()),
                ..TrackerConfig::default()
            },
            ..Config::default()
        };
        parse(&parse_args, &config, &ctx(dir.path())).unwrap();

        let args = IssueArgs {
            summary_file: parse_args.output_file.clone(),
            options: options(),
        };
        let outcome = issue(&args, Some("ghp_testtoken"), &config, &ctx(dir.path()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.number, 123);
        assert!(outcome.was_created);
        let out = outputs(dir.path());
        assert!(out.contains("issue-number=123\n"));
        assert!(out.contains("issue-url=https://github.com/octo/app/issues/123\n"));
    }

    #[tokio::test]
    async fn missing_summary_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = IssueArgs {
            summary_file: dir.path().join("missing.json"),
            options: options(),
        };
        let err = issue(&args, Some("ghp_x"), &Config::default(), &ctx(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn request_precedence() {
        let file = IssueConfig {
            title: Some("From file".into()),
            labels: Some(vec!["file-label".into()]),
            assignees: None,
            deduplicate: Some(false),
        };

        let from_file = issue_request(&options(), &file);
        assert_eq!(from_file.title, "From file");
        assert_eq!(from_file.labels, vec!["file-label"]);
        assert!(from_file.assignees.is_empty());
        assert!(!from_file.deduplicate);

        let flags = IssueOptions {
            issue_title: Some("From flag".into()),
            issue_labels: Some("a, b,,".into()),
            assignees: Some("octocat".into()),
            deduplicate: Some(true),
            advisory_file: None,
        };
        let from_flags = issue_request(&flags, &file);
        assert_eq!(from_flags.title, "From flag");
        assert_eq!(from_flags.labels, vec!["a", "b"]);
        assert_eq!(from_flags.assignees, vec!["octocat"]);
        assert!(from_flags.deduplicate);

        let defaults = issue_request(&options(), &IssueConfig::default());
        assert_eq!(defaults.title, DEFAULT_ISSUE_TITLE);
        assert_eq!(defaults.labels, vec!["bug", "playwright"]);
        assert!(defaults.deduplicate);
    }
}
