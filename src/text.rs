use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::TestFailure;

/// Maximum body length accepted by the issue tracker.
pub const MAX_BODY_CHARS: usize = 65_536;

const MAX_LINE_CHARS: usize = 1000;
const TRUNCATION_MARKER: &str = "\n\n... (content truncated due to length limits)";

/// Workspace prefixes CI runners put in front of test paths.
const CI_WORKSPACE_PREFIXES: [&str; 2] = ["/home/runner/work/", "/github/workspace/"];

/// Strip ANSI escape sequences from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until we hit a letter (end of escape sequence)
            for c2 in chars.by_ref() {
                if c2.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Render milliseconds as `500ms`, `1.5s` or `2m 5.0s`.
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1000.0 {
        format!("{:.0}ms", duration_ms)
    } else if duration_ms < 60_000.0 {
        format!("{:.1}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60_000.0).floor();
        let seconds = (duration_ms % 60_000.0) / 1000.0;
        format!("{}m {:.1}s", minutes as u64, seconds)
    }
}

/// Clean a stack trace for display: no ANSI codes, no blank lines, at most
/// `max_lines` lines.
pub fn format_stack_trace(stack: &str, max_lines: usize) -> String {
    let stack = strip_ansi(stack);
    let mut lines: Vec<&str> = stack
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return "No stack trace available".into();
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        lines.push("... (stack trace truncated)");
    }

    lines.join("\n")
}

/// Make a test path relative to `base`, a CI workspace, or `cwd` when possible.
pub fn relative_path(file_path: &str, base: Option<&Path>, cwd: Option<&Path>) -> String {
    if file_path.is_empty() {
        return "unknown".into();
    }

    let path = Path::new(file_path);
    for prefix in base.into_iter().chain(cwd) {
        if let Ok(rel) = path.strip_prefix(prefix) {
            return rel.to_string_lossy().to_string();
        }
    }

    for prefix in CI_WORKSPACE_PREFIXES {
        if let Some(rest) = file_path.strip_prefix(prefix) {
            return rest.to_string();
        }
    }

    file_path.to_string()
}

/// Normalize line endings and cut overlong lines.
pub fn sanitize(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split('\n')
        .map(|line| {
            if line.chars().count() > MAX_LINE_CHARS {
                let head: String = line.chars().take(MAX_LINE_CHARS - 3).collect();
                format!("{head}...")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cap `text` at `max_chars`, appending a truncation marker when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    // Leave room for the marker.
    let keep = max_chars.saturating_sub(100);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

pub fn parse_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Short stable digest of an issue title plus failure signatures.
pub fn issue_fingerprint(title: &str, failures: &[TestFailure]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    for failure in failures {
        hasher.update(failure.test_name.as_bytes());
        hasher.update(failure.error_message.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str, error: &str) -> TestFailure {
        TestFailure {
            test_name: name.into(),
            file_path: "tests/a.spec.ts".into(),
            line_number: None,
            error_message: error.into(),
            stack_trace: String::new(),
            duration: 0.0,
            retry_count: 0,
            project_name: None,
            browser: None,
        }
    }

    #[test]
    fn strips_playwright_color_codes() {
        let raw = "\x1b[2mexpect(\x1b[22m\x1b[31mlocator\x1b[39m\x1b[2m).\x1b[22mtoHaveText\x1b[2m(\x1b[22m\x1b[32mexpected\x1b[39m\x1b[2m)\x1b[22m failed";
        assert_eq!(strip_ansi(raw), "expect(locator).toHaveText(expected) failed");
        assert_eq!(
            strip_ansi("\x1b[0m\x1b[1;31mBold Red\x1b[0m plain"),
            "Bold Red plain"
        );
        assert_eq!(strip_ansi(""), "");
        assert_eq!(strip_ansi("no codes here"), "no codes here");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(500.0), "500ms");
        assert_eq!(format_duration(1500.0), "1.5s");
        assert_eq!(format_duration(5000.0), "5.0s");
        assert_eq!(format_duration(65000.0), "1m 5.0s");
        assert_eq!(format_duration(125000.0), "2m 5.0s");
    }

    #[test]
    fn stack_trace_is_cleaned_and_capped() {
        let stack = "Error: Test failed\n    at test.spec.ts:10:5\n\n    at runTest (runner.js:100:10)";
        let formatted = format_stack_trace(stack, 20);
        assert_eq!(formatted.lines().count(), 3);
        assert!(formatted.starts_with("Error: Test failed"));

        let long: String = (0..50).map(|i| format!("    at line{i}\n")).collect();
        let formatted = format_stack_trace(&long, 10);
        assert_eq!(formatted.lines().count(), 11);
        assert!(formatted.ends_with("... (stack trace truncated)"));

        assert_eq!(format_stack_trace("", 20), "No stack trace available");
        assert!(!format_stack_trace("at \x1b[31mObject.fn\x1b[39m", 20).contains('\x1b'));
    }

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_path(
                "/home/user/project/tests/file.ts",
                Some(Path::new("/home/user/project")),
                None
            ),
            "tests/file.ts"
        );
        assert_eq!(
            relative_path("/home/runner/work/app/app/tests/x.spec.ts", None, None),
            "app/app/tests/x.spec.ts"
        );
        assert_eq!(relative_path("/some/path/file.ts", None, None), "/some/path/file.ts");
        assert_eq!(relative_path("", None, None), "unknown");
    }

    #[test]
    fn sanitize_normalizes_newlines_and_long_lines() {
        assert_eq!(sanitize("Line 1\r\nLine 2\rLine 3\n"), "Line 1\nLine 2\nLine 3\n");

        let long = "x".repeat(1500);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), 1000);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_appends_marker() {
        assert_eq!(truncate("Short text", 100), "Short text");

        let out = truncate(&"x".repeat(1000), 500);
        assert!(out.chars().count() <= 500);
        assert!(out.ends_with("(content truncated due to length limits)"));
    }

    #[test]
    fn comma_separated_values() {
        assert_eq!(parse_comma_separated("bug, test , urgent "), ["bug", "test", "urgent"]);
        assert_eq!(parse_comma_separated("bug,,test,"), ["bug", "test"]);
        assert!(parse_comma_separated("").is_empty());
        assert!(parse_comma_separated("  ").is_empty());
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = vec![failure("Test 1", "Error 1"), failure("Test 2", "Error 2")];
        let b = a.clone();
        let c = vec![failure("Test 1", "Different"), failure("Test 2", "Error 2")];

        let fa = issue_fingerprint("Title", &a);
        assert_eq!(fa, issue_fingerprint("Title", &b));
        assert_ne!(fa, issue_fingerprint("Title", &c));
        assert_eq!(fa.len(), 8);
    }
}
