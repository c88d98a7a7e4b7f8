//! Keyword-based classification of failure messages.
//!
//! Every function here is total: any input, including the empty string,
//! maps to exactly one value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Timeout,
    Selector,
    Async,
    TypeError,
    ImportError,
    Network,
    Assertion,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Timeout => "timeout",
            ErrorType::Selector => "selector",
            ErrorType::Async => "async",
            ErrorType::TypeError => "type_error",
            ErrorType::ImportError => "import_error",
            ErrorType::Network => "network",
            ErrorType::Assertion => "assertion",
            ErrorType::Unknown => "unknown",
        }
    }

    pub fn fixability_hint(&self) -> &'static str {
        match self {
            ErrorType::Timeout => {
                "medium - consider increasing timeout or improving wait conditions"
            }
            ErrorType::Selector => "high - check element selector matches DOM",
            ErrorType::Async => "high - likely missing await on async function",
            ErrorType::TypeError => "high - fix type annotation or value",
            ErrorType::ImportError => "high - fix import path or install dependency",
            ErrorType::Network => "low - may require infrastructure changes",
            ErrorType::Assertion => "low - may require business logic review",
            ErrorType::Unknown => "low - needs manual investigation",
        }
    }
}

/// Fine-grained patterns that fix tooling knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPattern {
    SelectorTimeout,
    MissingAwait,
    ElementDetached,
    NavigationTimeout,
    MultipleElements,
    ModuleNotFound,
    TypeMismatchNumber,
    TypeMismatchString,
    UnknownPattern,
}

impl ErrorPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPattern::SelectorTimeout => "selector_timeout",
            ErrorPattern::MissingAwait => "missing_await",
            ErrorPattern::ElementDetached => "element_detached",
            ErrorPattern::NavigationTimeout => "navigation_timeout",
            ErrorPattern::MultipleElements => "multiple_elements",
            ErrorPattern::ModuleNotFound => "module_not_found",
            ErrorPattern::TypeMismatchNumber => "type_mismatch_number",
            ErrorPattern::TypeMismatchString => "type_mismatch_string",
            ErrorPattern::UnknownPattern => "unknown_pattern",
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Coarse error type. Rules are checked in priority order; first match wins.
pub fn classify_error_type(message: &str) -> ErrorType {
    let msg = message.to_lowercase();

    if contains_any(&msg, &["timeout", "exceeded"]) {
        ErrorType::Timeout
    } else if contains_any(&msg, &["selector", "element"]) {
        ErrorType::Selector
    } else if contains_any(&msg, &["await", "promise"]) {
        ErrorType::Async
    } else if msg.contains("type") && contains_any(&msg, &["error", "mismatch"]) {
        ErrorType::TypeError
    } else if contains_any(&msg, &["import", "module"]) {
        ErrorType::ImportError
    } else if contains_any(&msg, &["network", "fetch", "request"]) {
        ErrorType::Network
    } else if contains_any(&msg, &["assertion", "expect"]) {
        ErrorType::Assertion
    } else {
        ErrorType::Unknown
    }
}

pub fn fixability_hint(message: &str) -> &'static str {
    classify_error_type(message).fixability_hint()
}

pub fn detect_pattern(message: &str) -> ErrorPattern {
    let msg = message.to_lowercase();

    if msg.contains("waiting for selector") && msg.contains("timeout") {
        ErrorPattern::SelectorTimeout
    } else if contains_any(&msg, &["missing await", "did you forget to await"]) {
        ErrorPattern::MissingAwait
    } else if msg.contains("element is not attached") {
        ErrorPattern::ElementDetached
    } else if msg.contains("navigation timeout") {
        ErrorPattern::NavigationTimeout
    } else if msg.contains("locator resolved to") && msg.contains("multiple") {
        ErrorPattern::MultipleElements
    } else if msg.contains("cannot find module") {
        ErrorPattern::ModuleNotFound
    } else if msg.contains("type 'number' is not assignable") {
        ErrorPattern::TypeMismatchNumber
    } else if msg.contains("type 'string' is not assignable") {
        ErrorPattern::TypeMismatchString
    } else {
        ErrorPattern::UnknownPattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_type_follows_priority_order() {
        let cases = [
            ("Navigation timeout of 30000ms exceeded", ErrorType::Timeout),
            ("Test timeout exceeded while waiting for selector", ErrorType::Timeout),
            ("Element not found for selector #login", ErrorType::Selector),
            ("Unhandled promise rejection", ErrorType::Async),
            ("TypeError: cannot read properties of undefined", ErrorType::TypeError),
            ("Type mismatch in argument", ErrorType::TypeError),
            ("Cannot find module './helpers'", ErrorType::ImportError),
            ("net::ERR_CONNECTION_REFUSED during fetch", ErrorType::Network),
            ("expect(received).toEqual(expected)", ErrorType::Assertion),
            ("AssertionError: values differ", ErrorType::Assertion),
            ("something odd happened", ErrorType::Unknown),
        ];

        for (message, expected) in cases {
            assert_eq!(classify_error_type(message), expected, "{message}");
        }
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify_error_type("TIMEOUT"), ErrorType::Timeout);
        assert_eq!(detect_pattern("CANNOT FIND MODULE 'x'"), ErrorPattern::ModuleNotFound);
    }

    #[test]
    fn empty_message_is_unknown() {
        assert_eq!(classify_error_type(""), ErrorType::Unknown);
        assert_eq!(detect_pattern(""), ErrorPattern::UnknownPattern);
        assert_eq!(fixability_hint(""), "low - needs manual investigation");
    }

    #[test]
    fn fixability_hint_tracks_coarse_type() {
        assert_eq!(
            fixability_hint("Timeout 5000ms exceeded"),
            "medium - consider increasing timeout or improving wait conditions"
        );
        assert_eq!(
            fixability_hint("missing await on promise"),
            "high - likely missing await on async function"
        );
        assert_eq!(
            fixability_hint("fetch failed"),
            "low - may require infrastructure changes"
        );
    }

    #[test]
    fn detects_specific_patterns() {
        let cases = [
            (
                "Timeout 30000ms exceeded while waiting for selector \"#btn\"",
                ErrorPattern::SelectorTimeout,
            ),
            ("Did you forget to await this call?", ErrorPattern::MissingAwait),
            ("Element is not attached to the DOM", ErrorPattern::ElementDetached),
            ("Navigation timeout of 30000ms exceeded", ErrorPattern::NavigationTimeout),
            (
                "strict mode violation: locator resolved to 3 elements (multiple)",
                ErrorPattern::MultipleElements,
            ),
            ("Error: Cannot find module 'lodash'", ErrorPattern::ModuleNotFound),
            (
                "Type 'number' is not assignable to type 'string'",
                ErrorPattern::TypeMismatchNumber,
            ),
            (
                "Type 'string' is not assignable to type 'number'",
                ErrorPattern::TypeMismatchString,
            ),
            ("expect(received).toBe(expected)", ErrorPattern::UnknownPattern),
        ];

        for (message, expected) in cases {
            assert_eq!(detect_pattern(message), expected, "{message}");
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let message = "locator.click: Timeout 5000ms exceeded";
        assert_eq!(classify_error_type(message), classify_error_type(message));
        assert_eq!(detect_pattern(message), detect_pattern(message));
    }

    #[test]
    fn string_forms_are_snake_case() {
        assert_eq!(ErrorType::TypeError.as_str(), "type_error");
        assert_eq!(ErrorType::ImportError.as_str(), "import_error");
        assert_eq!(ErrorPattern::TypeMismatchNumber.as_str(), "type_mismatch_number");
        assert_eq!(ErrorPattern::UnknownPattern.as_str(), "unknown_pattern");
    }
}
