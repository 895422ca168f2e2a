//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::GhiError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Input Errors (exit code 2) ===
    /// Field validation failed
    ValidationFailed,
    /// Conflicting flags
    MutuallyExclusiveFlags,
    /// Selector is neither a number nor a url
    InvalidSelector,
    /// Interactive mode with several entities
    InteractiveUnsupported,
    /// Interactive mode without a terminal
    PromptUnavailable,
    /// Interactive survey selected nothing
    NothingToEdit,

    // === Fetch Errors (exit code 3) ===
    /// Non-success HTTP status
    HttpError,
    /// GraphQL `errors` in the response
    GraphqlError,
    /// Request could not be sent or read
    TransportError,
    /// Selectors span several repositories
    MultipleRepositories,
    /// Selector matched no entity
    EntityNotFound,
    /// Name unknown to the repository
    UnknownName,

    // === Task Errors (exit code 4) ===
    /// An entity's update failed
    TaskFailed,
    /// An interactive prompt failed
    PromptFailed,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Input
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::MutuallyExclusiveFlags => "MUTUALLY_EXCLUSIVE_FLAGS",
            Self::InvalidSelector => "INVALID_SELECTOR",
            Self::InteractiveUnsupported => "INTERACTIVE_UNSUPPORTED",
            Self::PromptUnavailable => "PROMPT_UNAVAILABLE",
            Self::NothingToEdit => "NOTHING_TO_EDIT",
            // Fetch
            Self::HttpError => "HTTP_ERROR",
            Self::GraphqlError => "GRAPHQL_ERROR",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::MultipleRepositories => "MULTIPLE_REPOSITORIES",
            Self::EntityNotFound => "ENTITY_NOT_FOUND",
            Self::UnknownName => "UNKNOWN_NAME",
            // Task
            Self::TaskFailed => "TASK_FAILED",
            Self::PromptFailed => "PROMPT_FAILED",
            // Config
            Self::ConfigError => "CONFIG_ERROR",
            // I/O
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            // Internal
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Retryable means the caller might succeed if it:
    /// - Waits and retries (e.g., transport failure)
    /// - Fixes the input and retries (e.g., validation error)
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::MutuallyExclusiveFlags
                | Self::InvalidSelector
                | Self::UnknownName
                | Self::TransportError
                | Self::TaskFailed
        )
    }

    /// Get the exit code for this error category.
    ///
    /// Exit codes are grouped by error category:
    /// - 1: Internal/unknown errors
    /// - 2: Input errors
    /// - 3: Fetch errors
    /// - 4: Task errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed
            | Self::MutuallyExclusiveFlags
            | Self::InvalidSelector
            | Self::InteractiveUnsupported
            | Self::PromptUnavailable
            | Self::NothingToEdit => 2,
            Self::HttpError
            | Self::GraphqlError
            | Self::TransportError
            | Self::MultipleRepositories
            | Self::EntityNotFound
            | Self::UnknownName => 3,
            Self::TaskFailed | Self::PromptFailed => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `GhiError`.
    #[must_use]
    pub fn from_error(err: &GhiError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    /// Extract error code and context from a `GhiError`.
    fn extract_code_and_context(err: &GhiError) -> (ErrorCode, Option<Value>) {
        match err {
            GhiError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            GhiError::MutuallyExclusive { .. } => (ErrorCode::MutuallyExclusiveFlags, None),
            GhiError::InvalidSelector { selector, reason } => (
                ErrorCode::InvalidSelector,
                Some(json!({"selector": selector, "reason": reason})),
            ),
            GhiError::InteractiveMultiple => (ErrorCode::InteractiveUnsupported, None),
            GhiError::PromptUnavailable => (ErrorCode::PromptUnavailable, None),
            GhiError::NothingToEdit => (ErrorCode::NothingToEdit, None),
            GhiError::Http {
                status,
                url,
                message,
            } => (
                ErrorCode::HttpError,
                Some(json!({"status": status, "url": url, "message": message})),
            ),
            GhiError::Api { .. } => (ErrorCode::GraphqlError, None),
            GhiError::Transport(_) => (ErrorCode::TransportError, None),
            GhiError::MultipleRepositories { first, second } => (
                ErrorCode::MultipleRepositories,
                Some(json!({"repositories": [first, second]})),
            ),
            GhiError::EntityNotFound { selector } => {
                (ErrorCode::EntityNotFound, Some(json!({"selector": selector})))
            }
            GhiError::UnknownName { kind, name, known } => (
                ErrorCode::UnknownName,
                Some(json!({
                    "kind": kind,
                    "name": name,
                    "similar": find_similar_names(name, known, 3),
                })),
            ),
            GhiError::Task { url, source } => {
                let (inner, _) = Self::extract_code_and_context(source);
                (
                    ErrorCode::TaskFailed,
                    Some(json!({"url": url, "cause": inner.as_str()})),
                )
            }
            GhiError::TaskPanicked { url } => (ErrorCode::TaskFailed, Some(json!({"url": url}))),
            GhiError::Prompt { .. } => (ErrorCode::PromptFailed, None),
            GhiError::Config(_) => (ErrorCode::ConfigError, None),
            GhiError::Io(_) => (ErrorCode::IoError, None),
            GhiError::Json(_) => (ErrorCode::JsonError, None),
            GhiError::Yaml(_) => (ErrorCode::YamlError, None),
            GhiError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    /// Generate context-aware hint from error.
    fn generate_hint(err: &GhiError) -> Option<String> {
        if let GhiError::UnknownName { name, known, .. } = err.root() {
            let similar = find_similar_names(name, known, 3);
            return match similar.len() {
                0 => err.root().suggestion().map(str::to_string),
                1 => Some(format!("Did you mean '{}'?", similar[0])),
                _ => Some(format!("Did you mean one of: {}?", similar.join(", "))),
            };
        }

        err.suggestion()
            .or_else(|| err.root().suggestion())
            .map(str::to_string)
    }
}

/// Edit distance between two names, computed over chars with two rows.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let substitute = previous[j] + usize::from(a_char != *b_char);
            current[j + 1] = substitute.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Find names close to `searched`, case-insensitively.
#[must_use]
pub fn find_similar_names(searched: &str, known: &[String], max_suggestions: usize) -> Vec<String> {
    let needle = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = known
        .iter()
        .map(|name| (levenshtein_distance(&needle, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::TaskFailed.as_str(), "TASK_FAILED");
        assert_eq!(
            ErrorCode::InteractiveUnsupported.as_str(),
            "INTERACTIVE_UNSUPPORTED"
        );
        assert_eq!(ErrorCode::GraphqlError.as_str(), "GRAPHQL_ERROR");
    }

    #[test]
    fn test_error_code_exit_codes() {
        assert_eq!(ErrorCode::MutuallyExclusiveFlags.exit_code(), 2);
        assert_eq!(ErrorCode::EntityNotFound.exit_code(), 3);
        assert_eq!(ErrorCode::TaskFailed.exit_code(), 4);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 7);
        assert_eq!(ErrorCode::IoError.exit_code(), 8);
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
    }

    #[test]
    fn test_task_error_keeps_cause_code() {
        let err = GhiError::task(
            "https://github.com/o/r/issues/2",
            GhiError::Api {
                message: "forbidden".to_string(),
            },
        );
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::TaskFailed);
        let context = structured.context.expect("context");
        assert_eq!(context["url"], "https://github.com/o/r/issues/2");
        assert_eq!(context["cause"], "GRAPHQL_ERROR");
        assert!(structured.retryable);
    }

    #[test]
    fn test_unknown_name_suggests_close_match() {
        let err = GhiError::UnknownName {
            kind: "labels".to_string(),
            name: "bgu".to_string(),
            known: vec!["bug".to_string(), "enhancement".to_string()],
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.hint.as_deref(), Some("Did you mean 'bug'?"));
    }

    #[test]
    fn test_structured_error_to_json() {
        let structured = StructuredError::from_error(&GhiError::InteractiveMultiple);
        let json = structured.to_json();
        assert_eq!(json["error"]["code"], "INTERACTIVE_UNSUPPORTED");
        assert_eq!(
            json["error"]["message"],
            "multiple issues cannot be edited interactively"
        );
        assert_eq!(json["error"]["retryable"], false);
    }

    #[test]
    fn test_to_human_without_color() {
        let structured = StructuredError::from_error(&GhiError::PromptUnavailable);
        let human = structured.to_human(false);
        assert!(human.starts_with("Error: field to edit flag required"));
        assert!(human.contains("\nHint: "));
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }
}
