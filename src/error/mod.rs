//! Error types and handling for `ghi`.
//!
//! Errors fall into three families that decide how far an edit gets:
//!
//! - Input errors are raised while parsing flags and selectors. Nothing has
//!   touched the network yet.
//! - Fetch errors abort the batch before any task is scheduled.
//! - Task errors belong to a single entity. They are collected by the
//!   scheduler and never stop sibling tasks.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped third-party failures
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod structured;

pub use structured::{ErrorCode, StructuredError};

use thiserror::Error;

/// Primary error type for `ghi` operations.
#[derive(Error, Debug)]
pub enum GhiError {
    // === Input Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Two flags that cannot be combined were both given.
    #[error("{message}")]
    MutuallyExclusive { message: String },

    /// A selector could not be parsed as a number or url.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Interactive editing was requested for more than one entity.
    #[error("multiple issues cannot be edited interactively")]
    InteractiveMultiple,

    /// Interactive editing is needed but the terminal cannot prompt.
    #[error("field to edit flag required when not running interactively")]
    PromptUnavailable,

    /// The interactive field survey selected nothing.
    #[error("nothing to edit: no fields were selected")]
    NothingToEdit,

    // === Fetch Errors ===
    /// The API answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    /// The GraphQL response carried an `errors` array.
    #[error("GraphQL: {message}")]
    Api { message: String },

    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Selectors point into more than one repository.
    #[error("multiple repositories are not supported: {first} and {second}")]
    MultipleRepositories { first: String, second: String },

    /// A selector resolved to nothing.
    #[error("Could not resolve to an issue or pull request: {selector}")]
    EntityNotFound { selector: String },

    /// A label, user, project or milestone name is unknown to the repository.
    #[error("'{name}' not found among {kind}")]
    UnknownName {
        kind: String,
        name: String,
        known: Vec<String>,
    },

    // === Task Errors ===
    /// One entity's update or prompt failed.
    #[error("failed to update {url}: {source}")]
    Task {
        url: String,
        #[source]
        source: Box<GhiError>,
    },

    /// An interactive prompt failed or was aborted.
    #[error("Prompt failed: {reason}")]
    Prompt { reason: String },

    /// A task stopped without reporting a result.
    #[error("task for {url} panicked")]
    TaskPanicked { url: String },

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GhiError {
    /// Raised before any network call; no partial work exists.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MutuallyExclusive { .. }
                | Self::InvalidSelector { .. }
                | Self::InteractiveMultiple
                | Self::PromptUnavailable
                | Self::NothingToEdit
        )
    }

    /// Scoped to a single entity of a batch.
    #[must_use]
    pub const fn is_task_error(&self) -> bool {
        matches!(
            self,
            Self::Task { .. } | Self::Prompt { .. } | Self::TaskPanicked { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MutuallyExclusive { .. } => Some("Pass only one of the conflicting flags"),
            Self::InvalidSelector { .. } => {
                Some("Use an issue number (23, #23) or a full issue/pull request url")
            }
            Self::InteractiveMultiple => {
                Some("Pass field flags such as --add-label to edit several issues at once")
            }
            Self::PromptUnavailable => {
                Some("Pass at least one of --title, --body, --add-label, --milestone, ...")
            }
            Self::MultipleRepositories { .. } => {
                Some("Edit issues from one repository per invocation")
            }
            Self::UnknownName { .. } => Some("Check the spelling; names are case-insensitive"),
            Self::Http { status: 401, .. } => Some("Set GH_TOKEN to a valid token"),
            Self::Config(_) => Some("Check ~/.config/ghi/config.yaml and GHI_* variables"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a mutually-exclusive flag error.
    #[must_use]
    pub fn mutually_exclusive(message: impl Into<String>) -> Self {
        Self::MutuallyExclusive {
            message: message.into(),
        }
    }

    /// Wrap an error as the failure of the task editing `url`.
    #[must_use]
    pub fn task(url: impl Into<String>, source: Self) -> Self {
        Self::Task {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error beneath any task context.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Task { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type using `GhiError`.
pub type Result<T> = std::result::Result<T, GhiError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for GhiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: err.field,
            reason: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GhiError::EntityNotFound {
            selector: "42".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not resolve to an issue or pull request: 42"
        );
    }

    #[test]
    fn test_validation_error() {
        let err = GhiError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: title: cannot be empty");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_task_error_wraps_source() {
        let err = GhiError::task(
            "https://github.com/o/r/issues/2",
            GhiError::Api {
                message: "forbidden".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "failed to update https://github.com/o/r/issues/2: GraphQL: forbidden"
        );
        assert!(err.is_task_error());
        assert!(matches!(err.root(), GhiError::Api { message } if message == "forbidden"));
    }

    #[test]
    fn test_suggestion() {
        assert!(GhiError::InteractiveMultiple.suggestion().is_some());
        let unauthorized = GhiError::Http {
            status: 401,
            url: "https://api.github.com/graphql".to_string(),
            message: "Bad credentials".to_string(),
        };
        assert_eq!(unauthorized.suggestion(), Some("Set GH_TOKEN to a valid token"));
        assert_eq!(
            GhiError::Api {
                message: "x".to_string()
            }
            .suggestion(),
            None
        );
    }

    #[test]
    fn test_input_errors_are_not_task_errors() {
        for err in [
            GhiError::InteractiveMultiple,
            GhiError::PromptUnavailable,
            GhiError::NothingToEdit,
            GhiError::mutually_exclusive("specify only one of `--body` or `--body-file`"),
        ] {
            assert!(err.is_input_error());
            assert!(!err.is_task_error());
        }
    }
}
