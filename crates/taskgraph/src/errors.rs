//! Error types for the taskgraph crate.

use std::fmt;

use thiserror::Error;

/// Classification of a text-generation failure.
///
/// Set by the provider that produced the failure, so callers never have to
/// inspect error messages to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationErrorKind {
    /// Missing or rejected credentials
    Auth,
    /// Provider throttled the request
    RateLimit,
    /// Transport failure or timeout
    Network,
    /// Provider answered with a body we could not decode
    Parse,
    /// Provider rejected the request as malformed
    Validation,
}

impl GenerationErrorKind {
    /// Human-readable remediation advice for this kind of failure.
    pub fn remediation_hint(self) -> Option<&'static str> {
        match self {
            Self::Auth => Some(
                "Check that ANTHROPIC_API_KEY is set in your environment and that the key is valid",
            ),
            Self::RateLimit => Some("The provider is rate limiting requests; wait and retry"),
            Self::Network => Some("Check your network connection or raise the request timeout"),
            Self::Parse | Self::Validation => None,
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::RateLimit => write!(f, "rate-limit"),
            Self::Network => write!(f, "network"),
            Self::Parse => write!(f, "parse"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Comprehensive error types for task graph operations
#[derive(Error, Debug, Clone)]
pub enum TasksError {
    // Task errors
    #[error("Task '{task_id}' not found")]
    TaskNotFound { task_id: String },

    #[error("Invalid task ID format: '{id}'")]
    InvalidId { id: String },

    // Dependency errors
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("Invalid dependency: task '{task_id}' depends on non-existent task '{dep_id}'")]
    InvalidDependency { task_id: String, dep_id: String },

    // Storage errors
    #[error("Storage error: {reason}")]
    StorageError { reason: String },

    #[error("Failed to read file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    #[error("Failed to write file '{path}': {reason}")]
    FileWriteError { path: String, reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParseError { reason: String },

    #[error("Invalid tasks file '{path}': {reason}")]
    InvalidTasksFile { path: String, reason: String },

    #[error("Report '{path}' is locked by another analysis run")]
    ReportLocked { path: String },

    // Configuration errors
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    // AI errors
    #[error("AI error: {0}")]
    Ai(String),

    #[error("Generation failed ({kind}): {message}")]
    Generation {
        kind: GenerationErrorKind,
        message: String,
    },

    #[error("AI provider not configured: {provider}")]
    ProviderNotConfigured { provider: String },

    #[error("AI response parse error: {reason}")]
    AiResponseParseError { reason: String },

    // General errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl TasksError {
    /// Shorthand for a generation failure of the given kind.
    pub fn generation(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self::Generation {
            kind,
            message: message.into(),
        }
    }

    /// The generation failure kind, if this error came from a provider.
    pub fn generation_kind(&self) -> Option<GenerationErrorKind> {
        match self {
            Self::Generation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Remediation advice to show next to the error, if any.
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            Self::Generation { kind, .. } => kind.remediation_hint(),
            Self::ProviderNotConfigured { .. } => GenerationErrorKind::Auth.remediation_hint(),
            Self::ReportLocked { .. } => Some(
                "Wait for the other run to finish, or delete the stale .lock file next to the report",
            ),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TasksError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TasksError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParseError {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for taskgraph operations
pub type TasksResult<T> = Result<T, TasksError>;
