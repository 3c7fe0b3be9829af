//! Error types for logpump
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for logpump
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Log Source Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Fetch failed for partition {partition}: {message}")]
    Fetch { partition: usize, message: String },

    #[error("Unknown partition {partition} (source has {count})")]
    UnknownPartition { partition: usize, count: usize },

    // ============================================================================
    // Pull Engine Errors
    // ============================================================================
    #[error(
        "Sequence violation on partition {partition}: expected {expected}, received {received}"
    )]
    SequenceViolation {
        partition: usize,
        expected: i64,
        received: i64,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Partition reader {partition} failed: {message}")]
    Reader { partition: usize, message: String },

    // ============================================================================
    // Query / Checkpoint Errors
    // ============================================================================
    #[error("Query engine error: {0}")]
    Query(#[source] anyhow::Error),

    #[error("Checkpoint failed: {message}")]
    Checkpoint { message: String },

    #[error("Incompatible checkpoint: expected {expected}, found {found}")]
    IncompatibleCheckpoint { expected: String, found: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Integrity mismatch: {message}")]
    IntegrityMismatch { message: String },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to decode event: {message}")]
    Decode { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Coarse classification reported when a loop or cycle terminates with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Misconfiguration, detected before any work starts
    Config,
    /// The log source could not be read
    Source,
    /// The source broke its per-partition ordering contract
    SequenceViolation,
    /// Positions and delivered counts disagree
    Integrity,
    /// Cancellation was requested
    Cancelled,
    /// The query engine or its checkpoint failed
    Query,
    /// Persisted state could not be read or written
    State,
    /// Anything else
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a fetch error for a partition
    pub fn fetch(partition: usize, message: impl Into<String>) -> Self {
        Self::Fetch {
            partition,
            message: message.into(),
        }
    }

    /// Create a reader error for a partition
    pub fn reader(partition: usize, message: impl Into<String>) -> Self {
        Self::Reader {
            partition,
            message: message.into(),
        }
    }

    /// Wrap an error raised by the query engine
    pub fn query(err: impl Into<anyhow::Error>) -> Self {
        Self::Query(err.into())
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an integrity mismatch error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityMismatch {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::RateLimited { .. } | Error::Timeout { .. } | Error::Fetch { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Classify the error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Config { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::InvalidUrl(_) => FailureKind::Config,
            Error::Http(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::MaxRetriesExceeded { .. }
            | Error::Fetch { .. }
            | Error::UnknownPartition { .. }
            | Error::Reader { .. }
            | Error::Decode { .. } => FailureKind::Source,
            Error::SequenceViolation { .. } => FailureKind::SequenceViolation,
            Error::IntegrityMismatch { .. } => FailureKind::Integrity,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Query(_) | Error::Checkpoint { .. } | Error::IncompatibleCheckpoint { .. } => {
                FailureKind::Query
            }
            Error::State { .. } | Error::Io(_) | Error::JsonParse(_) => FailureKind::State,
            Error::Other(_) => FailureKind::Other,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for logpump
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
