//! Error types for librelay

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for relay board operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Serial port could not be opened
    #[error("Failed to open serial port {path}: {reason}")]
    Connection { path: String, reason: String },

    /// Direct call attempted before a successful `setup`
    #[error("Relay board not connected")]
    NotConnected,

    /// Dispatcher started without both queues bound
    #[error("Dispatcher not configured: {0}")]
    NotConfigured(String),

    /// Dispatcher already has a worker
    #[error("Dispatcher already running")]
    AlreadyRunning,

    /// Action/content mismatch or unknown command code
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Transport read or write exceeded its timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reply bytes outside the shape expected for the command
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Dispatcher worker ended abnormally
    #[error("Dispatcher worker failed: {0}")]
    Worker(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

/// Machine-readable error tag carried by error responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    NotConnected,
    NotConfigured,
    InvalidCommand,
    Timeout,
    Io,
    MalformedResponse,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::InvalidCommand => "invalid_command",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Io => "io",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RelayError {
    /// Classify this error for tagging a response
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Connection { .. } => ErrorKind::Connection,
            RelayError::NotConnected => ErrorKind::NotConnected,
            RelayError::NotConfigured(_) => ErrorKind::NotConfigured,
            RelayError::InvalidCommand(_) => ErrorKind::InvalidCommand,
            RelayError::Timeout(_) => ErrorKind::Timeout,
            RelayError::Serial(_) | RelayError::Io(_) => ErrorKind::Io,
            RelayError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            RelayError::AlreadyRunning
            | RelayError::Config(_)
            | RelayError::Serialization(_)
            | RelayError::Worker(_) => ErrorKind::Other,
        }
    }
}
