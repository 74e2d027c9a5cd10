//! Error types module
//!
//! Every storage operation reports failures through [`StorageError`]. Backend
//! specific failures (filesystem, object store SDK) are normalized into one of
//! its variants before they leave the backend, together with the operation name
//! and the path or key involved.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable or known-unsupported situations
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "BACKEND_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same call could succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error during {operation} on {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Storage backend error during {operation} on {key}: {message} (code: {code})")]
    Backend {
        operation: &'static str,
        key: String,
        code: String,
        message: String,
    },

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn validation(message: impl Into<String>) -> Self {
        StorageError::Validation(message.into())
    }

    pub fn io(operation: &'static str, path: impl std::fmt::Display, source: io::Error) -> Self {
        StorageError::Io {
            operation,
            path: path.to_string(),
            source,
        }
    }

    /// Provider error code for backend failures.
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            StorageError::Backend { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl ErrorMetadata for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            StorageError::Validation(_) => "VALIDATION_ERROR",
            StorageError::Config(_) => "CONFIG_ERROR",
            StorageError::Io { .. } => "IO_ERROR",
            StorageError::Backend { .. } => "BACKEND_ERROR",
            StorageError::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            StorageError::Backend { code, .. } => {
                !matches!(code.as_str(), "AccessDenied" | "Unauthenticated" | "NoSuchKey")
            }
            _ => false,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            StorageError::Validation(_) => Some("Correct the request input and try again"),
            StorageError::Config(_) => Some("Check the STORAGE_* and AWS_* environment variables"),
            StorageError::Io { .. } => {
                Some("Check that the storage directory exists and is writable")
            }
            StorageError::Backend { .. } => {
                Some("Check the object store credentials, bucket and permissions")
            }
            StorageError::NotImplemented(_) => Some("Select the local or aws storage type"),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StorageError::Validation(_) => LogLevel::Debug,
            StorageError::NotImplemented(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
