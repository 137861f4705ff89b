//! Error types for file access and base directory resolution

use thiserror::Error;

/// Prefix of every read failure message surfaced to callers
pub const READ_FAILED_PREFIX: &str = "文件读取失败：";

/// Prefix logged when the host cannot report its directory
pub const EXE_DIR_FAILED_PREFIX: &str = "获取程序目录失败：";

/// Result type for read operations
pub type FileResult<T> = Result<T, ReadError>;

/// A failed `read`/`read_text`. Carries only the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ReadError {
    message: String,
}

impl ReadError {
    /// Build the diagnostic from the underlying failure detail
    pub fn from_detail(detail: impl std::fmt::Display) -> Self {
        Self {
            message: format!("{READ_FAILED_PREFIX}{detail}"),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Durable key-value store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The host could not report its directory
#[derive(Debug, Error)]
pub enum HostQueryError {
    /// The query itself failed (command missing, host error, timeout)
    #[error("Host query failed: {0}")]
    Failed(String),

    /// The host answered with something that does not decode into the response schema
    #[error("Malformed host response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for HostQueryError {
    fn from(err: serde_json::Error) -> Self {
        HostQueryError::Malformed(err.to_string())
    }
}
