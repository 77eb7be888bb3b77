//! Error types for conversation memory.

use thiserror::Error;

/// Memory subsystem error type.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
