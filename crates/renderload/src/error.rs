//! Error types for the load engine and reporter

use thiserror::Error;

/// Result type alias for engine and reporting operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while executing a run or writing its results.
///
/// Failed requests are not errors; they are recorded in the metrics.
#[derive(Error, Debug)]
pub enum EngineError {
    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Per-query stat file could not be created or written
    #[error("Failed to write query stats to {path}: {source}")]
    StatFile {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Aggregate export could not be written
    #[error("Failed to write report to {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A worker or writer task panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
