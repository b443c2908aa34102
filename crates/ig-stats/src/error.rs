// error.rs - Error types for the stats store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing stats files.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Failed to open, create, or remove a stats file or directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write to an already-open file.
    #[error("failed to append outcome: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Malformed JSON in the history or the snapshot.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A history line could not be parsed.
    #[error("corrupt history at line {line}: {source}")]
    CorruptHistory {
        line: usize,
        source: serde_json::Error,
    },
}
