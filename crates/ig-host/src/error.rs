// error.rs - Error types for the host and the gate orchestrator.

use ig_gate::{EvaluationError, GateError};
use thiserror::Error;

/// Errors from driving a gate or serving the native-messaging protocol.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("no gate session has been started")]
    NoSession,

    /// A frame longer than the protocol allows. Its bytes have been skipped.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}
