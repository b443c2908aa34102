// error.rs - Error types for argument evaluation.
//
// None of these reach the shopper. Construction errors surface at startup;
// everything on the model path is logged and answered by the heuristic
// scorer instead.

use std::time::Duration;

use thiserror::Error;

/// Errors building an evaluator.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// A built-in pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors from the text-generation service.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("no API key configured (set {0})")]
    MissingApiKey(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors parsing the score tag out of a model reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply has no score tag")]
    MissingScore,

    #[error("reply has conflicting score tags")]
    ConflictingScores,

    #[error("score is not a number: {0}")]
    InvalidNumber(String),

    #[error("reply used [{found}] where [{expected}] was asked for")]
    UnexpectedTag {
        expected: &'static str,
        found: &'static str,
    },

    #[error("score {0} is out of range")]
    OutOfRange(i64),

    #[error("reply has no feedback text")]
    EmptyFeedback,
}

/// Why the model path was abandoned for one argument.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}
