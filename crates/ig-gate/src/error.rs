// error.rs - Error types for the purchase gate subsystem.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while driving a gate session.
#[derive(Debug, Error)]
pub enum GateError {
    /// The submission failed minimal validity checks (empty, too short).
    /// The session is left untouched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session has not been started yet.
    #[error("gate session {session_id} is not active (state: {state})")]
    NotActive { session_id: Uuid, state: String },

    /// The session already reached Passed or Failed and accepts no input.
    #[error("gate session {session_id} is already resolved ({state})")]
    Terminal { session_id: Uuid, state: String },

    /// Invalid state transition.
    #[error("invalid transition from {from} to {to} for gate session {session_id}")]
    InvalidTransition {
        session_id: Uuid,
        from: String,
        to: String,
    },

    /// An evaluation arrived for a submission that is no longer current
    /// (superseded by a newer submission or issued by another session).
    #[error("stale evaluation for gate session {session_id} (ticket {ticket}, current {current})")]
    StaleEvaluation {
        session_id: Uuid,
        ticket: u64,
        current: u64,
    },

    /// The outcome can only be resolved once the session is terminal.
    #[error("gate session {0} is not resolved yet")]
    NotResolved(Uuid),

    /// The gate configuration is inconsistent.
    #[error("invalid gate configuration: {0}")]
    InvalidConfig(String),
}
