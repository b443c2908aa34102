// recorder.rs - StatsRecorder: where finalized outcomes go.
//
// Recording is best-effort. The gate calls `record` once per finalized
// session, logs any error, and carries on: the allow/block decision never
// waits on storage.

use std::sync::Mutex;

use thiserror::Error;

use crate::outcome::AttemptOutcome;

/// Errors a recorder may report. The gate only logs them.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("recorder unavailable: {0}")]
    Unavailable(String),
}

/// Persists one outcome per finalized session.
pub trait StatsRecorder: Send + Sync {
    fn record(&self, outcome: &AttemptOutcome) -> Result<(), RecordError>;
}

/// Recorder that keeps outcomes in memory. Useful for tests and for
/// running a gate without a data directory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    outcomes: Mutex<Vec<AttemptOutcome>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn outcomes(&self) -> Vec<AttemptOutcome> {
        match self.outcomes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl StatsRecorder for MemoryRecorder {
    fn record(&self, outcome: &AttemptOutcome) -> Result<(), RecordError> {
        self.outcomes
            .lock()
            .map_err(|e| RecordError::Unavailable(e.to_string()))?
            .push(outcome.clone());
        Ok(())
    }
}
