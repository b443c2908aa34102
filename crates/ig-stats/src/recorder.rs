// recorder.rs - FileStatsRecorder: the gate's StatsRecorder over a StatsStore.

use std::sync::Mutex;

use ig_gate::{AttemptOutcome, RecordError, StatsRecorder};

use crate::error::StatsError;
use crate::store::StatsStore;

/// Records finalized outcomes into a data directory.
///
/// Appends are serialized so the snapshot's read-modify-write never
/// interleaves within one process.
pub struct FileStatsRecorder {
    store: StatsStore,
    lock: Mutex<()>,
}

impl FileStatsRecorder {
    pub fn new(store: StatsStore) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }
}

impl StatsRecorder for FileStatsRecorder {
    fn record(&self, outcome: &AttemptOutcome) -> Result<(), RecordError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| RecordError::Unavailable(e.to_string()))?;
        self.store.append(outcome).map(|_| ()).map_err(RecordError::from)
    }
}

impl From<StatsError> for RecordError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Io { path, source } => RecordError::Io {
                path: path.display().to_string(),
                source,
            },
            StatsError::WriteFailed(source) => RecordError::Io {
                path: String::new(),
                source,
            },
            StatsError::Serialization(e) => RecordError::Serialization(e),
            other @ StatsError::CorruptHistory { .. } => RecordError::Unavailable(other.to_string()),
        }
    }
}
