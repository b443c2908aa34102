// store.rs - StatsStore: the data directory holding history and snapshot.
//
// Layout:
//   <data_dir>/history.jsonl   one AttemptOutcome per line
//   <data_dir>/stats.json      dashboard snapshot (read-modify-write)
//
// The history is the source of truth. If the snapshot is missing or
// unreadable it is rebuilt from the history; the next append rewrites it.

use std::fs;
use std::path::{Path, PathBuf};

use ig_gate::AttemptOutcome;

use crate::aggregate::StatsReport;
use crate::error::StatsError;
use crate::history::HistoryLog;
use crate::snapshot::StatsSnapshot;

pub const HISTORY_FILE: &str = "history.jsonl";
pub const SNAPSHOT_FILE: &str = "stats.json";

/// File-backed attempt statistics.
#[derive(Debug, Clone)]
pub struct StatsStore {
    data_dir: PathBuf,
}

impl StatsStore {
    /// Open the store at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StatsError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|source| StatsError::Io {
            path: data_dir.clone(),
            source,
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// Record one outcome: append to the history, then fold it into the
    /// snapshot. Duplicates are not detected.
    pub fn append(&self, outcome: &AttemptOutcome) -> Result<StatsSnapshot, StatsError> {
        HistoryLog::open(self.history_path())?.append(outcome)?;

        let mut snapshot = match self.read_snapshot()? {
            Some(snapshot) => snapshot,
            // History already contains `outcome`, so the rebuild covers it.
            // This also replaces a corrupt snapshot file.
            None => {
                let snapshot = self.rebuild_snapshot()?;
                self.write_snapshot(&snapshot)?;
                return Ok(snapshot);
            }
        };
        snapshot.apply(outcome);
        self.write_snapshot(&snapshot)?;

        tracing::debug!(
            session_id = %outcome.session_id,
            verdict = %outcome.verdict,
            total = snapshot.total_battles,
            "outcome recorded"
        );
        Ok(snapshot)
    }

    /// Current dashboard snapshot. Rebuilt from history if the file is gone
    /// or does not parse.
    pub fn snapshot(&self) -> Result<StatsSnapshot, StatsError> {
        match self.read_snapshot()? {
            Some(snapshot) => Ok(snapshot),
            None => self.rebuild_snapshot(),
        }
    }

    /// Every recorded outcome, oldest first.
    pub fn history(&self) -> Result<Vec<AttemptOutcome>, StatsError> {
        HistoryLog::read_all(self.history_path())
    }

    /// History plus aggregates.
    pub fn report(&self) -> Result<StatsReport, StatsError> {
        Ok(StatsReport::from_outcomes(self.history()?))
    }

    /// Remove both files. Returns whether anything was deleted.
    pub fn reset(&self) -> Result<bool, StatsError> {
        let mut removed = false;
        for path in [self.history_path(), self.snapshot_path()] {
            if path.exists() {
                fs::remove_file(&path).map_err(|source| StatsError::Io {
                    path: path.clone(),
                    source,
                })?;
                removed = true;
            }
        }
        if removed {
            tracing::info!(data_dir = %self.data_dir.display(), "stats reset");
        }
        Ok(removed)
    }

    fn rebuild_snapshot(&self) -> Result<StatsSnapshot, StatsError> {
        let history = self.history()?;
        Ok(StatsSnapshot::from_outcomes(&history))
    }

    fn read_snapshot(&self) -> Result<Option<StatsSnapshot>, StatsError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| StatsError::Io {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_str::<StatsSnapshot>(&json) {
            Ok(mut snapshot) => {
                snapshot.seed_categories();
                Ok(Some(snapshot))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "stats snapshot unreadable, rebuilding from history"
                );
                Ok(None)
            }
        }
    }

    fn write_snapshot(&self, snapshot: &StatsSnapshot) -> Result<(), StatsError> {
        let path = self.snapshot_path();
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json).map_err(|source| StatsError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{outcome, outcome_in};
    use ig_gate::Verdict;
    use tempfile::tempdir;

    #[test]
    fn open_creates_the_directory() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("impulse-guard");
        let store = StatsStore::open(&data_dir).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(store.snapshot().unwrap(), StatsSnapshot::default());
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn append_updates_history_and_snapshot() {
        let dir = tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();

        store
            .append(&outcome_in("Yoga Mat", Some(25.0), Verdict::Blocked, "Fitness", 0))
            .unwrap();
        let snapshot = store
            .append(&outcome("Headphones", Some(199.0), Verdict::Allowed))
            .unwrap();

        assert_eq!(snapshot.total_battles, 2);
        assert_eq!(store.snapshot().unwrap(), snapshot);
        assert_eq!(store.history().unwrap().len(), 2);

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.snapshot_path()).unwrap()).unwrap();
        assert_eq!(on_disk["victories"], 1);
        assert_eq!(on_disk["defeats"], 1);
        assert_eq!(on_disk["categoryStats"]["Fitness"], 1);
    }

    #[test]
    fn missing_snapshot_is_rebuilt_from_history() {
        let dir = tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();
        store.append(&outcome("Kettle", Some(30.0), Verdict::Blocked)).unwrap();
        store.append(&outcome("Toaster", Some(40.0), Verdict::Blocked)).unwrap();

        fs::remove_file(store.snapshot_path()).unwrap();
        let rebuilt = store.snapshot().unwrap();
        assert_eq!(rebuilt.victories, 2);
        assert_eq!(rebuilt.savings_history, vec![30.0, 70.0]);

        // The next append writes a snapshot that includes everything.
        let after = store.append(&outcome("Mixer", Some(10.0), Verdict::Blocked)).unwrap();
        assert_eq!(after.victories, 3);
        assert_eq!(store.snapshot().unwrap().victories, 3);
    }

    #[test]
    fn corrupt_snapshot_is_rebuilt_from_history() {
        let dir = tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();
        store.append(&outcome("Kettle", Some(30.0), Verdict::Blocked)).unwrap();

        fs::write(store.snapshot_path(), "{ truncated").unwrap();
        assert_eq!(store.snapshot().unwrap().total_battles, 1);

        store.append(&outcome("Toaster", Some(40.0), Verdict::Blocked)).unwrap();
        let last = store.append(&outcome("Mixer", Some(10.0), Verdict::Allowed)).unwrap();
        assert_eq!(last.total_battles, 3);
        assert_eq!(store.history().unwrap().len(), 3);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.total_battles, 3);
        assert_eq!(snapshot.victories, 2);
        let on_disk: StatsSnapshot =
            serde_json::from_str(&fs::read_to_string(store.snapshot_path()).unwrap()).unwrap();
        assert_eq!(on_disk.total_battles, 3);
    }

    #[test]
    fn report_aggregates_history() {
        let dir = tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();
        store
            .append(&outcome_in("Jacket", Some(120.0), Verdict::Blocked, "Clothing", 0))
            .unwrap();
        store
            .append(&outcome_in("Socks", Some(8.0), Verdict::Allowed, "Clothing", 1))
            .unwrap();

        let report = store.report().unwrap();
        assert_eq!(report.totals.attempts, 2);
        assert_eq!(report.by_category["Clothing"].amount_saved, 120.0);
        assert_eq!(report.by_category["Clothing"].amount_spent, 8.0);
        assert_eq!(report.timeline.len(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let dir = tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();
        assert!(!store.reset().unwrap());

        store.append(&outcome("Kettle", Some(30.0), Verdict::Blocked)).unwrap();
        assert!(store.reset().unwrap());
        assert!(!store.history_path().exists());
        assert!(!store.snapshot_path().exists());
        assert_eq!(store.snapshot().unwrap().total_battles, 0);
    }
}
