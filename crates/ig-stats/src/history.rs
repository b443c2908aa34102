// history.rs - Append-only JSONL attempt history.
//
// One `AttemptOutcome` per line, oldest first. Lines are never rewritten;
// the file only grows until the store is reset.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ig_gate::AttemptOutcome;

use crate::error::StatsError;

/// An append-only history backed by a JSONL file.
pub struct HistoryLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl HistoryLog {
    /// Open (or create) the history file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StatsError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append one outcome and flush.
    pub fn append(&mut self, outcome: &AttemptOutcome) -> Result<(), StatsError> {
        let json = serde_json::to_string(outcome)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read every outcome in file order. A missing file is an empty history.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AttemptOutcome>, StatsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(|source| StatsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut outcomes = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let outcome = serde_json::from_str(&line).map_err(|source| {
                StatsError::CorruptHistory {
                    line: index + 1,
                    source,
                }
            })?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::outcome;
    use ig_gate::Verdict;
    use tempfile::tempdir;

    #[test]
    fn append_and_read_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let mut log = HistoryLog::open(&path).unwrap();
            log.append(&outcome("Yoga Mat", Some(25.0), Verdict::Blocked))
                .unwrap();
            log.append(&outcome("Headphones", Some(199.0), Verdict::Allowed))
                .unwrap();
        }
        // Reopening appends rather than truncating.
        HistoryLog::open(&path)
            .unwrap()
            .append(&outcome("Desk Lamp", None, Verdict::Blocked))
            .unwrap();

        let outcomes = HistoryLog::read_all(&path).unwrap();
        let names: Vec<&str> = outcomes.iter().map(|o| o.product_name.as_str()).collect();
        assert_eq!(names, ["Yoga Mat", "Headphones", "Desk Lamp"]);
        assert_eq!(outcomes[2].amount, None);
    }

    #[test]
    fn missing_file_is_empty_and_blank_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        assert!(HistoryLog::read_all(&path).unwrap().is_empty());

        let line = serde_json::to_string(&outcome("Kettle", Some(30.0), Verdict::Blocked)).unwrap();
        std::fs::write(&path, format!("\n{}\n\n", line)).unwrap();
        assert_eq!(HistoryLog::read_all(&path).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_line_reports_its_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let line = serde_json::to_string(&outcome("Kettle", Some(30.0), Verdict::Blocked)).unwrap();
        std::fs::write(&path, format!("{}\n{{not json\n", line)).unwrap();

        let err = HistoryLog::read_all(&path).unwrap_err();
        assert!(matches!(err, StatsError::CorruptHistory { line: 2, .. }));
    }
}
