// record.rs - ArgumentRecord: one scored justification within a session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a submission was scored zero without being judged on its merits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateKind {
    /// Keyboard mashing, vowel-less strings, repeated characters.
    Gibberish,
    /// Exact or near-duplicate of an earlier argument in the same session.
    Repetition,
    /// Wall of text beyond the word limit.
    TooLong,
    /// Too few words to be an argument.
    TooShort,
}

impl fmt::Display for DegenerateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateKind::Gibberish => write!(f, "gibberish"),
            DegenerateKind::Repetition => write!(f, "repetition"),
            DegenerateKind::TooLong => write!(f, "too_long"),
            DegenerateKind::TooShort => write!(f, "too_short"),
        }
    }
}

/// Which path produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScoreSource {
    /// The external text-generation service.
    Model,
    /// The local keyword scorer.
    Heuristic,
    /// Rejected before scoring.
    Degenerate { kind: DegenerateKind },
}

impl ScoreSource {
    pub fn degenerate_kind(&self) -> Option<DegenerateKind> {
        match self {
            ScoreSource::Degenerate { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreSource::Model => write!(f, "model"),
            ScoreSource::Heuristic => write!(f, "heuristic"),
            ScoreSource::Degenerate { kind } => write!(f, "degenerate:{}", kind),
        }
    }
}

/// A submitted argument with the score that was applied to the budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgumentRecord {
    /// The text as submitted (trimmed).
    pub text: String,
    /// Applied score, already clamped by the session's strategy.
    pub score: i32,
    /// Feedback shown to the shopper.
    pub feedback: String,
    #[serde(flatten)]
    pub source: ScoreSource,
    pub timestamp: DateTime<Utc>,
}

impl ArgumentRecord {
    pub fn was_degenerate(&self) -> bool {
        self.source.degenerate_kind().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_source_inline() {
        let record = ArgumentRecord {
            text: "asdf".to_string(),
            score: 0,
            feedback: "Nonsense.".to_string(),
            source: ScoreSource::Degenerate {
                kind: DegenerateKind::Gibberish,
            },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "degenerate");
        assert_eq!(json["kind"], "gibberish");

        let back: ArgumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert!(back.was_degenerate());
    }

    #[test]
    fn source_display() {
        assert_eq!(ScoreSource::Model.to_string(), "model");
        let degenerate = ScoreSource::Degenerate {
            kind: DegenerateKind::TooLong,
        };
        assert_eq!(degenerate.to_string(), "degenerate:too_long");
    }
}
