// aggregate.rs - Read-side rollups over the attempt history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ig_gate::{AttemptOutcome, Grade};
use serde::Serialize;

/// Counts and sums for a slice of attempts.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Rollup {
    pub attempts: u64,
    pub blocked: u64,
    pub allowed: u64,
    /// Sum of blocked amounts.
    pub amount_saved: f64,
    /// Sum of allowed amounts.
    pub amount_spent: f64,
}

impl Rollup {
    fn add(&mut self, outcome: &AttemptOutcome) {
        let amount = outcome.amount_or_zero();
        self.attempts += 1;
        if outcome.is_allowed() {
            self.allowed += 1;
            self.amount_spent += amount;
        } else {
            self.blocked += 1;
            self.amount_saved += amount;
        }
    }

    /// Blocked share of attempts, 0–100.
    pub fn block_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.blocked as f64 * 100.0 / self.attempts as f64
        }
    }
}

/// One calendar day (UTC) of activity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Rollup,
}

/// Everything the history says, summarised.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsReport {
    pub totals: Rollup,
    pub by_category: BTreeMap<String, Rollup>,
    /// Oldest day first.
    pub timeline: Vec<DailyTotals>,
    pub grades: BTreeMap<Grade, u64>,
    pub history: Vec<AttemptOutcome>,
}

impl StatsReport {
    pub fn from_outcomes(history: Vec<AttemptOutcome>) -> Self {
        let mut totals = Rollup::default();
        let mut by_category: BTreeMap<String, Rollup> = BTreeMap::new();
        let mut by_day: BTreeMap<NaiveDate, Rollup> = BTreeMap::new();
        let mut grades: BTreeMap<Grade, u64> = BTreeMap::new();

        for outcome in &history {
            totals.add(outcome);
            by_category
                .entry(outcome.category.clone())
                .or_default()
                .add(outcome);
            by_day
                .entry(outcome.timestamp.date_naive())
                .or_default()
                .add(outcome);
            *grades.entry(outcome.grade).or_insert(0) += 1;
        }

        let timeline = by_day
            .into_iter()
            .map(|(date, totals)| DailyTotals { date, totals })
            .collect();

        Self {
            totals,
            by_category,
            timeline,
            grades,
            history,
        }
    }

    /// The `n` most recent attempts, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &AttemptOutcome> {
        self.history.iter().rev().take(n)
    }
}
