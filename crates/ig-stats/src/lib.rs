//! # ig-stats
//!
//! File-backed statistics for Impulse Guard.
//!
//! Every finalized gate session produces one [`ig_gate::AttemptOutcome`].
//! This crate appends it to a JSONL history and folds it into a
//! dashboard-compatible snapshot, and answers read-side questions (per
//! category, per day) from the history.
//!
//! ## Key components
//!
//! - [`StatsStore`]: data directory with `history.jsonl` and `stats.json`
//! - [`FileStatsRecorder`]: [`ig_gate::StatsRecorder`] over a store
//! - [`StatsSnapshot`]: running totals in the dashboard's field names
//! - [`StatsReport`]: totals, category rollups and a daily timeline

pub mod aggregate;
pub mod error;
pub mod history;
pub mod recorder;
pub mod snapshot;
pub mod store;

pub use aggregate::{DailyTotals, Rollup, StatsReport};
pub use error::StatsError;
pub use history::HistoryLog;
pub use recorder::FileStatsRecorder;
pub use snapshot::{PurchaseEntry, StatsSnapshot, SEEDED_CATEGORIES};
pub use store::StatsStore;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use ig_gate::{AttemptOutcome, BudgetMode, Grade, Resolution, Verdict};
    use uuid::Uuid;

    /// An Electronics outcome on the base day.
    pub fn outcome(name: &str, amount: Option<f64>, verdict: Verdict) -> AttemptOutcome {
        outcome_in(name, amount, verdict, "Electronics", 0)
    }

    /// An outcome in `category`, `day` days after 2024-03-01 12:00 UTC.
    pub fn outcome_in(
        name: &str,
        amount: Option<f64>,
        verdict: Verdict,
        category: &str,
        day: i64,
    ) -> AttemptOutcome {
        let base = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid base date");
        let timestamp = base + Duration::days(day);
        let (resolution, grade, persuasion) = match verdict {
            Verdict::Allowed => (Resolution::Persuaded, Grade::B, 70),
            Verdict::Blocked => (Resolution::BudgetExhausted, Grade::D, 30),
        };
        AttemptOutcome {
            session_id: Uuid::new_v4(),
            domain: "shop.example.com".to_string(),
            product_name: name.to_string(),
            category: category.to_string(),
            amount,
            verdict,
            grade,
            resolution,
            mode: BudgetMode::Countdown,
            persuasion,
            initial_budget: 120,
            pass_threshold: 60,
            arguments: 2,
            started_at: Some(timestamp - Duration::seconds(90)),
            timestamp,
            summary: format!("{} was {}", name, verdict),
        }
    }
}
