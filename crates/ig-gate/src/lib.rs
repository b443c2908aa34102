//! # ig-gate
//!
//! The purchase justification gate for Impulse Guard.
//!
//! A [`GateSession`] holds one purchase attempt: the product being bought, a
//! budget (a countdown timer or the guardian's health), and the arguments the
//! shopper has made so far. Each argument is scored by an
//! [`ArgumentEvaluator`] and applied to the budget; the session passes when
//! persuasion reaches the configured threshold and fails when the budget runs
//! out first or the shopper walks away.
//!
//! ## Key components
//!
//! - [`GateSession`]: the state machine (Idle → Active → Passed | Failed)
//! - [`ScoringStrategy`] / [`BudgetMode`]: countdown vs health, score clamping
//! - [`ArgumentEvaluator`]: async seam for scoring one argument
//! - [`OutcomeResolver`]: pure mapping from a terminal session to an [`AttemptOutcome`]
//! - [`StatsRecorder`]: best-effort sink for finalized outcomes
//! - [`PurchaseContext`]: best-effort product and page data

pub mod config;
pub mod context;
pub mod error;
pub mod evaluation;
pub mod outcome;
pub mod record;
pub mod recorder;
pub mod session;
pub mod strategy;

pub use config::GateConfig;
pub use context::{parse_amount, PurchaseContext};
pub use error::GateError;
pub use evaluation::{ArgumentEvaluator, Evaluation, EvaluationError, EvaluationRequest};
pub use outcome::{AttemptOutcome, Grade, OutcomeResolver, Verdict};
pub use record::{ArgumentRecord, DegenerateKind, ScoreSource};
pub use recorder::{MemoryRecorder, RecordError, StatsRecorder};
pub use session::{
    Budget, Finalization, GateSession, GateState, Resolution, SubmitOutcome, Submission,
};
pub use strategy::{BudgetMode, ScoringStrategy};
