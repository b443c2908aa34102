// evaluation.rs - The ArgumentEvaluator seam.
//
// The session does not know how arguments are judged. It hands the evaluator
// the text plus everything needed for context (product, prior arguments,
// strategy, budget) and gets back a score and feedback. The evaluator has no
// side effects: recording the argument and applying the score is the
// session's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::PurchaseContext;
use crate::record::{ArgumentRecord, ScoreSource};
use crate::strategy::ScoringStrategy;

/// Everything an evaluator may look at for one argument.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub text: &'a str,
    pub context: &'a PurchaseContext,
    /// Prior arguments in this session, oldest first.
    pub history: &'a [ArgumentRecord],
    pub strategy: &'a ScoringStrategy,
    pub remaining: u32,
    pub initial: u32,
}

/// The evaluator's verdict on one argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    /// Score in budget units. The session clamps it again before applying.
    pub score: i32,
    pub feedback: String,
    #[serde(flatten)]
    pub source: ScoreSource,
}

/// The only failure an evaluator may surface: nothing to evaluate.
///
/// External-service problems are recovered inside the evaluator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("argument is empty")]
    EmptyInput,
}

/// Scores one justification.
///
/// Implementations must be `Send + Sync` so a gate can hold them behind an
/// `Arc` and call them from any task.
#[async_trait]
pub trait ArgumentEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        request: EvaluationRequest<'_>,
    ) -> Result<Evaluation, EvaluationError>;
}
