// session.rs - GateSession: the state machine for one purchase attempt.
//
// A GateSession owns everything about one attempt: the product context, the
// budget, the arguments submitted so far, and the terminal decision.
//
//   Idle → Active → Passed   (persuasion reached the pass threshold)
//               └──→ Failed   (budget ran out first, or the shopper gave up)
//
// Rules:
//   - The budget is clamped to [0, initial] at all times.
//   - Persuasion is the running sum of applied scores, never below zero.
//   - Once Passed or Failed, every mutating call is rejected without change.
//
// Evaluation is asynchronous, so submission is split in two halves:
// `begin_submission` validates and issues a ticket, `apply_evaluation`
// applies a result only if its ticket is still the current one. A result
// for a superseded ticket, or one arriving after the session resolved, is
// discarded.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GateConfig;
use crate::context::PurchaseContext;
use crate::error::GateError;
use crate::evaluation::{ArgumentEvaluator, Evaluation, EvaluationError, EvaluationRequest};
use crate::outcome::{AttemptOutcome, OutcomeResolver};
use crate::record::ArgumentRecord;
use crate::strategy::ScoringStrategy;

/// Lifecycle state of a gate session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Created but not yet shown to the shopper.
    Idle,
    /// Accepting arguments.
    Active,
    /// Purchase allowed.
    Passed,
    /// Purchase blocked.
    Failed,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateState::Idle => write!(f, "idle"),
            GateState::Active => write!(f, "active"),
            GateState::Passed => write!(f, "passed"),
            GateState::Failed => write!(f, "failed"),
        }
    }
}

impl GateState {
    /// Check whether transitioning from this state to `next` is valid.
    ///
    ///   Idle → Active → Passed | Failed
    ///   Idle → Failed (dismissed before it was ever shown)
    pub fn can_transition_to(&self, next: &GateState) -> bool {
        matches!(
            (self, next),
            (GateState::Idle, GateState::Active)
                | (GateState::Idle, GateState::Failed)
                | (GateState::Active, GateState::Passed)
                | (GateState::Active, GateState::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Passed | GateState::Failed)
    }
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Persuasion reached the pass threshold.
    Persuaded,
    /// The budget hit zero before the threshold was reached.
    BudgetExhausted,
    /// The shopper gave up or navigated away.
    Abandoned,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Persuaded => write!(f, "persuaded"),
            Resolution::BudgetExhausted => write!(f, "budget_exhausted"),
            Resolution::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Remaining and initial budget, in the mode's units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Budget {
    pub initial: u32,
    pub remaining: u32,
}

impl Budget {
    fn full(initial: u32) -> Self {
        Self {
            initial,
            remaining: initial,
        }
    }
}

/// A validated submission waiting for its evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session_id: Uuid,
    pub ticket: u64,
    /// Trimmed argument text.
    pub text: String,
}

/// What happened when an evaluation was applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitOutcome {
    pub record: ArgumentRecord,
    pub budget: Budget,
    pub persuasion: u32,
    pub state: GateState,
    /// Set when this argument resolved the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

/// Result of `finalize()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    pub outcome: AttemptOutcome,
    /// True only for the first call on this session. Callers use it to emit
    /// the outcome exactly once.
    pub first: bool,
}

/// The state of one purchase-justification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSession {
    session_id: Uuid,
    context: PurchaseContext,
    strategy: ScoringStrategy,
    budget: Budget,
    pass_threshold: u32,
    persuasion: u32,
    arguments: Vec<ArgumentRecord>,
    state: GateState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution: Option<Resolution>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved_at: Option<DateTime<Utc>>,
    /// Wall-clock time observed through `advance_clock`, in milliseconds.
    elapsed_ms: u64,
    /// Sub-second remainder not yet charged to a countdown budget.
    clock_carry_ms: u64,
    min_chars: usize,
    min_words: usize,
    next_ticket: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_ticket: Option<u64>,
    finalized: bool,
}

impl GateSession {
    /// Create an idle session. The configuration is validated here so a
    /// broken config cannot produce an unwinnable gate.
    pub fn new(context: PurchaseContext, config: &GateConfig) -> Result<Self, GateError> {
        config.validate()?;
        Ok(Self {
            session_id: Uuid::new_v4(),
            context,
            strategy: config.strategy(),
            budget: Budget::full(config.initial_budget()),
            pass_threshold: config.pass_threshold(),
            persuasion: 0,
            arguments: Vec::new(),
            state: GateState::Idle,
            resolution: None,
            created_at: Utc::now(),
            started_at: None,
            resolved_at: None,
            elapsed_ms: 0,
            clock_carry_ms: 0,
            min_chars: config.min_chars,
            min_words: config.min_words,
            next_ticket: 0,
            pending_ticket: None,
            finalized: false,
        })
    }

    /// Create a session and start it immediately with a full budget.
    pub fn start_with(context: PurchaseContext, config: &GateConfig) -> Result<Self, GateError> {
        let mut session = Self::new(context, config)?;
        session.start()?;
        Ok(session)
    }

    /// Idle → Active.
    pub fn start(&mut self) -> Result<(), GateError> {
        self.transition(GateState::Active)?;
        self.budget = Budget::full(self.budget.initial);
        self.started_at = Some(Utc::now());
        tracing::info!(
            session_id = %self.session_id,
            mode = %self.strategy.mode,
            budget = self.budget.initial,
            threshold = self.pass_threshold,
            product = %self.context.product_label(),
            "gate session started"
        );
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn context(&self) -> &PurchaseContext {
        &self.context
    }

    pub fn strategy(&self) -> &ScoringStrategy {
        &self.strategy
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn pass_threshold(&self) -> u32 {
        self.pass_threshold
    }

    pub fn persuasion(&self) -> u32 {
        self.persuasion
    }

    pub fn arguments(&self) -> &[ArgumentRecord] {
        &self.arguments
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    // ── Submission ─────────────────────────────────────────────

    /// Validate a submission and issue a ticket for it.
    ///
    /// Fails without touching the session when the session is not active or
    /// the text is empty or too short. Issuing a new ticket supersedes any
    /// evaluation still in flight.
    pub fn begin_submission(&mut self, text: &str) -> Result<Submission, GateError> {
        self.ensure_active()?;

        let text = text.trim();
        if text.is_empty() {
            return Err(GateError::InvalidInput(
                "write a reason before submitting".to_string(),
            ));
        }
        if text.chars().count() < self.min_chars {
            return Err(GateError::InvalidInput(format!(
                "an argument needs at least {} characters",
                self.min_chars
            )));
        }
        if text.split_whitespace().count() < self.min_words {
            return Err(GateError::InvalidInput(format!(
                "an argument needs at least {} words",
                self.min_words
            )));
        }

        self.next_ticket += 1;
        self.pending_ticket = Some(self.next_ticket);
        Ok(Submission {
            session_id: self.session_id,
            ticket: self.next_ticket,
            text: text.to_string(),
        })
    }

    /// The request an evaluator should see for `submission`.
    pub fn evaluation_request<'a>(&'a self, submission: &'a Submission) -> EvaluationRequest<'a> {
        EvaluationRequest {
            text: &submission.text,
            context: &self.context,
            history: &self.arguments,
            strategy: &self.strategy,
            remaining: self.budget.remaining,
            initial: self.budget.initial,
        }
    }

    /// Apply an evaluation to the budget and record the argument.
    ///
    /// The score is clamped by the session's strategy regardless of what the
    /// evaluator returned.
    pub fn apply_evaluation(
        &mut self,
        submission: &Submission,
        evaluation: Evaluation,
    ) -> Result<SubmitOutcome, GateError> {
        if submission.session_id != self.session_id {
            return Err(self.stale(submission.ticket));
        }
        self.ensure_active()?;
        if self.pending_ticket != Some(submission.ticket) {
            return Err(self.stale(submission.ticket));
        }
        self.pending_ticket = None;

        let score = self.strategy.clamp(i64::from(evaluation.score));
        self.apply_score(score);

        let record = ArgumentRecord {
            text: submission.text.clone(),
            score,
            feedback: evaluation.feedback,
            source: evaluation.source,
            timestamp: Utc::now(),
        };
        self.arguments.push(record.clone());

        tracing::debug!(
            session_id = %self.session_id,
            score,
            source = %record.source,
            remaining = self.budget.remaining,
            persuasion = self.persuasion,
            "argument applied"
        );

        let resolution = self.check_threshold();
        Ok(SubmitOutcome {
            record,
            budget: self.budget,
            persuasion: self.persuasion,
            state: self.state,
            resolution,
        })
    }

    /// Validate, evaluate, and apply one argument.
    ///
    /// Dropping the returned future abandons the evaluation; the session is
    /// left as if the argument had never been sent.
    pub async fn submit(
        &mut self,
        text: &str,
        evaluator: &dyn ArgumentEvaluator,
    ) -> Result<SubmitOutcome, GateError> {
        let submission = self.begin_submission(text)?;
        let evaluation = evaluator
            .evaluate(self.evaluation_request(&submission))
            .await
            .map_err(|e| match e {
                EvaluationError::EmptyInput => GateError::InvalidInput(e.to_string()),
            })?;
        self.apply_evaluation(&submission, evaluation)
    }

    // ── Clock and lifecycle ────────────────────────────────────

    /// Charge wall-clock time against a countdown budget.
    ///
    /// Sub-second remainders carry over between calls. Health sessions only
    /// track elapsed time. Returns the resolution if the countdown expired.
    pub fn advance_clock(&mut self, elapsed: Duration) -> Option<Resolution> {
        if self.state != GateState::Active {
            return None;
        }
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);

        if !self.strategy.mode.is_timed() {
            return None;
        }

        self.clock_carry_ms = self.clock_carry_ms.saturating_add(ms);
        let secs = self.clock_carry_ms / 1000;
        self.clock_carry_ms %= 1000;
        let secs = u32::try_from(secs).unwrap_or(u32::MAX);
        self.budget.remaining = self.budget.remaining.saturating_sub(secs);

        if self.budget.remaining == 0 {
            self.resolve(Resolution::BudgetExhausted);
            return self.resolution;
        }
        None
    }

    /// The shopper gave up or navigated away.
    ///
    /// Returns the resolution if this call ended the session, `None` if it
    /// was already terminal.
    pub fn dismiss(&mut self) -> Option<Resolution> {
        if self.is_terminal() {
            return None;
        }
        self.pending_ticket = None;
        self.resolve(Resolution::Abandoned);
        self.resolution
    }

    /// Lock the session and compute its outcome.
    ///
    /// Idempotent: an unresolved session is resolved as abandoned on the
    /// first call; every call returns the same outcome, and only the first
    /// reports `first == true`.
    pub fn finalize(&mut self) -> Result<Finalization, GateError> {
        if !self.is_terminal() {
            self.dismiss();
        }
        let first = !self.finalized;
        self.finalized = true;
        let outcome = OutcomeResolver::resolve(self)?;
        Ok(Finalization { outcome, first })
    }

    // ── Internals ──────────────────────────────────────────────

    fn apply_score(&mut self, score: i32) {
        let initial = self.budget.initial;
        if score >= 0 {
            let points = score.unsigned_abs();
            self.budget.remaining = self.budget.remaining.saturating_sub(points);
            self.persuasion = self.persuasion.saturating_add(points);
        } else {
            let points = score.unsigned_abs();
            self.budget.remaining = self.budget.remaining.saturating_add(points).min(initial);
            self.persuasion = self.persuasion.saturating_sub(points);
        }
    }

    fn check_threshold(&mut self) -> Option<Resolution> {
        if self.persuasion >= self.pass_threshold {
            self.resolve(Resolution::Persuaded);
            self.resolution
        } else if self.budget.remaining == 0 {
            self.resolve(Resolution::BudgetExhausted);
            self.resolution
        } else {
            None
        }
    }

    fn resolve(&mut self, reason: Resolution) {
        let next = match reason {
            Resolution::Persuaded => GateState::Passed,
            Resolution::BudgetExhausted | Resolution::Abandoned => GateState::Failed,
        };
        // Only non-terminal sessions get here.
        if let Err(e) = self.transition(next) {
            tracing::warn!(session_id = %self.session_id, error = %e, "resolution ignored");
            return;
        }
        self.resolution = Some(reason);
        self.resolved_at = Some(Utc::now());
        tracing::info!(
            session_id = %self.session_id,
            state = %self.state,
            reason = %reason,
            persuasion = self.persuasion,
            remaining = self.budget.remaining,
            "gate session resolved"
        );
    }

    fn transition(&mut self, next: GateState) -> Result<(), GateError> {
        if !self.state.can_transition_to(&next) {
            return Err(GateError::InvalidTransition {
                session_id: self.session_id,
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), GateError> {
        match self.state {
            GateState::Active => Ok(()),
            GateState::Idle => Err(GateError::NotActive {
                session_id: self.session_id,
                state: self.state.to_string(),
            }),
            GateState::Passed | GateState::Failed => Err(GateError::Terminal {
                session_id: self.session_id,
                state: self.state.to_string(),
            }),
        }
    }

    fn stale(&self, ticket: u64) -> GateError {
        GateError::StaleEvaluation {
            session_id: self.session_id,
            ticket,
            current: self.pending_ticket.unwrap_or(self.next_ticket),
        }
    }
}
