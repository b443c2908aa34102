// gate.rs - PurchaseGate: one gate session plus everything around it.
//
// The gate owns the current session, the evaluator, the stats recorder, the
// signal channel, and the trigger matcher. Whatever resolves a session (an
// argument, the clock, a dismissal) finalizes it on the spot: the outcome is
// recorded and the allow/block signal sent exactly once. Recorder and
// channel failures are logged and never change the decision.

use std::sync::Arc;
use std::time::Duration;

use ig_gate::{
    ArgumentEvaluator, ArgumentRecord, AttemptOutcome, BudgetMode, Evaluation, EvaluationError,
    EvaluationRequest, Finalization, GateConfig, GateSession, PurchaseContext, ScoringStrategy,
    StatsRecorder, SubmitOutcome, Submission, Verdict,
};

use crate::channel::{GateChannel, GateSignal};
use crate::error::HostError;
use crate::trigger::{domain_of, TriggerMatcher};

/// An argument that has been validated and is waiting for its score.
///
/// Owns copies of everything the evaluator reads, so the evaluation can run
/// while the gate keeps serving other requests.
pub struct PendingEvaluation {
    submission: Submission,
    context: PurchaseContext,
    history: Vec<ArgumentRecord>,
    strategy: ScoringStrategy,
    remaining: u32,
    initial: u32,
}

impl PendingEvaluation {
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Score the argument. Dropping the future abandons the evaluation.
    pub async fn run(
        self,
        evaluator: Arc<dyn ArgumentEvaluator>,
    ) -> (Submission, Result<Evaluation, EvaluationError>) {
        let result = evaluator
            .evaluate(EvaluationRequest {
                text: &self.submission.text,
                context: &self.context,
                history: &self.history,
                strategy: &self.strategy,
                remaining: self.remaining,
                initial: self.initial,
            })
            .await;
        (self.submission, result)
    }
}

/// Orchestrates gate sessions for one browser profile.
pub struct PurchaseGate {
    config: GateConfig,
    evaluator: Arc<dyn ArgumentEvaluator>,
    recorder: Arc<dyn StatsRecorder>,
    channel: Arc<dyn GateChannel>,
    trigger: TriggerMatcher,
    close_tab_on_block: bool,
    session: Option<GateSession>,
}

impl PurchaseGate {
    pub fn new(
        config: GateConfig,
        evaluator: Arc<dyn ArgumentEvaluator>,
        recorder: Arc<dyn StatsRecorder>,
        channel: Arc<dyn GateChannel>,
        trigger: TriggerMatcher,
    ) -> Result<Self, HostError> {
        config.validate()?;
        Ok(Self {
            config,
            evaluator,
            recorder,
            channel,
            trigger,
            close_tab_on_block: false,
            session: None,
        })
    }

    /// Builder-style: ask the browser to close the tab on a block.
    pub fn with_close_tab_on_block(mut self, close_tab: bool) -> Self {
        self.close_tab_on_block = close_tab;
        self
    }

    pub fn session(&self) -> Option<&GateSession> {
        self.session.as_ref()
    }

    pub fn evaluator(&self) -> Arc<dyn ArgumentEvaluator> {
        Arc::clone(&self.evaluator)
    }

    pub fn trigger(&self) -> &TriggerMatcher {
        &self.trigger
    }

    /// True while a session is accepting arguments.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_terminal())
    }

    /// Open a gate for `context`, dismissing any session still running.
    ///
    /// `mode` overrides the configured mode; switching modes also resets
    /// the budget and score bounds to that mode's defaults.
    pub fn start(
        &mut self,
        mut context: PurchaseContext,
        mode: Option<BudgetMode>,
    ) -> Result<&GateSession, HostError> {
        if self.is_active() {
            tracing::info!("new purchase attempt replaces the running gate session");
            self.dismiss();
        }

        if context.domain.trim().is_empty() && !context.url.is_empty() {
            context.domain = domain_of(&context.url);
        }

        let config = match mode {
            Some(mode) if mode != self.config.mode => GateConfig {
                allow_negative: self.config.allow_negative,
                min_chars: self.config.min_chars,
                min_words: self.config.min_words,
                ..GateConfig::for_mode(mode)
            },
            _ => self.config.clone(),
        };

        let session = GateSession::start_with(context, &config)?;
        Ok(self.session.insert(session))
    }

    /// Score one argument inline and apply it.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome, HostError> {
        let evaluator = Arc::clone(&self.evaluator);
        let session = self.session.as_mut().ok_or(HostError::NoSession)?;
        let outcome = session.submit(text, evaluator.as_ref()).await?;
        if outcome.resolution.is_some() {
            self.settle()?;
        }
        Ok(outcome)
    }

    /// Validate an argument and detach its evaluation.
    ///
    /// Pair with [`PendingEvaluation::run`] and
    /// [`complete_submission`](Self::complete_submission). A newer
    /// submission or a dismissal makes the pending one stale.
    pub fn prepare_submission(&mut self, text: &str) -> Result<PendingEvaluation, HostError> {
        let session = self.session.as_mut().ok_or(HostError::NoSession)?;
        let submission = session.begin_submission(text)?;
        let budget = session.budget();
        Ok(PendingEvaluation {
            submission,
            context: session.context().clone(),
            history: session.arguments().to_vec(),
            strategy: session.strategy().clone(),
            remaining: budget.remaining,
            initial: budget.initial,
        })
    }

    /// Apply the result of a detached evaluation.
    pub fn complete_submission(
        &mut self,
        submission: &Submission,
        result: Result<Evaluation, EvaluationError>,
    ) -> Result<SubmitOutcome, HostError> {
        let session = self.session.as_mut().ok_or(HostError::NoSession)?;
        let evaluation = result?;
        let outcome = session.apply_evaluation(submission, evaluation)?;
        if outcome.resolution.is_some() {
            self.settle()?;
        }
        Ok(outcome)
    }

    /// Advance the countdown. Returns the outcome if the clock ended the session.
    pub fn tick(&mut self, elapsed: Duration) -> Option<AttemptOutcome> {
        let session = self.session.as_mut()?;
        session.advance_clock(elapsed)?;
        self.settle_logged()
    }

    /// The shopper walked away. Returns the outcome if a session was running.
    pub fn dismiss(&mut self) -> Option<AttemptOutcome> {
        let session = self.session.as_mut()?;
        session.dismiss()?;
        self.settle_logged()
    }

    /// Lock the current session and return its outcome.
    ///
    /// Safe to call repeatedly: the outcome is recorded and signalled only
    /// the first time.
    pub fn finalize(&mut self) -> Result<AttemptOutcome, HostError> {
        self.settle()
    }

    /// Whether navigating to `url` should raise the gate.
    pub fn should_gate(&self, url: &str, domain: Option<&str>) -> bool {
        self.trigger.should_gate(url, domain)
    }

    fn settle(&mut self) -> Result<AttemptOutcome, HostError> {
        let session = self.session.as_mut().ok_or(HostError::NoSession)?;
        let Finalization { outcome, first } = session.finalize()?;
        if first {
            self.emit(&outcome);
        }
        Ok(outcome)
    }

    fn settle_logged(&mut self) -> Option<AttemptOutcome> {
        match self.settle() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "failed to finalize gate session");
                None
            }
        }
    }

    fn emit(&mut self, outcome: &AttemptOutcome) {
        tracing::info!(
            session_id = %outcome.session_id,
            verdict = %outcome.verdict,
            resolution = %outcome.resolution,
            grade = %outcome.grade,
            domain = %outcome.domain,
            "gate session finalized"
        );

        if let Err(e) = self.recorder.record(outcome) {
            tracing::warn!(session_id = %outcome.session_id, error = %e, "failed to record outcome");
        }

        let signal = match outcome.verdict {
            Verdict::Allowed => {
                self.trigger.unlock(&outcome.domain);
                GateSignal::Allow {
                    domain: outcome.domain.clone(),
                }
            }
            Verdict::Blocked => GateSignal::Block {
                domain: outcome.domain.clone(),
                close_tab: self.close_tab_on_block,
            },
        };
        if let Err(e) = self.channel.send(&signal) {
            tracing::warn!(
                channel = self.channel.channel_id(),
                signal = %signal,
                error = %e,
                "failed to deliver gate signal"
            );
        }
    }
}
