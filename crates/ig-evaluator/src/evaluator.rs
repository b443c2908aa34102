// evaluator.rs - GuardianEvaluator: the ArgumentEvaluator used by the gate.
//
// Order of operations for one argument:
//   1. Empty text is the only error.
//   2. Degenerate input (mashing, repeats, walls of text, one word) scores 0.
//   3. If a text generator is configured, ask it under a hard timeout and
//      parse the reply strictly.
//   4. Anything that goes wrong in step 3 is logged and the heuristic
//      scorer answers instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ig_gate::{ArgumentEvaluator, Evaluation, EvaluationError, EvaluationRequest, ScoreSource};

use crate::client::{ChatCompletionsClient, TextGenerator};
use crate::config::EvaluatorConfig;
use crate::degenerate::DegenerateDetector;
use crate::error::{EvaluatorError, GeneratorError, ModelError};
use crate::feedback::{degenerate_feedback, heuristic_feedback};
use crate::heuristic::HeuristicScorer;
use crate::prompt::build_messages;
use crate::reply::ReplyParser;

/// Scores arguments with an optional text generator and a local fallback.
pub struct GuardianEvaluator {
    detector: DegenerateDetector,
    scorer: HeuristicScorer,
    parser: ReplyParser,
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    history_window: usize,
}

impl GuardianEvaluator {
    /// Heuristic-only evaluator.
    pub fn heuristic(config: &EvaluatorConfig) -> Result<Self, EvaluatorError> {
        Ok(Self {
            detector: DegenerateDetector::new(&config.heuristics)?,
            scorer: HeuristicScorer::new()?,
            parser: ReplyParser::new()?,
            generator: None,
            timeout: config.model.timeout(),
            history_window: config.model.history_window,
        })
    }

    /// Evaluator wired to the configured chat-completions service.
    ///
    /// A disabled model section or a missing API key is not an error: the
    /// evaluator simply runs heuristic-only and says so in the log.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvaluatorError> {
        let evaluator = Self::heuristic(config)?;
        if !config.model.enabled {
            tracing::info!("text generation disabled; using heuristic scoring");
            return Ok(evaluator);
        }
        match ChatCompletionsClient::from_config(&config.model) {
            Ok(client) => {
                tracing::info!(
                    endpoint = %client.endpoint(),
                    model = %config.model.model,
                    timeout_ms = config.model.timeout_ms,
                    "text generation enabled"
                );
                Ok(evaluator.with_generator(Arc::new(client)))
            }
            Err(GeneratorError::MissingApiKey(var)) => {
                tracing::info!(env = %var, "no API key found; using heuristic scoring");
                Ok(evaluator)
            }
            Err(GeneratorError::Transport(source)) => Err(EvaluatorError::Client(source)),
            Err(e) => {
                tracing::warn!(error = %e, "text generation unavailable; using heuristic scoring");
                Ok(evaluator)
            }
        }
    }

    /// Builder-style: use `generator` for the primary path.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Builder-style: bound on one generator call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Ask the generator and parse its reply. Every failure is a `ModelError`.
    async fn consult(
        &self,
        generator: &dyn TextGenerator,
        request: &EvaluationRequest<'_>,
    ) -> Result<Evaluation, ModelError> {
        let messages = build_messages(request, self.history_window);
        let content = tokio::time::timeout(self.timeout, generator.generate(&messages))
            .await
            .map_err(|_| ModelError::Timeout(self.timeout))??;

        let reply = self.parser.parse(&content)?;
        let raw = reply.score_for(request.strategy)?;
        Ok(Evaluation {
            score: request.strategy.clamp(raw),
            feedback: reply.feedback,
            source: ScoreSource::Model,
        })
    }

    fn heuristic_evaluation(&self, request: &EvaluationRequest<'_>) -> Evaluation {
        let score = self
            .scorer
            .score(request.text, request.context, request.strategy);
        Evaluation {
            score: score.score,
            feedback: heuristic_feedback(request.text, &score, request.context),
            source: ScoreSource::Heuristic,
        }
    }
}

#[async_trait]
impl ArgumentEvaluator for GuardianEvaluator {
    async fn evaluate(
        &self,
        request: EvaluationRequest<'_>,
    ) -> Result<Evaluation, EvaluationError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(EvaluationError::EmptyInput);
        }
        let request = EvaluationRequest { text, ..request };

        if let Some(kind) = self.detector.check(text, request.history) {
            tracing::debug!(kind = %kind, "degenerate argument");
            return Ok(Evaluation {
                score: 0,
                feedback: degenerate_feedback(kind).to_string(),
                source: ScoreSource::Degenerate { kind },
            });
        }

        if let Some(generator) = &self.generator {
            match self.consult(generator.as_ref(), &request).await {
                Ok(evaluation) => {
                    tracing::debug!(score = evaluation.score, "model evaluation");
                    return Ok(evaluation);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "model evaluation failed; falling back to heuristic");
                }
            }
        }

        Ok(self.heuristic_evaluation(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;
    use chrono::Utc;
    use ig_gate::{ArgumentRecord, DegenerateKind, PurchaseContext, ScoringStrategy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator returning a canned reply, counting calls.
    struct Canned {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(code) => Err(GeneratorError::Status {
                    status: *code,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    /// Generator that never answers in time.
    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, GeneratorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("[FEEDBACK]: too late [TIME]: -90".to_string())
        }
    }

    const SCENARIO: &str =
        "I already replaced my broken laptop charger and compared prices, staying within budget";

    fn request<'a>(
        text: &'a str,
        ctx: &'a PurchaseContext,
        history: &'a [ArgumentRecord],
        strategy: &'a ScoringStrategy,
    ) -> EvaluationRequest<'a> {
        EvaluationRequest {
            text,
            context: ctx,
            history,
            strategy,
            remaining: 120,
            initial: 120,
        }
    }

    fn heuristic() -> GuardianEvaluator {
        GuardianEvaluator::heuristic(&EvaluatorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn empty_input_is_the_only_error() {
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();
        let result = heuristic().evaluate(request("   ", &ctx, &[], &strategy)).await;
        assert_eq!(result, Err(EvaluationError::EmptyInput));
    }

    #[tokio::test]
    async fn heuristic_scenario_scores_in_range() {
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();
        let eval = heuristic()
            .evaluate(request(SCENARIO, &ctx, &[], &strategy))
            .await
            .unwrap();
        assert!((45..=60).contains(&eval.score), "score {}", eval.score);
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert!(eval.feedback.contains("need"));
    }

    #[tokio::test]
    async fn degenerate_input_skips_the_model() {
        let canned = Canned::ok("[FEEDBACK]: great [TIME]: -90");
        let evaluator = heuristic().with_generator(canned.clone());
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();

        let eval = evaluator
            .evaluate(request("asdfasdfasdf", &ctx, &[], &strategy))
            .await
            .unwrap();
        assert_eq!(eval.score, 0);
        assert_eq!(
            eval.source,
            ScoreSource::Degenerate {
                kind: DegenerateKind::Gibberish
            }
        );
        assert_eq!(canned.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_text_scores_zero() {
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();
        let history = vec![ArgumentRecord {
            text: SCENARIO.to_string(),
            score: 50,
            feedback: "ok".to_string(),
            source: ScoreSource::Heuristic,
            timestamp: Utc::now(),
        }];
        let eval = heuristic()
            .evaluate(request(SCENARIO, &ctx, &history, &strategy))
            .await
            .unwrap();
        assert_eq!(eval.score, 0);
        assert_eq!(eval.source.degenerate_kind(), Some(DegenerateKind::Repetition));
    }

    #[tokio::test]
    async fn model_reply_is_parsed_and_clamped() {
        let evaluator = heuristic().with_generator(Canned::ok(
            "[FEEDBACK]: 'Charger broke' - real need. Did you check the warranty?\n[TIME]: -140",
        ));
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();
        let eval = evaluator
            .evaluate(request(SCENARIO, &ctx, &[], &strategy))
            .await
            .unwrap();
        assert_eq!(eval.source, ScoreSource::Model);
        assert_eq!(eval.score, 90);
        assert!(eval.feedback.starts_with("'Charger broke'"));
    }

    #[tokio::test]
    async fn untagged_model_reply_falls_back() {
        let evaluator = heuristic().with_generator(Canned::ok("Sure, go ahead and buy it!"));
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();
        let eval = evaluator
            .evaluate(request(SCENARIO, &ctx, &[], &strategy))
            .await
            .unwrap();
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert_eq!(eval.score, 50);
    }

    #[tokio::test]
    async fn service_error_falls_back() {
        let canned = Canned::status(503);
        let evaluator = heuristic().with_generator(canned.clone());
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::health();
        let eval = evaluator
            .evaluate(request(SCENARIO, &ctx, &[], &strategy))
            .await
            .unwrap();
        assert_eq!(canned.calls.load(Ordering::SeqCst), 1);
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert_eq!(eval.score, 35);
    }

    #[tokio::test]
    async fn slow_model_times_out_to_heuristic() {
        let evaluator = heuristic()
            .with_generator(Arc::new(Stalled))
            .with_timeout(Duration::from_millis(50));
        let ctx = PurchaseContext::default();
        let strategy = ScoringStrategy::countdown();

        let started = std::time::Instant::now();
        let eval = evaluator
            .evaluate(request(SCENARIO, &ctx, &[], &strategy))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert!((45..=60).contains(&eval.score));
    }

    #[test]
    fn disabled_model_builds_heuristic_only() {
        let mut config = EvaluatorConfig::default();
        config.model.enabled = false;
        assert!(!GuardianEvaluator::from_config(&config).unwrap().has_generator());
    }

    #[test]
    fn missing_key_builds_heuristic_only() {
        let mut config = EvaluatorConfig::default();
        config.model.api_key = None;
        config.model.api_key_env = "IG_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(!GuardianEvaluator::from_config(&config).unwrap().has_generator());
    }
}
