//! # ig-evaluator
//!
//! Argument scoring for the Impulse Guard purchase gate.
//!
//! [`GuardianEvaluator`] implements [`ig_gate::ArgumentEvaluator`]. It rejects
//! degenerate input outright, asks an OpenAI-compatible chat-completions
//! service for a verdict when one is configured, and falls back to a
//! deterministic keyword scorer whenever the service is missing, slow, or
//! answers in a shape the strict reply parser cannot read.
//!
//! ## Key components
//!
//! - [`GuardianEvaluator`]: the evaluator the gate uses
//! - [`DegenerateDetector`]: gibberish, repetition, length checks
//! - [`HeuristicScorer`]: regex signals with weights, clamped per strategy
//! - [`ReplyParser`]: typed parsing of `[TIME]` / `[DAMAGE]` tags
//! - [`TextGenerator`] / [`ChatCompletionsClient`]: the external service seam

pub mod client;
pub mod config;
pub mod degenerate;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod heuristic;
pub mod prompt;
pub mod reply;

pub use client::{ChatCompletionsClient, ChatMessage, TextGenerator};
pub use config::{EvaluatorConfig, HeuristicConfig, ModelConfig};
pub use degenerate::DegenerateDetector;
pub use error::{EvaluatorError, GeneratorError, ModelError, ReplyError};
pub use evaluator::GuardianEvaluator;
pub use heuristic::{HeuristicScore, HeuristicScorer, Signal};
pub use reply::{ParsedReply, ReplyParser, ScoreTag};
