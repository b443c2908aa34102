// config.rs - Evaluator configuration (the `[evaluator]` table of config.toml).
//
//   [evaluator.model]
//   enabled = true
//   endpoint = "https://api.cerebras.ai/v1/chat/completions"
//   model = "llama3.1-8b"
//   api_key_env = "CEREBRAS_API_KEY"
//   timeout_ms = 8000
//
//   [evaluator.heuristics]
//   similarity_threshold = 0.7
//   max_words = 300

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level evaluator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub heuristics: HeuristicConfig,
}

/// The external text-generation service (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Use the service when a key is available (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Hard bound on one evaluation call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How many prior conversation messages to include in the prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://api.cerebras.ai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama3.1-8b".to_string()
}

fn default_api_key_env() -> String {
    "CEREBRAS_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_temperature() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    80
}

fn default_history_window() -> usize {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_window: default_history_window(),
        }
    }
}

impl ModelConfig {
    /// The API key: inline value first, then the environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tuning for the local checks and scorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeuristicConfig {
    /// Word-set Jaccard similarity above which an argument is a repeat.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Arguments longer than this many words are rejected.
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    /// Arguments shorter than this many words are rejected.
    #[serde(default = "default_min_words")]
    pub min_words: usize,
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_max_words() -> usize {
    300
}

fn default_min_words() -> usize {
    2
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_words: default_max_words(),
            min_words: default_min_words(),
        }
    }
}
