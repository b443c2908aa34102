// config.rs - AppConfig: everything read from config.toml.
//
// Default location: <config dir>/impulse-guard/config.toml
//   (~/.config on Linux, ~/Library/Application Support on macOS).
// Every section is optional; a missing file means all defaults.
//
//   [gate]
//   mode = "health"
//   allow_negative = true
//
//   [evaluator.model]
//   api_key_env = "CEREBRAS_API_KEY"
//
//   [stats]
//   data_dir = "/home/me/.local/share/impulse-guard"
//
//   [trigger]
//   ignore_domains = ["*.mybank.example"]

use std::path::{Path, PathBuf};

use anyhow::Context;
use ig_evaluator::EvaluatorConfig;
use ig_gate::GateConfig;
use ig_host::TriggerConfig;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "impulse-guard";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub stats: StatsSettings,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// `[stats]`: where history and the dashboard snapshot live.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsSettings {
    /// Defaults to <data dir>/impulse-guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// `<config dir>/impulse-guard/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Parse and validate a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config at {}", path.display()))?;
        config
            .gate
            .validate()
            .with_context(|| format!("invalid [gate] section in {}", path.display()))?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), else the default path if
    /// it exists, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Directory for `history.jsonl` and `stats.json`.
    pub fn data_dir(&self) -> PathBuf {
        self.stats
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".impulse-guard"))
    }

    /// Copy safe to print: inline secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.evaluator.model.api_key.is_some() {
            config.evaluator.model.api_key = Some("********".to_string());
        }
        config
    }
}
