// config.rs - Gate configuration (the `[gate]` table of config.toml).

use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::strategy::{BudgetMode, ScoringStrategy};

/// Configuration for one gate session.
///
/// Every field has a default, so an empty `[gate]` table (or none at all)
/// yields a 120-second countdown that passes at 60 seconds of persuasion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Countdown or health.
    #[serde(default)]
    pub mode: BudgetMode,

    /// Starting budget. Defaults per mode (120 s / 100 HP).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_budget: Option<u32>,

    /// Persuasion needed to pass. Defaults per mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_threshold: Option<u32>,

    /// Per-argument score ceiling. Defaults per mode (90 s / 35 HP).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i32>,

    /// Let weak arguments give budget back (default: false).
    #[serde(default)]
    pub allow_negative: bool,

    /// Negative floor when `allow_negative` is set. Defaults to a third of
    /// the ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i32>,

    /// Award for a clean attempt with no recognised signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_floor: Option<i32>,

    /// Minimum characters after trimming.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Minimum whitespace-separated words.
    #[serde(default = "default_min_words")]
    pub min_words: usize,
}

fn default_min_chars() -> usize {
    3
}

fn default_min_words() -> usize {
    1
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mode: BudgetMode::default(),
            initial_budget: None,
            pass_threshold: None,
            max_score: None,
            allow_negative: false,
            min_score: None,
            effort_floor: None,
            min_chars: default_min_chars(),
            min_words: default_min_words(),
        }
    }
}

impl GateConfig {
    /// Default configuration for a mode.
    pub fn for_mode(mode: BudgetMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn initial_budget(&self) -> u32 {
        self.initial_budget
            .unwrap_or_else(|| self.mode.default_initial_budget())
    }

    pub fn pass_threshold(&self) -> u32 {
        self.pass_threshold
            .unwrap_or_else(|| self.mode.default_pass_threshold(self.initial_budget()))
    }

    /// Build the scoring strategy this configuration describes.
    pub fn strategy(&self) -> ScoringStrategy {
        let mut strategy = ScoringStrategy::for_mode(self.mode);
        if let Some(max) = self.max_score {
            strategy = strategy.with_max_score(max);
        }
        if self.allow_negative {
            let floor = self.min_score.unwrap_or(-(strategy.max_score / 3));
            strategy = strategy.with_min_score(floor);
        }
        if let Some(floor) = self.effort_floor {
            strategy = strategy.with_effort_floor(floor);
        }
        strategy
    }

    /// Check the configuration for values that would make the gate unwinnable
    /// or meaningless.
    pub fn validate(&self) -> Result<(), GateError> {
        let initial = self.initial_budget();
        if initial == 0 {
            return Err(GateError::InvalidConfig(
                "initial_budget must be greater than zero".to_string(),
            ));
        }
        let threshold = self.pass_threshold();
        if threshold == 0 || threshold > initial {
            return Err(GateError::InvalidConfig(format!(
                "pass_threshold must be in 1..={} (got {})",
                initial, threshold
            )));
        }
        if self.strategy().max_score == 0 {
            return Err(GateError::InvalidConfig(
                "max_score must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_gives_countdown_defaults() {
        let config: GateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.mode, BudgetMode::Countdown);
        assert_eq!(config.initial_budget(), 120);
        assert_eq!(config.pass_threshold(), 60);
        assert_eq!(config.strategy(), ScoringStrategy::countdown());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn health_mode_defaults() {
        let config = GateConfig::for_mode(BudgetMode::Health);
        assert_eq!(config.initial_budget(), 100);
        assert_eq!(config.pass_threshold(), 100);
        assert_eq!(config.strategy().max_score, 35);
    }

    #[test]
    fn allow_negative_derives_floor_from_ceiling() {
        let config = GateConfig {
            allow_negative: true,
            ..GateConfig::default()
        };
        assert_eq!(config.strategy().min_score, -30);

        let config = GateConfig {
            allow_negative: true,
            min_score: Some(-5),
            ..GateConfig::default()
        };
        assert_eq!(config.strategy().min_score, -5);
    }

    #[test]
    fn threshold_above_budget_is_rejected() {
        let config = GateConfig {
            initial_budget: Some(30),
            pass_threshold: Some(31),
            ..GateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let config = GateConfig {
            initial_budget: Some(0),
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
