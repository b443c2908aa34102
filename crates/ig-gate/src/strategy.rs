// strategy.rs - Budget modes and the scoring strategy.
//
// The gate supports two flavours of the same game:
//   Countdown: the shopper waits out a timer; good arguments shave seconds.
//   Health:    the guardian has an HP pool; good arguments deal damage.
// Both are the same arithmetic over a budget, so the mode only changes
// defaults, units, and the reply tag the text-generation service uses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which budget the gate consumes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Countdown timer in seconds.
    #[default]
    Countdown,
    /// Guardian health pool in HP.
    Health,
}

impl fmt::Display for BudgetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetMode::Countdown => write!(f, "countdown"),
            BudgetMode::Health => write!(f, "health"),
        }
    }
}

impl BudgetMode {
    /// Default starting budget: 120 seconds or 100 HP.
    pub fn default_initial_budget(self) -> u32 {
        match self {
            BudgetMode::Countdown => 120,
            BudgetMode::Health => 100,
        }
    }

    /// Default persuasion needed to pass.
    ///
    /// Countdown: half the timer. Health: the whole pool (guardian at 0 HP).
    pub fn default_pass_threshold(self, initial_budget: u32) -> u32 {
        match self {
            BudgetMode::Countdown => (initial_budget / 2).max(1),
            BudgetMode::Health => initial_budget.max(1),
        }
    }

    /// Unit label for human-facing text.
    pub fn unit(self) -> &'static str {
        match self {
            BudgetMode::Countdown => "seconds",
            BudgetMode::Health => "HP",
        }
    }

    /// The reply tag the text-generation service is asked to emit.
    pub fn score_tag(self) -> &'static str {
        match self {
            BudgetMode::Countdown => "TIME",
            BudgetMode::Health => "DAMAGE",
        }
    }

    /// Whether wall-clock time consumes the budget.
    pub fn is_timed(self) -> bool {
        matches!(self, BudgetMode::Countdown)
    }
}

/// How raw argument scores are bounded before they touch the budget.
///
/// `min_score < 0` enables negative scoring: weak arguments then give time
/// back to the countdown (or heal the guardian).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoringStrategy {
    pub mode: BudgetMode,
    pub min_score: i32,
    pub max_score: i32,
    /// Minimum award for a clean, on-topic attempt that matched no signal.
    pub effort_floor: i32,
}

impl ScoringStrategy {
    /// Countdown defaults: 0–90 seconds per argument.
    pub fn countdown() -> Self {
        Self {
            mode: BudgetMode::Countdown,
            min_score: 0,
            max_score: 90,
            effort_floor: 10,
        }
    }

    /// Health defaults: 0–35 HP per argument.
    pub fn health() -> Self {
        Self {
            mode: BudgetMode::Health,
            min_score: 0,
            max_score: 35,
            effort_floor: 5,
        }
    }

    pub fn for_mode(mode: BudgetMode) -> Self {
        match mode {
            BudgetMode::Countdown => Self::countdown(),
            BudgetMode::Health => Self::health(),
        }
    }

    /// Builder-style: allow scores down to `min_score` (a negative value).
    pub fn with_min_score(mut self, min_score: i32) -> Self {
        self.min_score = min_score.min(0);
        self
    }

    /// Builder-style: cap scores at `max_score`.
    pub fn with_max_score(mut self, max_score: i32) -> Self {
        self.max_score = max_score.max(0);
        self
    }

    pub fn with_effort_floor(mut self, effort_floor: i32) -> Self {
        self.effort_floor = effort_floor.max(0);
        self
    }

    pub fn allows_negative(&self) -> bool {
        self.min_score < 0
    }

    /// Clamp a raw score into `[min_score, max_score]`.
    pub fn clamp(&self, raw: i64) -> i32 {
        let clamped = raw.clamp(i64::from(self.min_score), i64::from(self.max_score));
        // In range of i32 by construction of the bounds.
        clamped as i32
    }
}

impl Default for ScoringStrategy {
    fn default() -> Self {
        Self::countdown()
    }
}
