// outcome.rs - OutcomeResolver and the persisted AttemptOutcome.
//
// Resolution is a pure function of a terminal session: every field,
// timestamps included, comes from the session itself, so resolving the same
// session twice yields byte-identical JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GateError;
use crate::session::{GateSession, GateState, Resolution};
use crate::strategy::BudgetMode;

/// Whether the purchase went ahead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "allowed"),
            Verdict::Blocked => write!(f, "blocked"),
        }
    }
}

/// Letter grade for the quality of the shopper's case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Band a percentage (0–100): A ≥ 80, B ≥ 60, C ≥ 40, D ≥ 20, else F.
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            80.. => Grade::A,
            60..=79 => Grade::B,
            40..=59 => Grade::C,
            20..=39 => Grade::D,
            _ => Grade::F,
        }
    }

    /// Grade for `persuasion` earned against an `initial` budget.
    pub fn for_persuasion(persuasion: u32, initial: u32) -> Self {
        if initial == 0 {
            return Grade::F;
        }
        let earned = u64::from(persuasion.min(initial));
        let percent = earned * 100 / u64::from(initial);
        // percent ≤ 100, fits in u32.
        Self::from_percent(percent as u32)
    }

    fn headline(self) -> &'static str {
        match self {
            Grade::A => "Excellent reasoning.",
            Grade::B => "Solid reasoning.",
            Grade::C => "Some fair points.",
            Grade::D => "A weak case.",
            Grade::F => "No real case was made.",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", letter)
    }
}

/// The persisted record of one finalized gate session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptOutcome {
    pub session_id: Uuid,
    pub domain: String,
    pub product_name: String,
    pub category: String,
    /// Parsed price; `None` when the page gave nothing usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub verdict: Verdict,
    pub grade: Grade,
    pub resolution: Resolution,
    pub mode: BudgetMode,
    pub persuasion: u32,
    pub initial_budget: u32,
    pub pass_threshold: u32,
    pub arguments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the session resolved.
    pub timestamp: DateTime<Utc>,
    /// Human-readable final assessment.
    pub summary: String,
}

impl AttemptOutcome {
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allowed
    }

    /// Amount treated as money kept when blocked, spent when allowed.
    pub fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// Turns terminal sessions into outcomes.
pub struct OutcomeResolver;

impl OutcomeResolver {
    /// Resolve a terminal session into its outcome.
    ///
    /// Errors with `NotResolved` for sessions still idle or active.
    pub fn resolve(session: &GateSession) -> Result<AttemptOutcome, GateError> {
        let verdict = match session.state() {
            GateState::Passed => Verdict::Allowed,
            GateState::Failed => Verdict::Blocked,
            GateState::Idle | GateState::Active => {
                return Err(GateError::NotResolved(session.session_id()))
            }
        };
        let (resolution, timestamp) = match (session.resolution(), session.resolved_at()) {
            (Some(resolution), Some(at)) => (resolution, at),
            _ => return Err(GateError::NotResolved(session.session_id())),
        };

        let budget = session.budget();
        let mode = session.strategy().mode;
        let grade = Grade::for_persuasion(session.persuasion(), budget.initial);
        let context = session.context();

        Ok(AttemptOutcome {
            session_id: session.session_id(),
            domain: context.domain.clone(),
            product_name: context.product_name.clone(),
            category: context.effective_category(),
            amount: context.amount(),
            verdict,
            grade,
            resolution,
            mode,
            persuasion: session.persuasion(),
            initial_budget: budget.initial,
            pass_threshold: session.pass_threshold(),
            arguments: session.arguments().len(),
            started_at: session.started_at(),
            timestamp,
            summary: summarize(
                grade,
                resolution,
                context.product_label(),
                session.persuasion(),
                session.pass_threshold(),
                mode,
            ),
        })
    }
}

fn summarize(
    grade: Grade,
    resolution: Resolution,
    product: &str,
    persuasion: u32,
    threshold: u32,
    mode: BudgetMode,
) -> String {
    let unit = mode.unit();
    let detail = match resolution {
        Resolution::Persuaded => format!(
            "The guardian lets {} through after {} of {} {} of persuasion.",
            product, persuasion, threshold, unit
        ),
        Resolution::BudgetExhausted => format!(
            "The budget ran out at {} of {} {}; {} stays in the cart.",
            persuasion, threshold, unit, product
        ),
        Resolution::Abandoned => format!(
            "You walked away from {} at {} of {} {}. Money kept.",
            product, persuasion, threshold, unit
        ),
    };
    format!("{} {}", grade.headline(), detail)
}
