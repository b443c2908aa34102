// heuristic.rs - Deterministic keyword scorer.
//
// Used whenever the text-generation service is unavailable, slow, or
// unparseable. Practical reasons (something broke, money was set aside,
// options were compared) earn points; wanting, hurrying, and hedging lose
// them. The raw total is then clamped into the session's scoring range.

use ig_gate::{PurchaseContext, ScoringStrategy};
use regex::Regex;
use serde::Serialize;

use crate::error::EvaluatorError;

/// A recognised pattern in an argument.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Necessity,
    Budget,
    SpecificUse,
    Research,
    LongTerm,
    Vague,
    Emotional,
    Impulsive,
    Irrelevant,
    Restating,
}

impl Signal {
    /// Points this signal contributes to the raw score.
    pub fn weight(self) -> i32 {
        match self {
            Signal::Necessity => 20,
            Signal::Budget => 15,
            Signal::SpecificUse => 10,
            Signal::Research => 15,
            Signal::LongTerm => 10,
            Signal::Vague => -10,
            Signal::Emotional => -15,
            Signal::Impulsive => -20,
            Signal::Irrelevant => -25,
            Signal::Restating => -15,
        }
    }

    pub fn is_positive(self) -> bool {
        self.weight() > 0
    }
}

/// Bonus for tying a practical reason to the actual product.
const PRODUCT_MENTION_BONUS: i32 = 5;

/// Penalty for a practical reason that ignores a known product.
const GENERIC_ARGUMENT_PENALTY: i32 = 5;

/// Raw total forced when "honestly" is the whole argument.
const HONESTY_ONLY_SCORE: i32 = -20;

/// Specific-use phrasing only counts in arguments longer than this.
const SPECIFIC_USE_MIN_CHARS: usize = 30;

/// The scorer's breakdown for one argument.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeuristicScore {
    /// Sum of signal weights and adjustments, before clamping.
    pub points: i32,
    /// Points clamped into the strategy range (with the effort floor applied).
    pub score: i32,
    /// Matched signals, strongest positive first.
    pub signals: Vec<Signal>,
    pub mentions_product: bool,
}

impl HeuristicScore {
    /// The positive signal with the largest weight, if any.
    pub fn lead_signal(&self) -> Option<Signal> {
        self.signals.iter().copied().find(|s| s.is_positive())
    }

    /// The negative signal with the largest penalty, if any.
    pub fn worst_signal(&self) -> Option<Signal> {
        self.signals
            .iter()
            .copied()
            .filter(|s| !s.is_positive())
            .min_by_key(|s| s.weight())
    }
}

/// Compiled signal patterns.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    patterns: Vec<(Signal, Regex)>,
    honesty: Regex,
}

impl HeuristicScorer {
    pub fn new() -> Result<Self, EvaluatorError> {
        let table: &[(Signal, &str)] = &[
            (
                Signal::Necessity,
                r"(?i)\b(replac|broke|essential|emergenc|medical|safety|work.?requirement|required)",
            ),
            (
                Signal::Budget,
                r"(?i)\b(sav(ed|ing).?(up.?)?for|budgeted|allocated|can.?afford|within.?(my.?)?budget|price.?compared)",
            ),
            (
                Signal::SpecificUse,
                r"(?i)\b(will.?use.?(it.?)?for|need.?it.?(to|for)|helps?.?me|solves|fixes|improves)",
            ),
            (
                Signal::Research,
                r"(?i)\b(researched|compared|reviews|cheapest|best.?value|alternatives)",
            ),
            (
                Signal::LongTerm,
                r"(?i)\b(years|investment|durable|warranty|reliable|last(s|ing)?\b)",
            ),
            (
                Signal::Vague,
                r"(?i)\b(just|maybe|probably|might|could|sometime|eventually)\b",
            ),
            (
                Signal::Emotional,
                r"(?i)\b(want|desire|wish|dream|love|excited|cool|awesome|amazing)",
            ),
            (
                Signal::Impulsive,
                r"(?i)\b(now|today|immediately|quick\w*|sale.?ends|limited.?time)\b",
            ),
            (
                Signal::Irrelevant,
                r"(?i)\b(honest\w*|trying|please|come.?on|whatever|fine|okay)\b",
            ),
            (
                Signal::Restating,
                r"(?i)\b(as i said|i already said|already told you|told you|mentioned)\b",
            ),
        ];

        let patterns = table
            .iter()
            .map(|(signal, pattern)| Ok((*signal, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            patterns,
            honesty: Regex::new(r"(?i)\bhonest")?,
        })
    }

    /// Score one argument.
    pub fn score(
        &self,
        text: &str,
        context: &PurchaseContext,
        strategy: &ScoringStrategy,
    ) -> HeuristicScore {
        let text = text.trim();
        let mut signals: Vec<Signal> = self
            .patterns
            .iter()
            .filter(|(signal, re)| {
                if *signal == Signal::SpecificUse && text.chars().count() <= SPECIFIC_USE_MIN_CHARS
                {
                    return false;
                }
                re.is_match(text)
            })
            .map(|(signal, _)| *signal)
            .collect();
        signals.sort_by_key(|s| std::cmp::Reverse(s.weight()));

        let has_relevant_point = signals.iter().any(|s| s.is_positive());
        let has_negative = signals.iter().any(|s| !s.is_positive());
        let known_product = context.has_known_product();
        let mentions_product = known_product && mentions_product(text, &context.product_name);

        let mut points: i32 = signals.iter().map(|s| s.weight()).sum();
        if has_relevant_point && mentions_product {
            points += PRODUCT_MENTION_BONUS;
        }
        if has_relevant_point && known_product && !mentions_product {
            points -= GENERIC_ARGUMENT_PENALTY;
        }
        if !has_relevant_point && self.honesty.is_match(text) {
            points = HONESTY_ONLY_SCORE;
        }

        let score = if points == 0 && !has_negative && text.split_whitespace().count() >= 3 {
            strategy.clamp(i64::from(strategy.effort_floor))
        } else {
            strategy.clamp(i64::from(points))
        };

        tracing::debug!(points, score, ?signals, mentions_product, "heuristic score");

        HeuristicScore {
            points,
            score,
            signals,
            mentions_product,
        }
    }
}

/// Whether the argument names the product, in full or by any word longer
/// than three characters.
fn mentions_product(text: &str, product_name: &str) -> bool {
    let text = text.to_lowercase();
    let name = product_name.trim().to_lowercase();
    if name.is_empty() {
        return false;
    }
    text.contains(&name)
        || name
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .any(|w| text.contains(w))
}
