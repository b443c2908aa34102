// reply.rs - Strict parser for the score tag in model replies.
//
// The model is asked to answer "[FEEDBACK]: ... [TIME]: -45" (or
// "[DAMAGE: 12]"), but it is free text and models drift. The parser accepts
// the documented spellings and nothing else; anything it cannot read with
// certainty is an error, and the evaluator falls back to the heuristic.

use ig_gate::{BudgetMode, ScoringStrategy};
use regex::Regex;

use crate::error::{EvaluatorError, ReplyError};

/// Which tag carried the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTag {
    Time,
    Damage,
    Points,
}

impl ScoreTag {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "TIME" => Some(ScoreTag::Time),
            "DAMAGE" => Some(ScoreTag::Damage),
            "POINTS" => Some(ScoreTag::Points),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ScoreTag::Time => "TIME",
            ScoreTag::Damage => "DAMAGE",
            ScoreTag::Points => "POINTS",
        }
    }
}

/// A successfully parsed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub feedback: String,
    pub tag: ScoreTag,
    /// The number exactly as tagged (sign preserved, decimals rounded).
    pub value: i64,
}

impl ParsedReply {
    /// Convert the tagged value into a score for `strategy`.
    ///
    /// Countdown replies carry seconds off the clock, conventionally
    /// negative (`[TIME]: -45`). When the strategy allows negative scores
    /// the sign is the direction: `-N` takes N seconds off (score N) and
    /// `+N` puts N seconds back (score -N). Otherwise only the magnitude
    /// counts. Health replies
    /// carry damage, which must be non-negative unless the strategy allows
    /// negative scores. `POINTS` is accepted in either mode and read as a
    /// signed score.
    pub fn score_for(&self, strategy: &ScoringStrategy) -> Result<i64, ReplyError> {
        let expected = strategy.mode.score_tag();
        match (strategy.mode, self.tag) {
            (BudgetMode::Countdown, ScoreTag::Time) if strategy.allows_negative() => {
                Ok(self.value.checked_neg().unwrap_or(i64::MAX))
            }
            (BudgetMode::Countdown, ScoreTag::Time) => Ok(self.value.checked_abs().unwrap_or(i64::MAX)),
            (BudgetMode::Health, ScoreTag::Damage) | (_, ScoreTag::Points) => {
                if self.value < 0 && !strategy.allows_negative() {
                    Err(ReplyError::OutOfRange(self.value))
                } else {
                    Ok(self.value)
                }
            }
            (_, found) => Err(ReplyError::UnexpectedTag {
                expected,
                found: found.name(),
            }),
        }
    }
}

/// Compiled reply patterns.
#[derive(Debug, Clone)]
pub struct ReplyParser {
    score: Regex,
    feedback: Regex,
}

impl ReplyParser {
    pub fn new() -> Result<Self, EvaluatorError> {
        Ok(Self {
            // [TIME]: -45   [TIME: -45]   [DAMAGE: 12s]   [POINTS]: +8
            score: Regex::new(
                r"(?i)\[\s*(TIME|DAMAGE|POINTS)\s*(?:\]\s*:|:)\s*([+-]?\s*[0-9]+(?:\.[0-9]+)?)\s*(?:(?:seconds|secs|sec|s|hp)\b)?\s*\]?",
            )?,
            feedback: Regex::new(r"(?i)\[\s*FEEDBACK\s*\]\s*:?")?,
        })
    }

    /// Parse a raw model reply.
    pub fn parse(&self, content: &str) -> Result<ParsedReply, ReplyError> {
        let mut found: Option<(ScoreTag, i64)> = None;
        let mut first_tag_start = content.len();

        for caps in self.score.captures_iter(content) {
            let (Some(whole), Some(name), Some(number)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Some(tag) = ScoreTag::from_name(name.as_str()) else {
                continue;
            };
            let value = parse_number(number.as_str())?;
            first_tag_start = first_tag_start.min(whole.start());

            match found {
                None => found = Some((tag, value)),
                Some(prev) if prev == (tag, value) => {}
                Some(_) => return Err(ReplyError::ConflictingScores),
            }
        }

        let (tag, value) = found.ok_or(ReplyError::MissingScore)?;

        let feedback = match self.feedback.find(content) {
            Some(marker) => {
                let end = if first_tag_start > marker.end() {
                    first_tag_start
                } else {
                    content.len()
                };
                self.score.replace_all(&content[marker.end()..end], "").into_owned()
            }
            None => self.score.replace_all(content, "").into_owned(),
        };
        let feedback = clean_feedback(&feedback);
        if feedback.is_empty() {
            return Err(ReplyError::EmptyFeedback);
        }

        Ok(ParsedReply {
            feedback,
            tag,
            value,
        })
    }
}

fn parse_number(raw: &str) -> Result<i64, ReplyError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let value: f64 = compact
        .parse()
        .map_err(|_| ReplyError::InvalidNumber(raw.to_string()))?;
    if !value.is_finite() || value.abs() > 1e9 {
        return Err(ReplyError::InvalidNumber(raw.to_string()));
    }
    Ok(value.round() as i64)
}

/// Trim whitespace, a leading bullet, and one pair of wrapping quotes.
fn clean_feedback(raw: &str) -> String {
    let mut text = raw.trim().trim_start_matches('•').trim();
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = text[1..text.len() - 1].trim();
        }
    }
    text.to_string()
}
