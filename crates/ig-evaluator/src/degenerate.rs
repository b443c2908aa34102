// degenerate.rs - Catch arguments that should not be judged on merit.
//
// Keyboard mashing, copy-pasting an earlier argument, walls of text, and
// one-word answers all score zero before any scorer sees them. The checks
// run in a fixed order and the first hit wins.

use std::collections::HashSet;

use ig_gate::{ArgumentRecord, DegenerateKind};
use regex::Regex;

use crate::config::HeuristicConfig;
use crate::error::EvaluatorError;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

/// Detects degenerate submissions.
#[derive(Debug, Clone)]
pub struct DegenerateDetector {
    keyboard_walk: Regex,
    similarity_threshold: f64,
    max_words: usize,
    min_words: usize,
}

impl DegenerateDetector {
    pub fn new(config: &HeuristicConfig) -> Result<Self, EvaluatorError> {
        Ok(Self {
            keyboard_walk: Regex::new(r"(?i)asdf|qwer|zxcv|hjkl")?,
            similarity_threshold: config.similarity_threshold,
            max_words: config.max_words,
            min_words: config.min_words,
        })
    }

    /// Run every check against `text` and the session's prior arguments.
    pub fn check(&self, text: &str, history: &[ArgumentRecord]) -> Option<DegenerateKind> {
        if self.is_gibberish(text) {
            return Some(DegenerateKind::Gibberish);
        }
        if is_exact_repeat(text, history) || self.is_near_duplicate(text, history) {
            return Some(DegenerateKind::Repetition);
        }
        let words = text.split_whitespace().count();
        if words > self.max_words {
            return Some(DegenerateKind::TooLong);
        }
        if words < self.min_words {
            return Some(DegenerateKind::TooShort);
        }
        None
    }

    /// Keyboard mashing and vowel-less noise.
    pub fn is_gibberish(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if has_repeated_run(text) || self.keyboard_walk.is_match(text) {
            return true;
        }

        let lower = text.to_lowercase();
        if !lower.contains(VOWELS) {
            return true;
        }

        // More than half of the words longer than two characters lack vowels.
        let words: Vec<&str> = lower.split_whitespace().collect();
        let vowelless = words
            .iter()
            .filter(|w| w.chars().count() > 2 && !w.contains(VOWELS))
            .count();
        vowelless * 2 > words.len()
    }

    /// Word-set Jaccard similarity above the threshold with any prior argument.
    pub fn is_near_duplicate(&self, text: &str, history: &[ArgumentRecord]) -> bool {
        let current = word_set(text);
        if current.is_empty() {
            return false;
        }
        history
            .iter()
            .any(|prior| jaccard(&current, &word_set(&prior.text)) > self.similarity_threshold)
    }
}

/// Case-insensitive exact match with any prior argument.
pub fn is_exact_repeat(text: &str, history: &[ArgumentRecord]) -> bool {
    let text = text.trim().to_lowercase();
    history
        .iter()
        .any(|prior| prior.text.trim().to_lowercase() == text)
}

/// Lowercased words with surrounding punctuation stripped.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// |A ∩ B| / |A ∪ B|; 0.0 when both are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// A letter repeated three times in a row, or any other visible character
/// repeated four times.
fn has_repeated_run(text: &str) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars().flat_map(char::to_lowercase) {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if c.is_whitespace() {
            continue;
        }
        let limit = if c.is_ascii_alphabetic() { 3 } else { 4 };
        if run >= limit {
            return true;
        }
    }
    false
}
