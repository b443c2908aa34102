// feedback.rs - Templated feedback for the heuristic path.
//
// Feedback quotes the start of the shopper's own words, reacts to the
// strongest signal the scorer found, and ends with a product-specific nudge.
// Template choice is a pure function of the text, so the same argument
// always gets the same reply.

use ig_gate::{DegenerateKind, PurchaseContext};

use crate::heuristic::{HeuristicScore, Signal};

/// Fixed feedback for arguments rejected before scoring.
pub fn degenerate_feedback(kind: DegenerateKind) -> &'static str {
    match kind {
        DegenerateKind::Gibberish => "That doesn't make sense. Write a real justification!",
        DegenerateKind::Repetition => {
            "You already said that. Repeating yourself won't work, try a new angle!"
        }
        DegenerateKind::TooLong => "Way too long. Keep it concise!",
        DegenerateKind::TooShort => "Give me at least a few words to work with.",
    }
}

/// The first five words of the argument, quoted, with an ellipsis when cut.
pub fn key_phrase(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut phrase = words
        .iter()
        .take(5)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed_len = phrase
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .len();
    phrase.truncate(trimmed_len);
    if words.len() > 5 {
        phrase.push_str("...");
    }
    format!("\"{}\"", phrase)
}

/// Compose feedback for a heuristic score.
pub fn heuristic_feedback(text: &str, score: &HeuristicScore, context: &PurchaseContext) -> String {
    let seed = stable_hash(text);
    let quote = key_phrase(text);

    let opener = match score.points {
        25.. => pick(
            seed,
            &[
                "{q}, that's a compelling case.",
                "{q}, now we're talking.",
                "{q}, that is a practical reason.",
            ],
        ),
        10..=24 => pick(
            seed,
            &["{q}, that's a fair point.", "{q}, okay, that counts for something."],
        ),
        1..=9 => pick(
            seed,
            &["{q}, that's a start.", "{q}, there's something there, but not much."],
        ),
        0 => pick(
            seed,
            &["{q}, I hear you, but that's not a reason yet.", "{q}, not convinced."],
        ),
        _ => pick(
            seed,
            &["{q}, that works against you.", "{q}, that makes me more suspicious."],
        ),
    }
    .replace("{q}", &quote);

    let remark = match (score.lead_signal(), score.worst_signal()) {
        (Some(lead), None) => positive_remark(lead),
        (Some(lead), Some(worst)) if lead.weight() >= -worst.weight() => positive_remark(lead),
        (_, Some(worst)) => negative_remark(worst),
        (None, None) => "What specific problem would it solve?",
    };

    let nudge = product_nudge(context, seed);
    format!("{} {} {}", opener, remark, nudge)
}

fn positive_remark(signal: Signal) -> &'static str {
    match signal {
        Signal::Necessity => "Replacing something broken is a real need.",
        Signal::Budget => "Planning it into your budget counts.",
        Signal::SpecificUse => "A concrete use is a real reason.",
        Signal::Research => "Comparing options shows you did the homework.",
        Signal::LongTerm => "Long-term value is a fair point.",
        _ => "That's something.",
    }
}

fn negative_remark(signal: Signal) -> &'static str {
    match signal {
        Signal::Vague => "That's vague. What exactly would it solve?",
        Signal::Emotional => "Wanting it is a feeling, not a reason.",
        Signal::Impulsive => "Urgency is how stores get you. What changes if you wait a week?",
        Signal::Irrelevant => "That doesn't say why you need it.",
        Signal::Restating => "Saying it again doesn't make it stronger.",
        _ => "That doesn't help your case.",
    }
}

fn product_nudge(context: &PurchaseContext, seed: u64) -> &'static str {
    let name = context.product_name.to_lowercase();

    if contains_any(&name, &["ipad", "tablet"]) {
        "Would a refurbished tablet do the same job?"
    } else if contains_any(&name, &["laptop", "macbook"]) {
        "Have you checked refurbished or last year's model?"
    } else if contains_any(&name, &["phone", "iphone"]) && !contains_any(&name, &["headphone"]) {
        "Does your current phone really need replacing?"
    } else if contains_any(&name, &["headphone", "airpod", "earbud"]) {
        "Could your current pair last a few more months?"
    } else if contains_any(&name, &["watch"]) {
        "Doesn't your phone already do most of this?"
    } else if contains_any(&name, &["camera"]) {
        "Is your phone camera really not enough?"
    } else {
        pick(
            seed,
            &[
                "Would you still want it in 30 days?",
                "Have you checked the second-hand market?",
                "Is there a cheaper alternative?",
            ],
        )
    }
}

fn contains_any(haystack: &str, keys: &[&str]) -> bool {
    keys.iter().any(|k| haystack.contains(k))
}

fn pick(seed: u64, options: &[&'static str]) -> &'static str {
    // `options` is never empty at call sites.
    let index = (seed % options.len().max(1) as u64) as usize;
    options.get(index).copied().unwrap_or("")
}

/// FNV-1a over the lowercased text.
fn stable_hash(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.to_lowercase().bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
