// prompt.rs - Conversation sent to the text-generation service.
//
// Layout:
//   system     style rules and the required reply format
//   user       rubric with product context and score bounds
//   ...        recent conversation (argument / feedback pairs)
//   user       the new argument, with a format reminder

use ig_gate::{BudgetMode, EvaluationRequest};

use crate::client::ChatMessage;

/// Build the message list for one argument.
///
/// `history_window` caps how many prior conversation messages are included
/// (each argument contributes two: what the shopper said, what we replied).
pub fn build_messages(request: &EvaluationRequest<'_>, history_window: usize) -> Vec<ChatMessage> {
    let mode = request.strategy.mode;
    let tag = mode.score_tag();

    let mut messages = vec![
        ChatMessage::system(format!(
            "You help people think critically about purchases. Always answer as \
             [FEEDBACK]: <one or two short sentences> [{tag}]: <number>. \
             Only practical reasons earn points: broken, saved for, researched, required. \
             Feelings, social pressure, and wanting earn 0."
        )),
        ChatMessage::user(rubric(request)),
    ];

    let conversation: Vec<ChatMessage> = request
        .history
        .iter()
        .flat_map(|record| {
            [
                ChatMessage::user(record.text.clone()),
                ChatMessage::assistant(record.feedback.clone()),
            ]
        })
        .collect();
    let skip = conversation.len().saturating_sub(history_window);
    messages.extend(conversation.into_iter().skip(skip));

    messages.push(ChatMessage::user(format!(
        "They said: \"{}\"\n\nRespond in format:\n[FEEDBACK]: <your response>\n[{}]: <number>\n\n\
         Acknowledge what is valid, quote their words, ask one follow-up.",
        request.text, tag
    )));
    messages
}

fn rubric(request: &EvaluationRequest<'_>) -> String {
    let strategy = request.strategy;
    let context = request.context;
    let max = strategy.max_score;

    let product = if context.has_known_product() {
        format!("\nPRODUCT: {} ({})", context.product_name.trim(), context.price.trim())
    } else {
        String::new()
    };

    let negatives = match (strategy.allows_negative(), strategy.mode) {
        (false, _) => String::new(),
        (true, BudgetMode::Countdown) => format!(
            "\n- Weak or emotional arguments ADD time back: +1 to +{}",
            strategy.min_score.unsigned_abs()
        ),
        (true, BudgetMode::Health) => format!(
            "\nWEAK OR EMOTIONAL ARGUMENTS may score down to {}.",
            strategy.min_score
        ),
    };

    match strategy.mode {
        BudgetMode::Countdown => format!(
            "You are guarding a purchase with a countdown of {initial} seconds; \
             {remaining} seconds remain.{product}\n\n\
             STRICT RULES FOR TIME (seconds taken off the countdown):\n\
             - Broken or damaged item that needs replacing, money saved for it, \
             research done, required for work or school: -30 to -{max}\n\
             - Vague but practical: -9 to -15\n\
             - Feelings, social reasons, \"because\" without a reason: 0{negatives}\n\n\
             Keep it short. Quote their words.\n\n\
             EXAMPLE:\n[FEEDBACK]: 'Laptop broke' - that's a real need. Have you checked refurbished prices?\n[TIME]: -45",
            initial = request.initial,
            remaining = request.remaining,
            product = product,
            max = max,
            negatives = negatives,
        ),
        BudgetMode::Health => format!(
            "You are a guardian with {remaining} of {initial} HP protecting the shopper's wallet.{product}\n\n\
             DAMAGE RULES (HP you lose):\n\
             - Strong practical reason (broken, saved, researched, required): 18 to {max}\n\
             - Some merit: 5 to 15\n\
             - Emotional, vague, or impulsive: 0{negatives}\n\n\
             Keep it short and playful. End with [DAMAGE: X].\n\n\
             EXAMPLE:\n[FEEDBACK]: My phone is cracked and I saved for months? Fine, that one hurt.\n[DAMAGE: 24]",
            initial = request.initial,
            remaining = request.remaining,
            product = product,
            max = max,
            negatives = negatives,
        ),
    }
}
