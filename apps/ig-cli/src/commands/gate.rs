// gate.rs - Interactive gate in the terminal.
//
// Same session, evaluator, recorder and trigger as the browser host; the
// allow/block signal is printed instead of framed. Lines starting with `/`
// are commands: /status, /giveup (alias /quit). EOF on stdin gives up.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, ValueEnum};
use ig_gate::{AttemptOutcome, BudgetMode, GateError, PurchaseContext, SubmitOutcome};
use ig_host::{ChannelError, GateChannel, GateSignal, HostError, PurchaseGate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::AppConfig;

/// Countdown seconds at which a reminder is printed.
const COUNTDOWN_WARNINGS: [u32; 3] = [60, 30, 10];

#[derive(Args)]
pub struct GateArgs {
    /// What you are about to buy.
    #[arg(long)]
    pub product: Option<String>,
    /// Price as shown on the page, e.g. "$59.99".
    #[arg(long)]
    pub price: Option<String>,
    /// Category (inferred from the product name when omitted).
    #[arg(long)]
    pub category: Option<String>,
    /// Checkout page URL.
    #[arg(long)]
    pub url: Option<String>,
    /// Override the configured budget mode.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Score locally without calling the text-generation service.
    #[arg(long)]
    pub no_model: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Countdown,
    Health,
}

impl From<ModeArg> for BudgetMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Countdown => BudgetMode::Countdown,
            ModeArg::Health => BudgetMode::Health,
        }
    }
}

/// Prints gate signals to a writer.
pub struct TerminalChannel {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl TerminalChannel {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl GateChannel for TerminalChannel {
    fn send(&self, signal: &GateSignal) -> Result<(), ChannelError> {
        let line = match signal {
            GateSignal::Allow { domain } => format!("Checkout unlocked for {}.", domain),
            GateSignal::Block { domain, .. } => format!("Checkout stays blocked on {}.", domain),
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| ChannelError::Other(e.to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn channel_id(&self) -> &str {
        "terminal"
    }
}

pub fn execute(args: &GateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let evaluator = super::build_evaluator(&config.evaluator, args.no_model)?;
        let recorder = super::open_recorder(config);
        let trigger = super::build_trigger(config)?;
        let mut gate = PurchaseGate::new(
            config.gate.clone(),
            evaluator,
            recorder,
            Arc::new(TerminalChannel::stdout()),
            trigger,
        )?;

        gate.start(context_from(args), args.mode.map(BudgetMode::from))?;
        print_opening(&gate);

        let outcome = run_session(&mut gate).await?;
        print_outcome(&outcome);
        Ok::<(), anyhow::Error>(())
    })
}

fn context_from(args: &GateArgs) -> PurchaseContext {
    let mut context = PurchaseContext::new(
        args.product.clone().unwrap_or_default(),
        args.price.clone().unwrap_or_default(),
    );
    if let Some(category) = &args.category {
        context = context.with_category(category.clone());
    }
    if let Some(url) = &args.url {
        context = context.with_source(url.clone(), "");
    }
    context
}

/// Drive the session until something resolves it.
async fn run_session(gate: &mut PurchaseGate) -> anyhow::Result<AttemptOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut last_tick = Instant::now();

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    return give_up(gate);
                };
                let line = line.trim();
                match line {
                    "" => {}
                    "/giveup" | "/quit" => return give_up(gate),
                    "/status" => print_status(gate),
                    _ if line.starts_with('/') => {
                        println!("Commands: /status, /giveup");
                    }
                    _ => {
                        if let Some(outcome) =
                            argue(gate, line, &mut ticker, &mut last_tick).await?
                        {
                            return Ok(outcome);
                        }
                    }
                }
                prompt();
            }
            _ = ticker.tick() => {
                if let Some(outcome) = advance(gate, &mut last_tick) {
                    println!();
                    println!("Time's up.");
                    return Ok(outcome);
                }
            }
        }
    }
}

/// Score one argument while the clock keeps running.
async fn argue(
    gate: &mut PurchaseGate,
    text: &str,
    ticker: &mut tokio::time::Interval,
    last_tick: &mut Instant,
) -> anyhow::Result<Option<AttemptOutcome>> {
    let pending = match gate.prepare_submission(text) {
        Ok(pending) => pending,
        Err(HostError::Gate(GateError::InvalidInput(message))) => {
            println!("{}", message);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let evaluation = pending.run(gate.evaluator());
    tokio::pin!(evaluation);
    let (submission, result) = loop {
        tokio::select! {
            done = &mut evaluation => break done,
            _ = ticker.tick() => {
                if let Some(outcome) = advance(gate, last_tick) {
                    println!("Time ran out before the guardian answered.");
                    return Ok(Some(outcome));
                }
            }
        }
    };

    let applied = gate.complete_submission(&submission, result)?;
    print_argument(gate, &applied);
    if applied.resolution.is_some() {
        return Ok(Some(gate.finalize()?));
    }
    Ok(None)
}

fn advance(gate: &mut PurchaseGate, last_tick: &mut Instant) -> Option<AttemptOutcome> {
    let before = gate.session().map(|s| s.budget().remaining);
    let now = Instant::now();
    let elapsed = now.duration_since(*last_tick);
    *last_tick = now;

    let outcome = gate.tick(elapsed);
    if outcome.is_none() {
        if let (Some(before), Some(session)) = (before, gate.session()) {
            let after = session.budget().remaining;
            if session.strategy().mode.is_timed()
                && COUNTDOWN_WARNINGS
                    .iter()
                    .any(|&mark| before > mark && after <= mark)
            {
                println!();
                println!("[{} seconds left]", after);
                prompt();
            }
        }
    }
    outcome
}

fn give_up(gate: &mut PurchaseGate) -> anyhow::Result<AttemptOutcome> {
    match gate.dismiss() {
        Some(outcome) => Ok(outcome),
        None => Ok(gate.finalize()?),
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_opening(gate: &PurchaseGate) {
    let Some(session) = gate.session() else {
        return;
    };
    let context = session.context();
    let budget = session.budget();
    let mode = session.strategy().mode;

    println!("{}", "=".repeat(60));
    if context.has_known_product() {
        println!("  {}", context.product_label());
        if !context.price.trim().is_empty() {
            println!("  {}", context.price.trim());
        }
    } else {
        println!("  Your purchase");
    }
    println!("{}", "-".repeat(60));
    println!("  The Impulse Guardian blocks your path.");
    println!("  Convince me this purchase is necessary to proceed.");
    match mode {
        BudgetMode::Countdown => println!(
            "  You have {} seconds. Good arguments take time off the clock; win back {} to pass.",
            budget.initial,
            session.pass_threshold()
        ),
        BudgetMode::Health => println!(
            "  The guardian has {} HP. Deal {} damage to pass.",
            budget.initial,
            session.pass_threshold()
        ),
    }
    println!("{}", "=".repeat(60));
}

fn print_argument(gate: &PurchaseGate, applied: &SubmitOutcome) {
    let record = &applied.record;
    println!();
    println!("Guardian: {}", record.feedback);
    let unit = gate
        .session()
        .map(|s| s.strategy().mode.unit())
        .unwrap_or("");
    println!(
        "[{:+} {}] {} {} left, persuasion {}/{}",
        -record.score,
        unit,
        applied.budget.remaining,
        unit,
        applied.persuasion,
        gate.session().map(|s| s.pass_threshold()).unwrap_or(0),
    );
}

fn print_status(gate: &PurchaseGate) {
    match gate.session() {
        Some(session) => {
            let budget = session.budget();
            let unit = session.strategy().mode.unit();
            println!(
                "{}: {} of {} {} left, persuasion {}/{}, {} argument(s)",
                session.state(),
                budget.remaining,
                budget.initial,
                unit,
                session.persuasion(),
                session.pass_threshold(),
                session.arguments().len(),
            );
        }
        None => println!("No gate session."),
    }
}

fn print_outcome(outcome: &AttemptOutcome) {
    println!();
    println!("{}", "=".repeat(60));
    println!(
        "  {}  (grade {}, {})",
        outcome.verdict.to_string().to_uppercase(),
        outcome.grade,
        outcome.resolution
    );
    println!("  {}", outcome.summary);
    println!("{}", "=".repeat(60));
}
