// stats.rs - Stats subcommands: show, history, report, reset.

use clap::Subcommand;

use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum StatsCommands {
    /// Running totals (the dashboard snapshot).
    Show {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Recent purchase attempts, newest first.
    History {
        /// Number of attempts to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Totals per category and per day.
    Report {
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete the history and snapshot.
    Reset {
        /// Skip the confirmation guard.
        #[arg(long)]
        yes: bool,
    },
}

pub fn execute(cmd: &StatsCommands, config: &AppConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;

    match cmd {
        StatsCommands::Show { json } => {
            let snapshot = store.snapshot()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            println!("Battles:      {}", snapshot.total_battles);
            println!(
                "Victories:    {} (purchase blocked, {:.0}% win rate)",
                snapshot.victories,
                snapshot.win_rate()
            );
            println!("Defeats:      {} (purchase allowed)", snapshot.defeats);
            println!("Money saved:  ${:.2}", snapshot.money_saved);
            println!();
            println!("{:<16} BLOCKED", "CATEGORY");
            println!("{}", "-".repeat(28));
            for (category, count) in &snapshot.category_stats {
                println!("{:<16} {}", category, count);
            }
        }

        StatsCommands::History { n } => {
            let report = store.report()?;
            if report.history.is_empty() {
                println!("No purchase attempts recorded.");
                return Ok(());
            }

            println!(
                "{:<20} {:<9} {:<6} {:>10}  {:<14} PRODUCT",
                "TIMESTAMP", "VERDICT", "GRADE", "AMOUNT", "CATEGORY"
            );
            println!("{}", "-".repeat(80));
            for outcome in report.recent(*n) {
                println!(
                    "{:<20} {:<9} {:<6} {:>10}  {:<14} {}",
                    outcome.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    outcome.verdict.to_string(),
                    outcome.grade.to_string(),
                    outcome
                        .amount
                        .map(|a| format!("${:.2}", a))
                        .unwrap_or_else(|| "-".to_string()),
                    outcome.category,
                    outcome.product_name,
                );
            }
        }

        StatsCommands::Report { json } => {
            let report = store.report()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            let totals = &report.totals;
            println!(
                "{} attempt(s): {} blocked, {} allowed ({:.0}% blocked)",
                totals.attempts,
                totals.blocked,
                totals.allowed,
                totals.block_rate()
            );
            println!(
                "Saved ${:.2}, spent ${:.2}",
                totals.amount_saved, totals.amount_spent
            );

            if !report.by_category.is_empty() {
                println!();
                println!(
                    "{:<16} {:>8} {:>8} {:>8} {:>12}",
                    "CATEGORY", "ATTEMPTS", "BLOCKED", "ALLOWED", "SAVED"
                );
                println!("{}", "-".repeat(56));
                for (category, rollup) in &report.by_category {
                    println!(
                        "{:<16} {:>8} {:>8} {:>8} {:>12}",
                        category,
                        rollup.attempts,
                        rollup.blocked,
                        rollup.allowed,
                        format!("${:.2}", rollup.amount_saved),
                    );
                }
            }

            if !report.timeline.is_empty() {
                println!();
                println!("{:<12} {:>8} {:>8} {:>12}", "DAY", "BLOCKED", "ALLOWED", "SAVED");
                println!("{}", "-".repeat(44));
                for day in &report.timeline {
                    println!(
                        "{:<12} {:>8} {:>8} {:>12}",
                        day.date.format("%Y-%m-%d"),
                        day.totals.blocked,
                        day.totals.allowed,
                        format!("${:.2}", day.totals.amount_saved),
                    );
                }
            }

            if !report.grades.is_empty() {
                let grades: Vec<String> = report
                    .grades
                    .iter()
                    .map(|(grade, count)| format!("{}: {}", grade, count))
                    .collect();
                println!();
                println!("Grades  {}", grades.join("  "));
            }
        }

        StatsCommands::Reset { yes } => {
            if !*yes {
                anyhow::bail!(
                    "this deletes all history in {}; re-run with --yes to confirm",
                    store.data_dir().display()
                );
            }
            if store.reset()? {
                println!("Stats reset.");
            } else {
                println!("Nothing to reset.");
            }
        }
    }

    Ok(())
}
