//! # impulse-guard
//!
//! Command-line interface for Impulse Guard.
//!
//! - `impulse-guard gate`: argue for a purchase against the guardian in the terminal
//! - `impulse-guard host`: native-messaging host for the browser extension
//! - `impulse-guard check <url>`: would this page raise the gate?
//! - `impulse-guard stats show/history/report/reset`: savings and battle stats
//! - `impulse-guard config show/path`: inspect the effective configuration

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Impulse Guard - justify a purchase before you make it.
#[derive(Parser)]
#[command(name = "impulse-guard", version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/impulse-guard/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Argue for a purchase in the terminal.
    Gate(commands::gate::GateArgs),
    /// Run the native-messaging host on stdin/stdout.
    Host {
        /// Countdown tick interval in milliseconds.
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    /// Report whether a URL would raise the gate.
    Check {
        url: String,
        /// Page domain, if it differs from the URL's host.
        #[arg(long)]
        domain: Option<String>,
    },
    /// Savings and battle statistics.
    Stats {
        #[command(subcommand)]
        command: commands::stats::StatsCommands,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML (secrets masked).
    Show,
    /// Print the default config file location.
    Path,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json)?;

    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Commands::Gate(args) => commands::gate::execute(args, &config),
        Commands::Host { tick_ms } => commands::host::execute(&config, *tick_ms),
        Commands::Check { url, domain } => commands::check::execute(&config, url, domain.as_deref()),
        Commands::Stats { command } => commands::stats::execute(command, &config),
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(&config.redacted())?);
                Ok(())
            }
            ConfigCommands::Path => {
                match cli.config.clone().or_else(AppConfig::default_path) {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No config directory on this platform."),
                }
                Ok(())
            }
        },
    }
}

/// Crates whose events are shown at the CLI's level.
const LOG_TARGETS: &[&str] = &["impulse_guard", "ig_gate", "ig_host", "ig_evaluator", "ig_stats"];

fn log_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{}={}", target, level).parse()?);
    }
    Ok(filter)
}

/// Logs go to stderr: stdout carries the native-messaging frames.
fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = log_filter(level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
