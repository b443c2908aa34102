// mod.rs - Subcommands and the wiring they share.

pub mod check;
pub mod gate;
pub mod host;
pub mod stats;

use std::sync::Arc;

use anyhow::Context;
use ig_evaluator::{EvaluatorConfig, GuardianEvaluator};
use ig_gate::{ArgumentEvaluator, MemoryRecorder, StatsRecorder};
use ig_host::TriggerMatcher;
use ig_stats::{FileStatsRecorder, StatsStore};

use crate::config::AppConfig;

/// The configured evaluator, or heuristic-only when `offline`.
pub fn build_evaluator(
    config: &EvaluatorConfig,
    offline: bool,
) -> anyhow::Result<Arc<dyn ArgumentEvaluator>> {
    let evaluator = if offline {
        GuardianEvaluator::heuristic(config)
    } else {
        GuardianEvaluator::from_config(config)
    }
    .context("failed to build argument evaluator")?;
    Ok(Arc::new(evaluator))
}

/// The stats store under the configured data directory.
pub fn open_store(config: &AppConfig) -> anyhow::Result<StatsStore> {
    let dir = config.data_dir();
    StatsStore::open(&dir)
        .with_context(|| format!("failed to open stats directory {}", dir.display()))
}

/// File-backed recorder, or an in-memory one if the data directory
/// cannot be opened. A gate still runs without persistent stats.
pub fn open_recorder(config: &AppConfig) -> Arc<dyn StatsRecorder> {
    match open_store(config) {
        Ok(store) => Arc::new(FileStatsRecorder::new(store)),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "stats unavailable, outcomes will not be saved");
            Arc::new(MemoryRecorder::new())
        }
    }
}

pub fn build_trigger(config: &AppConfig) -> anyhow::Result<TriggerMatcher> {
    TriggerMatcher::new(&config.trigger).context("invalid [trigger] section")
}
