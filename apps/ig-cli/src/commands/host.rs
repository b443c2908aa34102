// host.rs - Run the native-messaging host on stdin/stdout.
//
// The browser launches this binary per its native-messaging manifest; all
// frames go over stdio and logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use ig_host::{HostServer, MpscChannel, PurchaseGate};

use crate::config::AppConfig;

pub fn execute(config: &AppConfig, tick_ms: u64) -> anyhow::Result<()> {
    if tick_ms == 0 {
        anyhow::bail!("--tick-ms must be greater than zero");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let evaluator = super::build_evaluator(&config.evaluator, false)?;
        let recorder = super::open_recorder(config);
        let trigger = super::build_trigger(config)?;
        let (channel, signals) = MpscChannel::new();

        let gate = PurchaseGate::new(
            config.gate.clone(),
            evaluator,
            recorder,
            Arc::new(channel),
            trigger,
        )?
        .with_close_tab_on_block(config.trigger.close_tab_on_block);

        tracing::info!(
            mode = %config.gate.mode,
            data_dir = %config.data_dir().display(),
            "starting native-messaging host"
        );

        HostServer::new(gate, signals)
            .with_tick(Duration::from_millis(tick_ms))
            .run(tokio::io::stdin(), tokio::io::stdout())
            .await?;
        Ok::<(), anyhow::Error>(())
    })
}
