// channel.rs - GateChannel: how allow/block decisions reach the browser.
//
// The gate decides; something else unlocks the page or closes the tab. That
// something sits behind `GateChannel`. The host server uses `MpscChannel`
// and forwards signals as frames; tests use `MemoryChannel`.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The decision for one finalized gate session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GateSignal {
    /// Let the purchase through and stop gating this domain.
    Allow { domain: String },
    /// Keep the purchase blocked; optionally close the tab.
    Block { domain: String, close_tab: bool },
}

impl GateSignal {
    pub fn domain(&self) -> &str {
        match self {
            GateSignal::Allow { domain } | GateSignal::Block { domain, .. } => domain,
        }
    }
}

impl fmt::Display for GateSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateSignal::Allow { domain } => write!(f, "allow {}", domain),
            GateSignal::Block { domain, close_tab } => {
                write!(f, "block {} (close_tab={})", domain, close_tab)
            }
        }
    }
}

/// Errors from GateChannel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel closed")]
    ChannelClosed,

    #[error("channel error: {0}")]
    Other(String),
}

/// Delivers gate decisions to whatever enforces them.
pub trait GateChannel: Send + Sync {
    fn send(&self, signal: &GateSignal) -> Result<(), ChannelError>;

    /// Channel identity for logs (e.g., "mpsc", "memory").
    fn channel_id(&self) -> &str;
}

/// Forwards signals into a tokio channel.
pub struct MpscChannel {
    tx: mpsc::UnboundedSender<GateSignal>,
}

impl MpscChannel {
    /// A channel plus the receiver its signals arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GateSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl GateChannel for MpscChannel {
    fn send(&self, signal: &GateSignal) -> Result<(), ChannelError> {
        self.tx
            .send(signal.clone())
            .map_err(|_| ChannelError::ChannelClosed)
    }

    fn channel_id(&self) -> &str {
        "mpsc"
    }
}

/// Keeps every signal in memory.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    signals: Mutex<Vec<GateSignal>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<GateSignal> {
        match self.signals.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl GateChannel for MemoryChannel {
    fn send(&self, signal: &GateSignal) -> Result<(), ChannelError> {
        self.signals
            .lock()
            .map_err(|e| ChannelError::Other(e.to_string()))?
            .push(signal.clone());
        Ok(())
    }

    fn channel_id(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_wire_shape() {
        let json = serde_json::to_value(GateSignal::Block {
            domain: "shop.example.com".into(),
            close_tab: true,
        })
        .unwrap();
        assert_eq!(json["action"], "block");
        assert_eq!(json["domain"], "shop.example.com");
        assert_eq!(json["close_tab"], true);
    }

    #[test]
    fn mpsc_channel_delivers_and_reports_closure() {
        let (channel, mut rx) = MpscChannel::new();
        let signal = GateSignal::Allow {
            domain: "a.example".into(),
        };
        channel.send(&signal).unwrap();
        assert_eq!(rx.try_recv().unwrap(), signal);

        drop(rx);
        assert!(matches!(
            channel.send(&signal),
            Err(ChannelError::ChannelClosed)
        ));
    }

    #[test]
    fn memory_channel_keeps_order() {
        let channel = MemoryChannel::new();
        for domain in ["one.example", "two.example"] {
            channel
                .send(&GateSignal::Allow {
                    domain: domain.into(),
                })
                .unwrap();
        }
        let domains: Vec<String> = channel
            .signals()
            .iter()
            .map(|s| s.domain().to_string())
            .collect();
        assert_eq!(domains, ["one.example", "two.example"]);
    }
}
