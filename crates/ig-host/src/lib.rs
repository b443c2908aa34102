//! # ig-host
//!
//! Runs Impulse Guard gates for a browser extension.
//!
//! The extension spots a checkout, sends the scraped product context, relays
//! the shopper's arguments, and enforces whatever the gate decides. This
//! crate holds the orchestration between those steps and the
//! native-messaging host that speaks to the extension over stdin/stdout.
//!
//! ## Key components
//!
//! - [`PurchaseGate`]: current session, evaluator, recorder, signals
//! - [`HostServer`]: framed request loop with a countdown ticker
//! - [`TriggerMatcher`]: checkout URLs, purchase buttons, unlocked domains
//! - [`GateChannel`] / [`GateSignal`]: allow/block delivery
//! - [`HostRequest`] / [`HostResponse`]: the wire protocol

pub mod channel;
pub mod error;
pub mod framing;
pub mod gate;
pub mod protocol;
pub mod server;
pub mod trigger;

pub use channel::{ChannelError, GateChannel, GateSignal, MemoryChannel, MpscChannel};
pub use error::HostError;
pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use gate::{PendingEvaluation, PurchaseGate};
pub use protocol::{HostRequest, HostResponse, SessionView};
pub use server::{HostServer, DEFAULT_TICK};
pub use trigger::{domain_of, TriggerConfig, TriggerMatcher};
