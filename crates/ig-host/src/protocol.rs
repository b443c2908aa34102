// protocol.rs - Native-messaging message types.
//
// Every message is a JSON object with a `kind` discriminator:
//
//   extension → host   start, submit, status, dismiss, finalize, check_navigation
//   host → extension   started, evaluated, rejected, status, resolved,
//                      navigation, busy, signal, error
//
// `resolved` and `signal` frames may arrive unprompted, when the countdown
// runs out.

use ig_gate::{
    ArgumentRecord, AttemptOutcome, Budget, BudgetMode, GateSession, GateState, PurchaseContext,
    Resolution,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::GateSignal;

/// A request from the extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostRequest {
    /// Open a gate for a purchase. Replaces any session still running.
    Start {
        #[serde(default)]
        context: PurchaseContext,
        /// Overrides the configured mode for this session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<BudgetMode>,
    },
    Submit {
        text: String,
    },
    Status,
    Dismiss,
    Finalize,
    CheckNavigation {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
    },
}

/// A frame sent to the extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostResponse {
    Started {
        session: SessionView,
    },
    Evaluated {
        argument: ArgumentRecord,
        session: SessionView,
    },
    /// The submission was refused and nothing changed.
    Rejected {
        reason: String,
    },
    Status {
        #[serde(default)]
        session: Option<SessionView>,
    },
    Resolved {
        outcome: AttemptOutcome,
    },
    Navigation {
        url: String,
        gate: bool,
    },
    /// An evaluation is in flight; only `dismiss` is accepted until it ends.
    Busy,
    Signal {
        signal: GateSignal,
    },
    Error {
        message: String,
    },
}

/// What the extension needs to render a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub state: GateState,
    pub mode: BudgetMode,
    /// "seconds" or "HP".
    pub unit: String,
    pub budget: Budget,
    pub persuasion: u32,
    pub pass_threshold: u32,
    pub arguments: usize,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl From<&GateSession> for SessionView {
    fn from(session: &GateSession) -> Self {
        let mode = session.strategy().mode;
        Self {
            session_id: session.session_id(),
            state: session.state(),
            mode,
            unit: mode.unit().to_string(),
            budget: session.budget(),
            persuasion: session.persuasion(),
            pass_threshold: session.pass_threshold(),
            arguments: session.arguments().len(),
            product: session.context().product_label().to_string(),
            resolution: session.resolution(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ig_gate::GateConfig;

    #[test]
    fn requests_parse_from_extension_json() {
        let start: HostRequest = serde_json::from_str(
            r#"{"kind":"start","context":{"product_name":"Nike Pegasus 41","price":"$140.00","domain":"www.nike.com"}}"#,
        )
        .unwrap();
        match start {
            HostRequest::Start { context, mode } => {
                assert_eq!(context.product_name, "Nike Pegasus 41");
                assert_eq!(mode, None);
            }
            other => panic!("unexpected request: {:?}", other),
        }

        // An empty start is a fully unknown purchase.
        let bare: HostRequest = serde_json::from_str(r#"{"kind":"start"}"#).unwrap();
        assert!(matches!(bare, HostRequest::Start { .. }));

        let health: HostRequest =
            serde_json::from_str(r#"{"kind":"start","context":{},"mode":"health"}"#).unwrap();
        assert!(matches!(
            health,
            HostRequest::Start {
                mode: Some(BudgetMode::Health),
                ..
            }
        ));

        let nav: HostRequest =
            serde_json::from_str(r#"{"kind":"check_navigation","url":"https://a.example/cart"}"#)
                .unwrap();
        assert!(matches!(nav, HostRequest::CheckNavigation { domain: None, .. }));

        assert!(serde_json::from_str::<HostRequest>(r#"{"kind":"explode"}"#).is_err());
    }

    #[test]
    fn session_view_flattens_state() {
        let session = GateSession::start_with(
            PurchaseContext::new("Standing Desk", "$349"),
            &GateConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_value(HostResponse::Started {
            session: SessionView::from(&session),
        })
        .unwrap();
        assert_eq!(json["kind"], "started");
        assert_eq!(json["session"]["state"], "active");
        assert_eq!(json["session"]["unit"], "seconds");
        assert_eq!(json["session"]["budget"]["remaining"], 120);
        assert_eq!(json["session"]["product"], "Standing Desk");
    }

    #[test]
    fn unit_variants_are_bare_kinds() {
        assert_eq!(
            serde_json::to_string(&HostResponse::Busy).unwrap(),
            r#"{"kind":"busy"}"#
        );
        assert_eq!(
            serde_json::to_string(&HostRequest::Status).unwrap(),
            r#"{"kind":"status"}"#
        );
    }
}
