// host_protocol.rs - End-to-end tests of the native-messaging host over
// in-memory pipes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ig_evaluator::{EvaluatorConfig, GuardianEvaluator};
use ig_gate::{
    ArgumentEvaluator, BudgetMode, DegenerateKind, Evaluation, EvaluationError, EvaluationRequest,
    GateConfig, MemoryRecorder, PurchaseContext, Resolution, ScoreSource, StatsRecorder, Verdict,
};
use ig_host::{
    read_frame, write_frame, GateSignal, HostRequest, HostResponse, HostServer, MpscChannel,
    PurchaseGate, TriggerConfig, TriggerMatcher,
};
use ig_stats::{FileStatsRecorder, StatsStore};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;

const SCENARIO_ONE: &str =
    "I already replaced my broken laptop charger and compared prices, staying within budget";

/// Never finishes; stands in for a hung text-generation service.
struct Stalled;

#[async_trait]
impl ArgumentEvaluator for Stalled {
    async fn evaluate(
        &self,
        _request: EvaluationRequest<'_>,
    ) -> Result<Evaluation, EvaluationError> {
        std::future::pending().await
    }
}

struct Extension {
    to_host: DuplexStream,
    from_host: DuplexStream,
    server: JoinHandle<Result<(), ig_host::HostError>>,
}

impl Extension {
    async fn send(&mut self, request: &HostRequest) {
        write_frame(&mut self.to_host, request).await.unwrap();
    }

    async fn send_raw(&mut self, body: &[u8]) {
        use tokio::io::AsyncWriteExt;
        let len = body.len() as u32;
        self.to_host.write_all(&len.to_ne_bytes()).await.unwrap();
        self.to_host.write_all(body).await.unwrap();
    }

    async fn recv(&mut self) -> HostResponse {
        let frame = tokio::time::timeout(Duration::from_secs(5), read_frame(&mut self.from_host))
            .await
            .expect("host answered in time")
            .unwrap()
            .expect("host sent a frame");
        serde_json::from_slice(&frame).unwrap()
    }
}

fn launch(
    config: GateConfig,
    evaluator: Arc<dyn ArgumentEvaluator>,
    recorder: Arc<dyn StatsRecorder>,
    tick: Duration,
) -> Extension {
    let (channel, signals) = MpscChannel::new();
    let gate = PurchaseGate::new(
        config,
        evaluator,
        recorder,
        Arc::new(channel),
        TriggerMatcher::new(&TriggerConfig::default()).unwrap(),
    )
    .unwrap();
    let server = HostServer::new(gate, signals).with_tick(tick);

    let (to_host, host_in) = tokio::io::duplex(64 * 1024);
    let (host_out, from_host) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(server.run(host_in, host_out));
    Extension {
        to_host,
        from_host,
        server,
    }
}

fn heuristic() -> Arc<dyn ArgumentEvaluator> {
    Arc::new(GuardianEvaluator::heuristic(&EvaluatorConfig::default()).unwrap())
}

fn laptop_charger() -> PurchaseContext {
    PurchaseContext::new("USB-C Laptop Charger 100W", "$59.99")
        .with_source("https://shop.example.com/checkout", "shop.example.com")
}

#[tokio::test]
async fn scenario_one_reduces_the_countdown() {
    let mut ext = launch(
        GateConfig::default(),
        heuristic(),
        Arc::new(MemoryRecorder::new()),
        Duration::from_secs(3600),
    );

    ext.send(&HostRequest::Start {
        context: laptop_charger(),
        mode: None,
    })
    .await;
    let HostResponse::Started { session } = ext.recv().await else {
        panic!("expected started");
    };
    assert_eq!(session.budget.remaining, 120);

    ext.send(&HostRequest::Submit {
        text: SCENARIO_ONE.to_string(),
    })
    .await;
    let HostResponse::Evaluated { argument, session } = ext.recv().await else {
        panic!("expected evaluated");
    };
    assert!((45..=60).contains(&argument.score), "score {}", argument.score);
    assert_eq!(argument.source, ScoreSource::Heuristic);
    assert_eq!(session.budget.remaining, 120 - argument.score as u32);
    assert!(argument.feedback.to_lowercase().contains("need"));
}

#[tokio::test]
async fn gibberish_and_repeats_score_zero() {
    let mut ext = launch(
        GateConfig::for_mode(BudgetMode::Health),
        heuristic(),
        Arc::new(MemoryRecorder::new()),
        Duration::from_secs(3600),
    );
    ext.send(&HostRequest::Start {
        context: PurchaseContext::default(),
        mode: None,
    })
    .await;
    ext.recv().await;

    ext.send(&HostRequest::Submit {
        text: "asdfasdfasdf".into(),
    })
    .await;
    let HostResponse::Evaluated { argument, session } = ext.recv().await else {
        panic!("expected evaluated");
    };
    assert_eq!(argument.score, 0);
    assert_eq!(argument.source.degenerate_kind(), Some(DegenerateKind::Gibberish));
    assert_eq!(session.budget.remaining, 100);

    let text = "my blender broke and I need to replace it";
    ext.send(&HostRequest::Submit { text: text.into() }).await;
    let HostResponse::Evaluated { argument: first, .. } = ext.recv().await else {
        panic!("expected evaluated");
    };
    assert!(first.score > 0);
    ext.send(&HostRequest::Submit { text: text.into() }).await;
    let HostResponse::Evaluated { argument: second, .. } = ext.recv().await else {
        panic!("expected evaluated");
    };
    assert_eq!(second.score, 0);
    assert_eq!(second.source.degenerate_kind(), Some(DegenerateKind::Repetition));
}

#[tokio::test]
async fn malformed_frames_get_errors_and_the_loop_continues() {
    let mut ext = launch(
        GateConfig::default(),
        heuristic(),
        Arc::new(MemoryRecorder::new()),
        Duration::from_secs(3600),
    );
    ext.send_raw(b"{not json").await;
    assert!(matches!(ext.recv().await, HostResponse::Error { .. }));

    ext.send_raw(br#"{"kind":"fly_to_moon"}"#).await;
    assert!(matches!(ext.recv().await, HostResponse::Error { .. }));

    ext.send(&HostRequest::Status).await;
    assert_eq!(ext.recv().await, HostResponse::Status { session: None });

    ext.send(&HostRequest::Submit {
        text: "no session yet".into(),
    })
    .await;
    assert!(matches!(ext.recv().await, HostResponse::Rejected { .. }));
}

#[tokio::test]
async fn dismiss_during_evaluation_blocks_and_other_requests_are_busy() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut ext = launch(
        GateConfig::default(),
        Arc::new(Stalled),
        recorder.clone(),
        Duration::from_secs(3600),
    );
    ext.send(&HostRequest::Start {
        context: laptop_charger(),
        mode: None,
    })
    .await;
    ext.recv().await;

    ext.send(&HostRequest::Submit {
        text: "it is for work".into(),
    })
    .await;
    ext.send(&HostRequest::Status).await;
    assert_eq!(ext.recv().await, HostResponse::Busy);

    ext.send(&HostRequest::Dismiss).await;
    let HostResponse::Resolved { outcome } = ext.recv().await else {
        panic!("expected resolved");
    };
    assert_eq!(outcome.resolution, Resolution::Abandoned);
    assert_eq!(outcome.verdict, Verdict::Blocked);
    assert_eq!(outcome.arguments, 0);
    assert_eq!(
        ext.recv().await,
        HostResponse::Signal {
            signal: GateSignal::Block {
                domain: "shop.example.com".into(),
                close_tab: false
            }
        }
    );

    // The gate is free again.
    ext.send(&HostRequest::Finalize).await;
    let HostResponse::Resolved { outcome: again } = ext.recv().await else {
        panic!("expected resolved");
    };
    assert_eq!(again, outcome);
    assert_eq!(recorder.outcomes().len(), 1);
}

#[tokio::test]
async fn countdown_expiry_is_pushed_unprompted() {
    let config = GateConfig {
        initial_budget: Some(1),
        ..GateConfig::default()
    };
    let mut ext = launch(
        config,
        heuristic(),
        Arc::new(MemoryRecorder::new()),
        Duration::from_millis(20),
    );
    ext.send(&HostRequest::Start {
        context: laptop_charger(),
        mode: None,
    })
    .await;
    ext.recv().await;

    let HostResponse::Status { session } = ext.recv().await else {
        panic!("expected status");
    };
    assert_eq!(session.unwrap().budget.remaining, 0);
    let HostResponse::Resolved { outcome } = ext.recv().await else {
        panic!("expected resolved");
    };
    assert_eq!(outcome.resolution, Resolution::BudgetExhausted);
    assert!(matches!(
        ext.recv().await,
        HostResponse::Signal {
            signal: GateSignal::Block { .. }
        }
    ));
}

#[tokio::test]
async fn allowed_purchase_is_recorded_and_unlocks_the_domain() {
    let dir = tempfile::tempdir().unwrap();
    let store = StatsStore::open(dir.path()).unwrap();
    let config = GateConfig {
        pass_threshold: Some(40),
        ..GateConfig::default()
    };
    let mut ext = launch(
        config,
        heuristic(),
        Arc::new(FileStatsRecorder::new(store.clone())),
        Duration::from_secs(3600),
    );

    ext.send(&HostRequest::CheckNavigation {
        url: "https://shop.example.com/checkout".into(),
        domain: None,
    })
    .await;
    assert!(matches!(
        ext.recv().await,
        HostResponse::Navigation { gate: true, .. }
    ));

    ext.send(&HostRequest::Start {
        context: laptop_charger(),
        mode: None,
    })
    .await;
    ext.recv().await;
    ext.send(&HostRequest::Submit {
        text: SCENARIO_ONE.into(),
    })
    .await;
    assert!(matches!(ext.recv().await, HostResponse::Evaluated { .. }));
    let HostResponse::Resolved { outcome } = ext.recv().await else {
        panic!("expected resolved");
    };
    assert_eq!(outcome.verdict, Verdict::Allowed);
    assert_eq!(
        ext.recv().await,
        HostResponse::Signal {
            signal: GateSignal::Allow {
                domain: "shop.example.com".into()
            }
        }
    );

    ext.send(&HostRequest::CheckNavigation {
        url: "https://shop.example.com/checkout".into(),
        domain: None,
    })
    .await;
    assert!(matches!(
        ext.recv().await,
        HostResponse::Navigation { gate: false, .. }
    ));

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.total_battles, 1);
    assert_eq!(snapshot.defeats, 1);
    assert_eq!(store.history().unwrap()[0].session_id, outcome.session_id);
}

#[tokio::test]
async fn closing_input_abandons_the_running_session() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut ext = launch(
        GateConfig::default(),
        heuristic(),
        recorder.clone(),
        Duration::from_secs(3600),
    );
    ext.send(&HostRequest::Start {
        context: laptop_charger(),
        mode: None,
    })
    .await;
    ext.recv().await;

    let Extension {
        to_host,
        mut from_host,
        server,
    } = ext;
    drop(to_host);

    let frame = read_frame(&mut from_host).await.unwrap().unwrap();
    let response: HostResponse = serde_json::from_slice(&frame).unwrap();
    assert!(matches!(response, HostResponse::Resolved { .. }));

    server.await.unwrap().unwrap();
    let outcomes = recorder.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].resolution, Resolution::Abandoned);
}
