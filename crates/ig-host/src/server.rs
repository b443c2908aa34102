// server.rs - HostServer: the native-messaging loop.
//
// One loop multiplexes three things with `tokio::select!`:
//   - request frames, read by a separate task (frame reads are not
//     cancel-safe, so they never sit inside select! directly)
//   - a one-second ticker that advances the countdown
//   - at most one evaluation in flight
//
// While an evaluation runs, `dismiss` drops it and ends the session; every
// other request gets `busy`. Gate signals are drained after each step and
// written as `signal` frames. EOF on the input finalizes any running
// session as abandoned and ends the loop.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use ig_gate::{Evaluation, EvaluationError, Submission};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::channel::GateSignal;
use crate::error::HostError;
use crate::framing::{read_frame, write_frame};
use crate::gate::PurchaseGate;
use crate::protocol::{HostRequest, HostResponse, SessionView};

/// Default interval between countdown ticks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

type EvaluationFuture =
    Pin<Box<dyn Future<Output = (Submission, Result<Evaluation, EvaluationError>)> + Send>>;

/// What the reader task hands the loop.
enum Inbound {
    Request(HostRequest),
    Invalid(String),
}

/// Serves one extension connection over a pair of byte streams.
pub struct HostServer {
    gate: PurchaseGate,
    signals: mpsc::UnboundedReceiver<GateSignal>,
    tick: Duration,
}

impl HostServer {
    /// `signals` must be the receiver paired with the gate's channel.
    pub fn new(gate: PurchaseGate, signals: mpsc::UnboundedReceiver<GateSignal>) -> Self {
        Self {
            gate,
            signals,
            tick: DEFAULT_TICK,
        }
    }

    /// Builder-style: countdown tick interval.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run until the input reaches EOF or the output fails.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> Result<(), HostError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let mut requests = spawn_reader(reader);
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut last_tick = Instant::now();
        let mut pending: Option<EvaluationFuture> = None;

        tracing::info!("native-messaging host ready");

        loop {
            let responses = tokio::select! {
                inbound = requests.recv() => match inbound {
                    None => break,
                    Some(Inbound::Invalid(message)) => vec![HostResponse::Error { message }],
                    Some(Inbound::Request(request)) => self.handle(request, &mut pending),
                },
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick);
                    last_tick = now;
                    match self.gate.tick(elapsed) {
                        Some(outcome) => {
                            if pending.take().is_some() {
                                tracing::debug!("countdown expired during evaluation; result discarded");
                            }
                            let session = self.gate.session().map(SessionView::from);
                            vec![HostResponse::Status { session }, HostResponse::Resolved { outcome }]
                        }
                        None => Vec::new(),
                    }
                }
                (submission, result) = wait_for(&mut pending) => {
                    pending = None;
                    self.complete(&submission, result)
                }
            };

            for response in &responses {
                write_frame(&mut writer, response).await?;
            }
            self.flush_signals(&mut writer).await?;
        }

        if let Some(outcome) = self.gate.dismiss() {
            tracing::info!(session_id = %outcome.session_id, "input closed; gate session abandoned");
            if let Err(e) = self.write_closing(&mut writer, outcome).await {
                tracing::debug!(error = %e, "could not report abandoned session");
            }
        }
        tracing::info!("native-messaging host stopped");
        Ok(())
    }

    fn handle(
        &mut self,
        request: HostRequest,
        pending: &mut Option<EvaluationFuture>,
    ) -> Vec<HostResponse> {
        if pending.is_some() {
            return match request {
                HostRequest::Dismiss => {
                    *pending = None;
                    tracing::debug!("dismissed during evaluation; evaluation dropped");
                    self.dismiss()
                }
                _ => vec![HostResponse::Busy],
            };
        }

        match request {
            HostRequest::Start { context, mode } => match self.gate.start(context, mode) {
                Ok(session) => vec![HostResponse::Started {
                    session: SessionView::from(session),
                }],
                Err(e) => vec![HostResponse::Error {
                    message: e.to_string(),
                }],
            },
            HostRequest::Submit { text } => match self.gate.prepare_submission(&text) {
                Ok(evaluation) => {
                    *pending = Some(Box::pin(evaluation.run(self.gate.evaluator())));
                    Vec::new()
                }
                Err(e) => vec![HostResponse::Rejected {
                    reason: e.to_string(),
                }],
            },
            HostRequest::Status => vec![self.status()],
            HostRequest::Dismiss => self.dismiss(),
            HostRequest::Finalize => match self.gate.finalize() {
                Ok(outcome) => vec![HostResponse::Resolved { outcome }],
                Err(e) => vec![HostResponse::Error {
                    message: e.to_string(),
                }],
            },
            HostRequest::CheckNavigation { url, domain } => {
                let gate = self.gate.should_gate(&url, domain.as_deref());
                vec![HostResponse::Navigation { url, gate }]
            }
        }
    }

    fn complete(
        &mut self,
        submission: &Submission,
        result: Result<Evaluation, EvaluationError>,
    ) -> Vec<HostResponse> {
        match self.gate.complete_submission(submission, result) {
            Ok(applied) => {
                let mut responses = Vec::with_capacity(2);
                if let Some(session) = self.gate.session() {
                    responses.push(HostResponse::Evaluated {
                        argument: applied.record,
                        session: SessionView::from(session),
                    });
                }
                if applied.resolution.is_some() {
                    match self.gate.finalize() {
                        Ok(outcome) => responses.push(HostResponse::Resolved { outcome }),
                        Err(e) => tracing::warn!(error = %e, "resolved session has no outcome"),
                    }
                }
                responses
            }
            Err(e) => vec![HostResponse::Rejected {
                reason: e.to_string(),
            }],
        }
    }

    fn dismiss(&mut self) -> Vec<HostResponse> {
        match self.gate.dismiss() {
            Some(outcome) => vec![HostResponse::Resolved { outcome }],
            None => vec![self.status()],
        }
    }

    fn status(&self) -> HostResponse {
        HostResponse::Status {
            session: self.gate.session().map(SessionView::from),
        }
    }

    async fn flush_signals<W>(&mut self, writer: &mut W) -> Result<(), HostError>
    where
        W: AsyncWrite + Unpin,
    {
        while let Ok(signal) = self.signals.try_recv() {
            write_frame(writer, &HostResponse::Signal { signal }).await?;
        }
        Ok(())
    }

    async fn write_closing<W>(
        &mut self,
        writer: &mut W,
        outcome: ig_gate::AttemptOutcome,
    ) -> Result<(), HostError>
    where
        W: AsyncWrite + Unpin,
    {
        write_frame(writer, &HostResponse::Resolved { outcome }).await?;
        self.flush_signals(writer).await
    }
}

/// Await the in-flight evaluation, or never resolve if there is none.
async fn wait_for(
    pending: &mut Option<EvaluationFuture>,
) -> (Submission, Result<Evaluation, EvaluationError>) {
    match pending {
        Some(evaluation) => evaluation.await,
        None => std::future::pending().await,
    }
}

fn spawn_reader<R>(mut reader: R) -> mpsc::Receiver<Inbound>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        loop {
            let inbound = match read_frame(&mut reader).await {
                Ok(None) => break,
                Ok(Some(body)) => match serde_json::from_slice::<HostRequest>(&body) {
                    Ok(request) => Inbound::Request(request),
                    Err(e) => Inbound::Invalid(format!("malformed request: {}", e)),
                },
                Err(HostError::FrameTooLarge { len, max }) => {
                    Inbound::Invalid(format!("frame of {} bytes exceeds the {}-byte limit", len, max))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "input stream failed; closing");
                    break;
                }
            };
            if tx.send(inbound).await.is_err() {
                break;
            }
        }
    });
    rx
}
