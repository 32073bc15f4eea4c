//! Connection session manager.
//!
//! One session per client channel. The calling task owns the read half and
//! runs the reader loop; a spawned writer task owns the write half and is
//! the only place frames are written. Each accepted call runs in its own
//! task, so a slow call never holds up the frames behind it.
//!
//! Teardown (disconnect, framing error or shutdown) cancels every call still
//! in flight. Their `cancelled` outcomes are still produced and audited even
//! when they can no longer be delivered. A client that stops reading is
//! treated as disconnected once a frame has waited [`WRITE_TIMEOUT`].

use super::error::{Result, SessionError};
use super::framing::{read_frame, write_frame};
use super::limits::{AdmissionError, ConcurrencyLimits};
use super::protocol::{CallRequest, OutboundMessage};
use conduit_application::{
    DispatchContext, LayerDeadline, ProgressNotifier, ProgressUpdate, RequestDispatcher,
};
use conduit_domain::{CallId, FailureKind, Outcome, TimeoutLayer, ToolCall};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

type InFlight = Arc<Mutex<HashMap<CallId, CancellationToken>>>;

/// Longest one outbound frame may take to reach the client. Also bounds the
/// writer drain at the end of a session.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts channels and runs the calls that arrive on them.
///
/// One manager is shared by every connection of the process so the
/// process-wide concurrency limit applies across channels.
pub struct SessionManager {
    dispatcher: Arc<RequestDispatcher>,
    limits: ConcurrencyLimits,
}

/// State shared by the reader loop and the call tasks of one channel.
#[derive(Clone)]
struct Channel {
    id: Arc<str>,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    in_flight: InFlight,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Channel {
    fn send(&self, message: OutboundMessage) {
        // Fails only once the writer has stopped; the client is gone by then
        if self.outbound.send(message).is_err() {
            debug!(session = %self.id, "Writer stopped, dropping outbound message");
        }
    }

    fn forget(&self, call_id: &CallId) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(call_id);
    }
}

/// Forwards one call's progress to the channel writer until the call ends.
struct CallProgress {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    open: Mutex<bool>,
}

impl CallProgress {
    fn new(outbound: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self {
            outbound,
            open: Mutex::new(true),
        }
    }

    /// Stop forwarding. Must happen before the outcome is queued; an aborted
    /// handler can still be mid-poll on another worker.
    fn close(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }
}

impl ProgressNotifier for CallProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            let _ = self.outbound.send(update.into());
        }
    }
}

impl SessionManager {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        let limits = ConcurrencyLimits::new(dispatcher.config());
        Self { dispatcher, limits }
    }

    /// Serve one channel until the client disconnects or `shutdown` fires.
    ///
    /// Returns once every call of the channel has produced its outcome and
    /// the writer has flushed what it could.
    pub async fn serve<R, W>(&self, reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id: Arc<str> = Uuid::new_v4().simple().to_string()[..8].into();
        let cancel = shutdown.child_token();
        let (outbound, rx) = mpsc::unbounded_channel();
        let mut writer_task = tokio::spawn(write_loop(writer, rx, Arc::clone(&id), cancel.clone()));

        let channel = Channel {
            id: Arc::clone(&id),
            outbound,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            slots: self.limits.channel_slots(),
            cancel,
        };
        info!(session = %channel.id, "Session opened");

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut calls = JoinSet::new();

        let result = loop {
            let frame = tokio::select! {
                biased;
                _ = channel.cancel.cancelled() => {
                    info!(session = %channel.id, "Session shutting down");
                    break Ok(());
                }
                frame = read_frame(&mut reader, &mut line) => frame,
            };

            match frame {
                Ok(Some(body)) => self.accept(&body, &channel, &mut calls),
                Ok(None) => {
                    info!(session = %channel.id, "Client disconnected");
                    break Ok(());
                }
                Err(SessionError::TransportClosed) => {
                    warn!(session = %channel.id, "Client disconnected mid-frame");
                    break Ok(());
                }
                Err(e) => {
                    warn!(session = %channel.id, error = %e, "Closing session on read error");
                    channel.send(OutboundMessage::error(e.to_string()));
                    break Err(e);
                }
            }

            while calls.try_join_next().is_some() {}
        };

        self.teardown(channel, calls).await;
        match tokio::time::timeout(WRITE_TIMEOUT, &mut writer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session = %id, error = %e, "Writer task failed"),
            Err(_) => {
                warn!(session = %id, "Writer did not drain in time, dropping remaining frames");
                writer_task.abort();
            }
        }
        result
    }

    async fn teardown(&self, channel: Channel, mut calls: JoinSet<()>) {
        let pending = channel.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len();
        if pending > 0 {
            info!(session = %channel.id, pending, "Cancelling in-flight calls");
        }
        channel.cancel.cancel();

        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                warn!(session = %channel.id, error = %e, "Call task failed");
            }
        }
        info!(session = %channel.id, "Session closed");
        // Dropping the last sender lets the writer drain and stop
    }

    /// Validate one inbound frame and start its call.
    fn accept(&self, body: &[u8], channel: &Channel, calls: &mut JoinSet<()>) {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(session = %channel.id, error = %e, "Unparseable frame");
                channel.send(OutboundMessage::error(format!("Invalid JSON: {}", e)));
                return;
            }
        };
        if !value.is_object() {
            channel.send(OutboundMessage::error("Frame is not a call object"));
            return;
        }

        let request = match serde_json::from_value::<CallRequest>(value.clone()) {
            Ok(request) if !request.tool_name.trim().is_empty() => request,
            Ok(_) => {
                self.reject(channel, &value, "tool_name must not be empty");
                return;
            }
            Err(e) => {
                self.reject(channel, &value, &format!("Malformed call: {}", e));
                return;
            }
        };

        let call = request.into_call(assign_call_id);
        let cancel = channel.cancel.child_token();
        {
            let mut in_flight = channel.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if in_flight.contains_key(&call.call_id) {
                drop(in_flight);
                let message = format!("Duplicate call_id: {} is already in flight", call.call_id.as_str());
                self.refuse(channel, call, &message);
                return;
            }
            in_flight.insert(call.call_id.clone(), cancel.clone());
        }

        debug!(
            session = %channel.id,
            call_id = %call.call_id.as_str(),
            tool = %call.tool_name,
            "Call accepted"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let limits = self.limits.clone();
        let channel = channel.clone();
        calls.spawn(run_call(dispatcher, limits, channel, call, cancel));
    }

    /// Answer a frame that is an object but not a usable call.
    fn reject(&self, channel: &Channel, value: &Value, message: &str) {
        let call_id = value
            .get("call_id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(assign_call_id);
        let tool_name = value.get("tool_name").and_then(Value::as_str).unwrap_or_default();
        self.refuse(channel, ToolCall::new(call_id, tool_name), message);
    }

    fn refuse(&self, channel: &Channel, call: ToolCall, message: &str) {
        warn!(
            session = %channel.id,
            call_id = %call.call_id.as_str(),
            "Rejected call: {}", message
        );
        let outcome = Outcome::failure(
            call.call_id.clone(),
            call.tool_name.clone(),
            FailureKind::InvalidRequest,
            message,
            Duration::ZERO,
        );
        channel.send(OutboundMessage::outcome(&outcome));
        let _ = self.dispatcher.settle(call, outcome);
    }
}

fn assign_call_id() -> String {
    Uuid::new_v4().to_string()
}

/// Admit, dispatch and answer one call.
async fn run_call(
    dispatcher: Arc<RequestDispatcher>,
    limits: ConcurrencyLimits,
    channel: Channel,
    call: ToolCall,
    cancel: CancellationToken,
) {
    let arrived = Instant::now();
    let session_deadline =
        LayerDeadline::root(TimeoutLayer::Session, dispatcher.config().budget().session());

    let outcome = match limits.acquire(&channel.slots, &cancel).await {
        Ok(permit) => {
            let progress = Arc::new(CallProgress::new(channel.outbound.clone()));
            let dctx = DispatchContext::detached()
                .with_progress(progress.clone())
                .with_cancellation(cancel)
                .with_session_deadline(session_deadline);
            let outcome = dispatcher.dispatch(call, dctx).await;
            progress.close();
            drop(permit);
            outcome
        }
        Err(e) => {
            let outcome = match e {
                AdmissionError::Overloaded(_) => Outcome::failure(
                    call.call_id.clone(),
                    call.tool_name.clone(),
                    FailureKind::Overloaded,
                    e.to_string(),
                    arrived.elapsed(),
                ),
                AdmissionError::Cancelled => Outcome::cancelled(
                    call.call_id.clone(),
                    call.tool_name.clone(),
                    e.to_string(),
                    arrived.elapsed(),
                ),
            };
            warn!(
                session = %channel.id,
                call_id = %call.call_id.as_str(),
                tool = %call.tool_name,
                "Call not admitted: {}", e
            );
            let _ = dispatcher.settle(call, outcome.clone());
            outcome
        }
    };

    channel.forget(&outcome.call_id);
    channel.send(OutboundMessage::outcome(&outcome));
}

/// Sole owner of the write half.
///
/// Stops and cancels the channel when a frame cannot be written within
/// [`WRITE_TIMEOUT`]; frames still queued are dropped.
async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    session: Arc<str>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let body = match serde_json::to_vec(&message) {
            Ok(body) => body,
            Err(e) => {
                warn!(session = %session, error = %e, "Failed to serialize outbound message");
                continue;
            }
        };
        match tokio::time::timeout(WRITE_TIMEOUT, write_frame(&mut writer, &body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(session = %session, error = %e, "Writer stopped");
                cancel.cancel();
                return;
            }
            Err(_) => {
                warn!(
                    session = %session,
                    call_id = message.call_id().map(CallId::as_str).unwrap_or("-"),
                    timeout_ms = WRITE_TIMEOUT.as_millis() as u64,
                    "Client stopped reading, closing session"
                );
                cancel.cancel();
                return;
            }
        }
    }
    let _ = tokio::time::timeout(WRITE_TIMEOUT, writer.shutdown()).await;
}
