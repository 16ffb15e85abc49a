//! Streaming connection: the `Idle → AwaitingAuth → Active` state machine and
//! its two background loops.
//!
//! The read loop owns the transport's read half. It decodes every binary
//! message and hands the frame to the dispatch loop over an unbounded channel.
//! The dispatch loop owns the write half: it applies inbound frames in order,
//! sends a heartbeat on every tick while active, and closes the transport when
//! the connection is cancelled.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use biliopen_frame::{decode_frame, Frame, Operation};
use biliopen_transport::{Dialer, FrameSink, FrameSource, Transport};
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::error::{LiveError, Result};
use crate::event::EventHandler;
use crate::router::Router;
use crate::state::ConnectionState;

/// Default period between HEARTBEAT frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Default time [`LiveConnection::close`] waits for the read loop to finish.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

const INITIAL_READ_BACKOFF: Duration = Duration::from_millis(50);
const MAX_READ_BACKOFF: Duration = Duration::from_secs(2);

/// Teardown notification. Receives `None` for a caller-initiated close and
/// the terminating error otherwise.
pub type CloseHandler = Arc<dyn Fn(Option<LiveError>) + Send + Sync>;

/// Streaming connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Streaming endpoint (`wss://...`).
    pub url: String,
    /// Opaque credential sent verbatim as the AUTH frame body.
    pub auth_body: String,
    pub heartbeat_interval: Duration,
    pub close_grace: Duration,
    /// Parent span of every record the connection emits.
    pub span: Span,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>, auth_body: impl Into<String>) -> Self {
        let url = url.into();
        let span = tracing::info_span!("live_connection", url = %url);
        Self {
            url,
            auth_body: auth_body.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            close_grace: DEFAULT_CLOSE_GRACE,
            span,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Check the settings a session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(LiveError::InvalidInterval {
                name: "heartbeat interval",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field(
                "auth_body",
                &format_args!("<redacted:{} bytes>", self.auth_body.len()),
            )
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("close_grace", &self.close_grace)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the connection handle and its loops.
struct Shared {
    state: Arc<watch::Sender<ConnectionState>>,
    // Present while a session runs; taken by the first teardown.
    cancel: Mutex<Option<CancellationToken>>,
    on_close: Mutex<Option<CloseHandler>>,
}

impl Shared {
    /// End the running session. Only the first call per session has any
    /// effect and fires the close notification.
    fn teardown(&self, reason: Option<LiveError>) -> bool {
        let Some(token) = lock(&self.cancel).take() else {
            return false;
        };
        token.cancel();
        self.state.send_replace(ConnectionState::Idle);

        match &reason {
            Some(err) => warn!(error = %err, "connection closed"),
            None => info!("connection closed"),
        }
        let on_close = lock(&self.on_close).clone();
        if let Some(on_close) = on_close {
            on_close(reason);
        }
        true
    }
}

/// Assigns sequence IDs to outbound frames.
struct FrameWriter<S> {
    sink: S,
    next_sequence: u32,
}

impl<S: FrameSink> FrameWriter<S> {
    fn new(sink: S) -> Self {
        Self {
            sink,
            next_sequence: 0,
        }
    }

    async fn send(&mut self, operation: Operation, body: Bytes) -> Result<()> {
        let frame = Frame::new(operation, self.next_sequence, body);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        trace!(
            operation = operation.name(),
            sequence = frame.sequence,
            len = frame.body.len(),
            "sending frame"
        );
        self.sink.send(frame.to_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(err) = self.sink.close().await {
            debug!(error = %err, "transport close failed");
        }
    }
}

struct Tasks {
    read: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

/// A single streaming connection.
///
/// Owns the transport and both background loops for as long as a session
/// runs. A closed connection can be connected again.
pub struct LiveConnection {
    config: ConnectionConfig,
    handler: Arc<dyn EventHandler>,
    shared: Arc<Shared>,
    tasks: Option<Tasks>,
}

impl LiveConnection {
    pub fn new(config: ConnectionConfig, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            config,
            handler,
            shared: Arc::new(Shared {
                state: Arc::new(watch::Sender::new(ConnectionState::Idle)),
                cancel: Mutex::new(None),
                on_close: Mutex::new(None),
            }),
            tasks: None,
        }
    }

    /// Register the teardown notification, replacing any previous one.
    pub fn on_close<F>(&self, f: F)
    where
        F: Fn(Option<LiveError>) + Send + Sync + 'static,
    {
        *lock(&self.shared.on_close) = Some(Arc::new(f));
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Dial the configured endpoint and start a session.
    pub async fn connect<D: Dialer>(&mut self, dialer: &D) -> Result<()> {
        self.ensure_idle()?;
        self.config.validate()?;
        let transport = dialer
            .dial(&self.config.url)
            .instrument(self.config.span.clone())
            .await?;
        self.start(transport).await
    }

    /// Start a session over an already open transport.
    pub async fn connect_with<T: Transport>(&mut self, transport: T) -> Result<()> {
        self.ensure_idle()?;
        self.config.validate()?;
        self.start(transport).await
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Idle => Ok(()),
            state => Err(LiveError::AlreadyConnected { state }),
        }
    }

    async fn start<T: Transport>(&mut self, transport: T) -> Result<()> {
        if let Some(tasks) = self.tasks.take() {
            tasks.read.abort();
            tasks.dispatch.abort();
        }

        let span = self.config.span.clone();
        let (sink, source) = transport.split();
        let mut writer = FrameWriter::new(sink);

        self.shared.state.send_replace(ConnectionState::AwaitingAuth);
        let auth = Bytes::from(self.config.auth_body.clone().into_bytes());
        if let Err(err) = writer.send(Operation::Auth, auth).instrument(span.clone()).await {
            writer.close().await;
            self.shared.state.send_replace(ConnectionState::Idle);
            return Err(err);
        }
        debug!(parent: &span, "auth sent");

        let cancel = CancellationToken::new();
        *lock(&self.shared.cancel) = Some(cancel.clone());

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let read = tokio::spawn(
            read_loop(source, frames_tx, cancel.clone(), self.shared.clone())
                .instrument(span.clone()),
        );
        let router = Router::new(self.shared.state.clone(), self.handler.clone());
        let dispatch = tokio::spawn(
            dispatch_loop(
                writer,
                frames_rx,
                router,
                self.config.heartbeat_interval,
                cancel,
                self.shared.clone(),
            )
            .instrument(span),
        );
        self.tasks = Some(Tasks { read, dispatch });
        Ok(())
    }

    /// Close the connection. Idempotent.
    ///
    /// The close notification fires with `None` if the session was still
    /// running. Returns once the transport is closed and the loops have
    /// stopped.
    pub async fn close(&mut self) {
        self.shared.teardown(None);
        let Some(tasks) = self.tasks.take() else {
            return;
        };

        if let Err(err) = tasks.dispatch.await {
            warn!(parent: &self.config.span, error = %err, "dispatch loop failed");
        }
        let mut read = tasks.read;
        if time::timeout(self.config.close_grace, &mut read).await.is_err() {
            debug!(parent: &self.config.span, "read loop outlived close grace, aborting");
            read.abort();
        }
    }
}

impl fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConnection")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.shared.teardown(None);
        if let Some(tasks) = self.tasks.take() {
            tasks.read.abort();
        }
    }
}

async fn read_loop<S: FrameSource>(
    mut source: S,
    frames: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) {
    let mut backoff = INITIAL_READ_BACKOFF;
    loop {
        match source.recv().await {
            Ok(data) => {
                backoff = INITIAL_READ_BACKOFF;
                match decode_frame(&data) {
                    Ok(frame) => {
                        trace!(
                            operation = frame.operation.name(),
                            sequence = frame.sequence,
                            len = frame.body.len(),
                            "frame received"
                        );
                        if frames.send(frame).is_err() {
                            debug!("dispatch loop gone, stopping read loop");
                            return;
                        }
                    }
                    Err(err) => warn!(error = %err, len = data.len(), "skipping malformed frame"),
                }
            }
            Err(err) if err.is_closed() => {
                debug!(error = %err, "transport closed, stopping read loop");
                shared.teardown(Some(LiveError::Transport(err)));
                return;
            }
            Err(err) => {
                if cancel.is_cancelled() {
                    return;
                }
                warn!(error = %err, retry_in = ?backoff, "read failed");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_READ_BACKOFF);
            }
        }
    }
}

async fn dispatch_loop<S: FrameSink>(
    mut writer: FrameWriter<S>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    router: Router,
    period: Duration,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) {
    let mut heartbeat = time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = heartbeat.tick() => {
                let state = *shared.state.borrow();
                if state != ConnectionState::Active {
                    continue;
                }
                if let Err(err) = writer.send(Operation::Heartbeat, Bytes::new()).await {
                    warn!(error = %err, "heartbeat send failed");
                }
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if let Err(err) = router.route(&frame) {
                    warn!(
                        operation = frame.operation.name(),
                        error = %err,
                        "frame handling failed"
                    );
                    if err.is_fatal() {
                        shared.teardown(Some(err));
                    }
                }
            }
        }
    }

    writer.close().await;
    debug!("dispatch loop stopped");
}
