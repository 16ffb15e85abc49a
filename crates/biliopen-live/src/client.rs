use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use biliopen_api::{ApiClient, Credentials, SessionBootstrap, SessionInfo, API_HOST_RELEASE};
use biliopen_transport::{Dialer, WebSocketDialer};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn, Instrument, Span};

use crate::connection::{
    ConnectionConfig, LiveConnection, DEFAULT_CLOSE_GRACE, DEFAULT_HEARTBEAT_INTERVAL,
};
use crate::error::{ClientError, LiveError};
use crate::event::EventHandler;
use crate::state::ConnectionState;

/// Default period between control API heartbeats.
pub const DEFAULT_APP_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

type UserCloseHandler = Arc<dyn Fn(LiveError) + Send + Sync>;

/// Static configuration of a [`Client`] talking to the real control API.
#[derive(Clone)]
pub struct ClientConfig {
    /// Control API host, e.g. [`API_HOST_RELEASE`].
    pub api_host: String,
    pub app_key: String,
    pub app_secret: String,
    /// Project (app) ID registered on the open platform.
    pub project_id: i64,
    /// Period of the control API heartbeat; `None` disables it.
    pub app_heartbeat_interval: Option<Duration>,
    /// Period of streaming HEARTBEAT frames.
    pub heartbeat_interval: Duration,
    pub span: Span,
}

impl ClientConfig {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>, project_id: i64) -> Self {
        Self {
            api_host: API_HOST_RELEASE.to_string(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            project_id,
            app_heartbeat_interval: Some(DEFAULT_APP_HEARTBEAT_INTERVAL),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            span: tracing::info_span!("live_client", project_id),
        }
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
        self
    }

    pub fn with_app_heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.app_heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            app_heartbeat_interval: self.app_heartbeat_interval,
            heartbeat_interval: self.heartbeat_interval,
            close_grace: DEFAULT_CLOSE_GRACE,
            span: self.span.clone(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_host", &self.api_host)
            .field("app_key", &self.app_key)
            .field(
                "app_secret",
                &format_args!("<redacted:{} bytes>", self.app_secret.len()),
            )
            .field("project_id", &self.project_id)
            .field("app_heartbeat_interval", &self.app_heartbeat_interval)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish_non_exhaustive()
    }
}

/// Per-session timing and logging, independent of how sessions are started.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub app_heartbeat_interval: Option<Duration>,
    pub heartbeat_interval: Duration,
    pub close_grace: Duration,
    pub span: Span,
}

impl SessionOptions {
    /// Reject periods that cannot drive a timer.
    pub fn validate(&self) -> Result<(), LiveError> {
        if self.heartbeat_interval.is_zero() {
            return Err(LiveError::InvalidInterval {
                name: "heartbeat interval",
            });
        }
        if self.app_heartbeat_interval.is_some_and(|period| period.is_zero()) {
            return Err(LiveError::InvalidInterval {
                name: "app heartbeat interval",
            });
        }
        Ok(())
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            app_heartbeat_interval: Some(DEFAULT_APP_HEARTBEAT_INTERVAL),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            close_grace: DEFAULT_CLOSE_GRACE,
            span: Span::none(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Inner {
    // Bumped on every connect and disconnect so a stale teardown
    // notification cannot touch a newer session.
    generation: u64,
    session: Option<SessionInfo>,
    connection: Option<LiveConnection>,
    // Dropping the guard stops the project heartbeat, including when the
    // client itself is dropped.
    keepalive: Option<DropGuard>,
}

type ActiveState = Arc<Mutex<Option<watch::Receiver<ConnectionState>>>>;

/// Owns at most one session and its streaming connection.
///
/// `connect` and `disconnect` are serialized; concurrent callers wait for the
/// transition in progress.
pub struct Client<B: SessionBootstrap = ApiClient, D: Dialer = WebSocketDialer> {
    bootstrap: Arc<B>,
    dialer: D,
    handler: Arc<dyn EventHandler>,
    on_close: Option<UserCloseHandler>,
    options: SessionOptions,
    inner: Arc<tokio::sync::Mutex<Inner>>,
    active: ActiveState,
}

impl Client {
    /// Create a client for the control API described by `config`.
    pub fn new(config: ClientConfig, handler: impl EventHandler) -> Result<Self, ClientError> {
        let bootstrap = ApiClient::new(
            config.api_host.clone(),
            Credentials::new(config.app_key.clone(), config.app_secret.clone()),
            config.project_id,
        )
        .map_err(ClientError::Setup)?;
        Ok(Self::with_bootstrap(
            bootstrap,
            WebSocketDialer::default(),
            handler,
            config.session_options(),
        ))
    }
}

impl<B: SessionBootstrap, D: Dialer> Client<B, D> {
    pub fn with_bootstrap(
        bootstrap: B,
        dialer: D,
        handler: impl EventHandler,
        options: SessionOptions,
    ) -> Self {
        Self {
            bootstrap: Arc::new(bootstrap),
            dialer,
            handler: Arc::new(handler),
            on_close: None,
            options,
            inner: Arc::new(tokio::sync::Mutex::new(Inner::default())),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Called with the terminating error when the connection closes on its
    /// own. Not called for [`Client::disconnect`].
    pub fn with_close_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(LiveError) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Start a session for `code` and connect to its first endpoint.
    pub async fn connect(&self, code: &str) -> Result<(), ClientError> {
        let span = self.options.span.clone();
        self.options
            .validate()
            .map_err(ClientError::InvalidOptions)?;
        let mut inner = self.inner.lock().await;
        if inner.session.is_some() || inner.connection.is_some() {
            return Err(ClientError::NotIdle);
        }

        let session = self
            .bootstrap
            .start(code)
            .instrument(span.clone())
            .await
            .map_err(ClientError::SessionBootstrapFailed)?;
        let Some(url) = session.endpoint().map(str::to_string) else {
            warn!(parent: &span, game_id = %session.game_id, "session has no endpoint");
            self.end_session(&session).await;
            return Err(ClientError::NoEndpoint);
        };

        inner.generation += 1;
        let generation = inner.generation;

        let config = ConnectionConfig::new(url.clone(), session.auth_body.clone())
            .with_heartbeat_interval(self.options.heartbeat_interval)
            .with_close_grace(self.options.close_grace)
            .with_span(tracing::info_span!(parent: &span, "live_connection", url = %url));
        let mut connection = LiveConnection::new(config, self.handler.clone());

        let teardown = Teardown {
            inner: Arc::downgrade(&self.inner),
            bootstrap: self.bootstrap.clone(),
            on_close: self.on_close.clone(),
            active: self.active.clone(),
            span: span.clone(),
        };
        connection.on_close(move |reason| {
            // Caller-initiated closes are cleaned up by `disconnect`.
            let Some(err) = reason else { return };
            let teardown = teardown.clone();
            tokio::spawn(async move { teardown.run(generation, err).await });
        });

        if let Err(err) = connection.connect(&self.dialer).await {
            self.end_session(&session).await;
            return Err(ClientError::ConnectFailed(err));
        }

        *lock(&self.active) = Some(connection.subscribe());
        inner.keepalive = self.spawn_keepalive(&session);
        inner.session = Some(session);
        inner.connection = Some(connection);
        info!(parent: &span, "client connected");
        Ok(())
    }

    /// End the session and close the connection. Idempotent.
    ///
    /// A failing session end is logged, not returned.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        drop(inner.keepalive.take());
        *lock(&self.active) = None;

        if let Some(session) = inner.session.take() {
            self.end_session(&session).await;
        }
        if let Some(mut connection) = inner.connection.take() {
            connection.close().await;
            info!(parent: &self.options.span, "client disconnected");
        }
    }

    /// True while the owned connection is authenticated.
    pub fn is_active(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|state| *state.borrow() == ConnectionState::Active)
    }

    /// The session currently owned, if any.
    pub async fn session(&self) -> Option<SessionInfo> {
        self.inner.lock().await.session.clone()
    }

    async fn end_session(&self, session: &SessionInfo) {
        end_session(self.bootstrap.as_ref(), session, &self.options.span).await;
    }

    fn spawn_keepalive(&self, session: &SessionInfo) -> Option<DropGuard> {
        let period = self.options.app_heartbeat_interval?;
        if session.game_id.is_empty() {
            return None;
        }

        let token = CancellationToken::new();
        let cancel = token.clone();
        let bootstrap = self.bootstrap.clone();
        let session = session.clone();
        tokio::spawn(
            async move {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if let Err(err) = bootstrap.heartbeat(&session).await {
                                warn!(error = %err, "project heartbeat failed");
                            }
                        }
                    }
                }
                debug!("project heartbeat stopped");
            }
            .instrument(self.options.span.clone()),
        );
        Some(token.drop_guard())
    }
}

impl<B: SessionBootstrap, D: Dialer> fmt::Debug for Client<B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

async fn end_session<B: SessionBootstrap>(bootstrap: &B, session: &SessionInfo, span: &Span) {
    if let Err(err) = bootstrap.end(session).instrument(span.clone()).await {
        warn!(parent: span, game_id = %session.game_id, error = %err, "end session failed");
    }
}

/// Cleanup after a connection closed on its own.
struct Teardown<B> {
    inner: Weak<tokio::sync::Mutex<Inner>>,
    bootstrap: Arc<B>,
    on_close: Option<UserCloseHandler>,
    active: ActiveState,
    span: Span,
}

impl<B> Clone for Teardown<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            bootstrap: self.bootstrap.clone(),
            on_close: self.on_close.clone(),
            active: self.active.clone(),
            span: self.span.clone(),
        }
    }
}

impl<B: SessionBootstrap> Teardown<B> {
    async fn run(self, generation: u64, err: LiveError) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().await;
        if inner.generation != generation {
            debug!(parent: &self.span, "stale close notification");
            return;
        }

        drop(inner.keepalive.take());
        *lock(&self.active) = None;
        if let Some(mut connection) = inner.connection.take() {
            connection.close().await;
        }
        if let Some(session) = inner.session.take() {
            end_session(self.bootstrap.as_ref(), &session, &self.span).await;
        }
        drop(inner);

        if let Some(on_close) = &self.on_close {
            on_close(err);
        }
    }
}
