use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{Dialer, FrameSink, FrameSource, Transport};
use crate::CLIENT_CLOSE_REASON;

/// User agent announced during the WebSocket upgrade.
pub const DEFAULT_USER_AGENT: &str = concat!("biliopen-rs/", env!("CARGO_PKG_VERSION"));

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected WebSocket carrying one frame per binary message.
pub struct WebSocketTransport {
    stream: WsStream,
}

impl WebSocketTransport {
    /// Dial `url` (`ws://` or `wss://`) announcing `user_agent`.
    pub async fn connect(url: &str, user_agent: &str) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|err| TransportError::InvalidEndpoint {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        let agent =
            HeaderValue::from_str(user_agent).map_err(|err| TransportError::InvalidEndpoint {
                url: url.to_string(),
                reason: format!("invalid user agent: {err}"),
            })?;
        request.headers_mut().insert(USER_AGENT, agent);

        let (stream, response) =
            connect_async(request)
                .await
                .map_err(|err| TransportError::Dial {
                    url: url.to_string(),
                    source: Box::new(err),
                })?;
        debug!(url, status = %response.status(), "websocket connected");

        Ok(Self { stream })
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

impl Transport for WebSocketTransport {
    type Sink = WebSocketSink;
    type Source = WebSocketSource;

    fn split(self) -> (Self::Sink, Self::Source) {
        let (sink, stream) = self.stream.split();
        (WebSocketSink { inner: sink }, WebSocketSource { inner: stream })
    }
}

/// Write half of a [`WebSocketTransport`].
pub struct WebSocketSink {
    inner: SplitSink<WsStream, Message>,
}

impl FrameSink for WebSocketSink {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        self.inner
            .send(Message::Binary(message))
            .await
            .map_err(TransportError::from)
    }

    async fn close(&mut self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: CLIENT_CLOSE_REASON.into(),
        };
        match self.inner.send(Message::Close(Some(frame))).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Read half of a [`WebSocketTransport`].
pub struct WebSocketSource {
    inner: SplitStream<WsStream>,
}

impl FrameSource for WebSocketSource {
    async fn recv(&mut self) -> Result<Bytes> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Close(frame))) => {
                    return Err(match frame {
                        Some(frame) => TransportError::closed(
                            Some(u16::from(frame.code)),
                            frame.reason.to_string(),
                        ),
                        None => TransportError::closed(None, "closed without status"),
                    });
                }
                Some(Ok(other)) => {
                    trace!(len = other.len(), "skipping non-binary message");
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Err(TransportError::closed(None, "stream ended"));
                }
                Some(Err(err)) => return Err(err.into()),
            }
        }
    }
}

/// Dials [`WebSocketTransport`]s with a fixed user agent.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    user_agent: String,
}

impl WebSocketDialer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for WebSocketDialer {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl Dialer for WebSocketDialer {
    type Transport = WebSocketTransport;

    async fn dial(&self, url: &str) -> Result<WebSocketTransport> {
        WebSocketTransport::connect(url, &self.user_agent).await
    }
}
