//! In-process transport.
//!
//! [`pair`] returns the client half as a [`MemoryTransport`] and the server
//! half as a [`MemoryPeer`] that drives it: pushing binary messages, closing
//! with a status, or injecting transient read errors. Closing the client sink
//! loops a close status back to the client source, like a server answering
//! the WebSocket close handshake.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{Dialer, FrameSink, FrameSource, Transport};
use crate::{CLIENT_CLOSE_REASON, NORMAL_CLOSURE};

enum Inbound {
    Binary(Bytes),
    Close { code: u16, reason: String },
    Error(String),
}

/// What the server side observes from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Binary(Bytes),
    Close { code: u16, reason: String },
}

/// Create a connected client/server pair.
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    let (to_client, from_server) = mpsc::unbounded_channel();
    let (to_server, from_client) = mpsc::unbounded_channel();

    let transport = MemoryTransport {
        sink: MemorySink {
            to_peer: Some(to_server),
            loopback: to_client.clone(),
        },
        source: MemorySource { rx: from_server },
    };
    let peer = MemoryPeer {
        tx: to_client,
        rx: from_client,
    };
    (transport, peer)
}

/// Client half of an in-process connection.
pub struct MemoryTransport {
    sink: MemorySink,
    source: MemorySource,
}

impl Transport for MemoryTransport {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (Self::Sink, Self::Source) {
        (self.sink, self.source)
    }
}

pub struct MemorySink {
    to_peer: Option<mpsc::UnboundedSender<PeerMessage>>,
    loopback: mpsc::UnboundedSender<Inbound>,
}

impl FrameSink for MemorySink {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        let Some(tx) = &self.to_peer else {
            return Err(TransportError::closed(None, "sink closed"));
        };
        tx.send(PeerMessage::Binary(message))
            .map_err(|_| TransportError::closed(None, "peer dropped"))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.to_peer.take() {
            let _ = tx.send(PeerMessage::Close {
                code: NORMAL_CLOSURE,
                reason: CLIENT_CLOSE_REASON.to_string(),
            });
            let _ = self.loopback.send(Inbound::Close {
                code: NORMAL_CLOSURE,
                reason: CLIENT_CLOSE_REASON.to_string(),
            });
        }
        Ok(())
    }
}

pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl FrameSource for MemorySource {
    async fn recv(&mut self) -> Result<Bytes> {
        match self.rx.recv().await {
            Some(Inbound::Binary(data)) => Ok(data),
            Some(Inbound::Close { code, reason }) => {
                self.rx.close();
                Err(TransportError::closed(Some(code), reason))
            }
            Some(Inbound::Error(message)) => Err(std::io::Error::other(message).into()),
            None => Err(TransportError::closed(None, "peer dropped")),
        }
    }
}

/// Server half of an in-process connection.
pub struct MemoryPeer {
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<PeerMessage>,
}

impl MemoryPeer {
    /// Deliver one binary message to the client. Returns false once the
    /// client source is gone.
    pub fn send(&self, message: impl Into<Bytes>) -> bool {
        self.tx.send(Inbound::Binary(message.into())).is_ok()
    }

    /// Close the connection with an explicit status.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.tx
            .send(Inbound::Close {
                code,
                reason: reason.into(),
            })
            .is_ok()
    }

    /// Make the client's next read fail with a transient I/O error.
    pub fn inject_error(&self, message: impl Into<String>) -> bool {
        self.tx.send(Inbound::Error(message.into())).is_ok()
    }

    /// Wait for the next message from the client.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.rx.recv().await
    }

    /// Take the next message from the client if one is already queued.
    pub fn try_recv(&mut self) -> Option<PeerMessage> {
        self.rx.try_recv().ok()
    }
}

/// Hands out [`MemoryTransport`]s and forwards each server half, with the
/// dialed URL, to the receiver returned by [`MemoryDialer::new`].
pub struct MemoryDialer {
    peers: mpsc::UnboundedSender<(String, MemoryPeer)>,
    refuse: bool,
}

impl MemoryDialer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, MemoryPeer)>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (
            Self {
                peers,
                refuse: false,
            },
            rx,
        )
    }

    /// A dialer whose every dial fails with `ConnectionRefused`.
    pub fn refusing() -> Self {
        let (peers, _) = mpsc::unbounded_channel();
        Self {
            peers,
            refuse: true,
        }
    }
}

impl Dialer for MemoryDialer {
    type Transport = MemoryTransport;

    async fn dial(&self, url: &str) -> Result<MemoryTransport> {
        if self.refuse {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("memory dialer refused {url}"),
            )
            .into());
        }
        let (transport, peer) = pair();
        let _ = self.peers.send((url.to_string(), peer));
        Ok(transport)
    }
}
