//! Message transport abstraction.
//!
//! A transport moves whole binary messages, one frame per message:
//! - WebSocket over TLS to the live streaming endpoint
//! - An in-process duplex for tests and embedders
//!
//! This is the lowest layer of biliopen. The streaming connection is written
//! against the [`Transport`] and [`Dialer`] traits provided here.

pub mod error;
pub mod memory;
pub mod traits;
pub mod websocket;

pub use error::{Result, TransportError};
pub use memory::{pair, MemoryDialer, MemoryPeer, MemoryTransport, PeerMessage};
pub use traits::{Dialer, FrameSink, FrameSource, Transport};
pub use websocket::{WebSocketDialer, WebSocketTransport, DEFAULT_USER_AGENT};

/// Close code sent on caller-initiated close.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close reason sent on caller-initiated close.
pub const CLIENT_CLOSE_REASON: &str = "client close";
