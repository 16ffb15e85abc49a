//! Streaming connection and client facade for open-live events.
//!
//! This is the "just works" layer. [`Client`] starts a session through the
//! control API, opens a [`LiveConnection`] to the session's endpoint, and
//! hands every decoded [`LiveEvent`] to an [`EventHandler`].

pub mod client;
pub mod connection;
pub mod error;
pub mod event;
pub mod router;
pub mod state;

pub use client::{Client, ClientConfig, SessionOptions, DEFAULT_APP_HEARTBEAT_INTERVAL};
pub use connection::{
    CloseHandler, ConnectionConfig, LiveConnection, DEFAULT_CLOSE_GRACE, DEFAULT_HEARTBEAT_INTERVAL,
};
pub use error::{ClientError, LiveError, Result};
pub use event::{channel, ChannelHandler, Danmaku, DanmakuType, EventHandler, LiveEvent};
pub use router::{decode_event, AuthAck, CMD_DANMAKU};
pub use state::ConnectionState;
