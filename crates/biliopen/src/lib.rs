//! Bilibili open-live client.
//!
//! biliopen connects to the open-live streaming service and delivers chat
//! events from a streamer's room. A session is started through the signed
//! control API, then a WebSocket connection authenticates with the session's
//! credential and keeps itself alive with heartbeats.
//!
//! # Crate Structure
//!
//! - [`frame`]: Binary frame codec of the streaming protocol
//! - [`transport`]: Message transports (WebSocket, in-memory)
//! - [`api`]: Control API signing and session bootstrap
//! - [`live`]: Streaming connection, event routing and the [`live::Client`] facade

/// Re-export frame types.
pub mod frame {
    pub use biliopen_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use biliopen_transport::*;
}

/// Re-export control API types.
pub mod api {
    pub use biliopen_api::*;
}

/// Re-export streaming connection and client types.
pub mod live {
    pub use biliopen_live::*;
}
