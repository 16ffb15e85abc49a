use std::fmt;

/// Lifecycle of a [`LiveConnection`](crate::LiveConnection).
///
/// `Idle → AwaitingAuth → Active`, and back to `Idle` on close from any
/// state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Idle,
    /// The AUTH frame was sent; waiting for AUTH_ACK.
    AwaitingAuth,
    /// Authenticated; heartbeats are flowing.
    Active,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Idle => "idle",
            ConnectionState::AwaitingAuth => "awaiting-auth",
            ConnectionState::Active => "active",
        })
    }
}
