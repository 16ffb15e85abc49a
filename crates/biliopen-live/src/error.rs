use biliopen_api::ApiError;
use biliopen_frame::Operation;
use biliopen_transport::TransportError;

use crate::state::ConnectionState;

/// Errors that can occur on a streaming connection.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// `connect` was called on a connection that is not idle.
    #[error("connection is {state}, expected idle")]
    AlreadyConnected { state: ConnectionState },

    /// A configured period is zero.
    #[error("{name} must be non-zero")]
    InvalidInterval { name: &'static str },

    /// Transport-level error. Fatal to the connection.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A frame arrived that the current state does not allow. Ignored.
    #[error("unexpected {} frame while {state}", .operation.name())]
    ProtocolViolation {
        operation: Operation,
        state: ConnectionState,
    },

    /// The server answered AUTH with a non-zero code. Fatal to the connection.
    #[error("auth rejected with code {code}")]
    AuthRejected { code: i64 },

    /// A JSON body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An application message arrived without its `data` object.
    #[error("{cmd} message carried no data")]
    MissingData { cmd: String },
}

impl LiveError {
    /// True for errors that end the connection when raised by a handler.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LiveError::AuthRejected { .. } | LiveError::Transport(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `connect` was called while a session is already owned.
    #[error("client state should be idle")]
    NotIdle,

    /// The control API client could not be built.
    #[error("control api setup failed: {0}")]
    Setup(#[source] ApiError),

    /// The session options cannot drive a connection.
    #[error("invalid session options: {0}")]
    InvalidOptions(#[source] LiveError),

    /// Starting the session through the control API failed.
    #[error("start session failed: {0}")]
    SessionBootstrapFailed(#[source] ApiError),

    /// The started session lists no streaming endpoint.
    #[error("session has no streaming endpoint")]
    NoEndpoint,

    /// Opening the streaming connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] LiveError),
}
