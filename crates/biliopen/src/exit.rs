use std::fmt;

use biliopen_api::ApiError;
use biliopen_frame::FrameError;
use biliopen_live::{ClientError, LiveError};
use biliopen_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidEndpoint { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn api_error(context: &str, err: ApiError) -> CliError {
    match err {
        ApiError::Http(_) | ApiError::Status(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ApiError::Json(_) | ApiError::MissingData(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ApiError::Api(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        ApiError::InvalidKey => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn live_error(context: &str, err: LiveError) -> CliError {
    match err {
        LiveError::Transport(err) => transport_error(context, err),
        LiveError::Json(_) | LiveError::MissingData { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        LiveError::AuthRejected { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        LiveError::InvalidInterval { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Setup(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
        ClientError::SessionBootstrapFailed(err) => api_error(context, err),
        ClientError::ConnectFailed(err) | ClientError::InvalidOptions(err) => {
            live_error(context, err)
        }
        ClientError::NoEndpoint => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::NotIdle => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
