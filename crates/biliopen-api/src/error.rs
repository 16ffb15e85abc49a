use crate::codes::CommonErrorCode;

/// Error reported by the control API in a well-formed response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}, request_id={request_id}")]
pub struct CommonError {
    pub code: CommonErrorCode,
    pub message: String,
    pub request_id: String,
}

/// Errors that can occur calling the control API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request could not be built or sent.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-200 status.
    #[error("http response is not ok: status code {0}")]
    Status(u16),

    /// The request or response body is not the expected JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server rejected the call.
    #[error("api error: {0}")]
    Api(#[from] CommonError),

    /// The app secret was refused as an HMAC key.
    #[error("app secret is not a valid signing key")]
    InvalidKey,

    /// A successful response carried no `data` object.
    #[error("response to {0} carried no data")]
    MissingData(&'static str),
}

pub type Result<T> = std::result::Result<T, ApiError>;
