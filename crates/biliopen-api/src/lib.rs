//! Signed control API for the open-live platform.
//!
//! The control API exchanges a streamer's identity code for a streaming
//! endpoint and auth payload, keeps the session alive, and ends it. Every
//! request is signed with the app secret (see [`signing`]).

pub mod bootstrap;
pub mod client;
pub mod codes;
pub mod error;
pub mod model;
pub mod signing;

pub use bootstrap::SessionBootstrap;
pub use client::{ApiClient, API_HOST_RELEASE};
pub use codes::CommonErrorCode;
pub use error::{ApiError, CommonError, Result};
pub use model::{AnchorInfo, CommonResponse, SessionInfo};
pub use signing::{sign_request, Credentials, SignedHeaders};
