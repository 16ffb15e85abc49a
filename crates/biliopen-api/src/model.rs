use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codes::CommonErrorCode;
use crate::error::CommonError;

/// Envelope of every control API response.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonResponse<T> {
    #[serde(default)]
    pub code: CommonErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    pub data: Option<T>,
}

impl<T> CommonResponse<T> {
    /// `data` on success, the server's error otherwise.
    pub fn into_result(self) -> Result<Option<T>, CommonError> {
        if self.code.is_ok() {
            Ok(self.data)
        } else {
            Err(CommonError {
                code: self.code,
                message: self.message,
                request_id: self.request_id,
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppStartData {
    #[serde(default)]
    pub game_info: GameInfo,
    pub websocket_info: WebsocketInfo,
    #[serde(default)]
    pub anchor_info: AnchorInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GameInfo {
    #[serde(default)]
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WebsocketInfo {
    pub auth_body: String,
    #[serde(default)]
    pub wss_link: Vec<String>,
}

/// The streamer who owns the identity code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorInfo {
    #[serde(default)]
    pub room_id: i64,
    #[serde(default)]
    pub uname: String,
    #[serde(default)]
    pub uface: String,
    #[serde(default)]
    pub uid: i64,
}

/// A started streaming session: where to connect and how to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session identifier used to end and keep alive the session. Some apps
    /// are not assigned one; it is empty then.
    pub game_id: String,
    /// Opaque credential sent verbatim in the AUTH frame.
    pub auth_body: String,
    /// Streaming endpoints in preference order.
    pub wss_links: Vec<String>,
    pub anchor: AnchorInfo,
}

impl SessionInfo {
    /// The endpoint to connect to.
    pub fn endpoint(&self) -> Option<&str> {
        self.wss_links.first().map(String::as_str)
    }
}

impl From<AppStartData> for SessionInfo {
    fn from(data: AppStartData) -> Self {
        Self {
            game_id: data.game_info.game_id,
            auth_body: data.websocket_info.auth_body,
            wss_links: data.websocket_info.wss_link,
            anchor: data.anchor_info,
        }
    }
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("game_id", &self.game_id)
            .field(
                "auth_body",
                &format_args!("<redacted:{} bytes>", self.auth_body.len()),
            )
            .field("wss_links", &self.wss_links)
            .field("anchor", &self.anchor)
            .finish()
    }
}
