use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::model::{AppStartData, CommonResponse, SessionInfo};
use crate::signing::{sign_request, Credentials, SignedHeaders};

/// Production control API host.
pub const API_HOST_RELEASE: &str = "https://live-open.biliapi.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PATH_APP_START: &str = "/v2/app/start";
const PATH_APP_END: &str = "/v2/app/end";
const PATH_APP_HEARTBEAT: &str = "/v2/app/heartbeat";

/// Signed HTTP client for the control API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    host: String,
    credentials: Credentials,
    project_id: i64,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `host`, e.g. [`API_HOST_RELEASE`].
    pub fn new(host: impl Into<String>, credentials: Credentials, project_id: i64) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            host: host.into(),
            credentials,
            project_id,
            http,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    /// Start a session for a streamer identity code (`/v2/app/start`).
    pub async fn app_start(&self, code: &str) -> Result<SessionInfo> {
        let data: Option<AppStartData> = self
            .call(PATH_APP_START, &json!({ "code": code, "app_id": self.project_id }))
            .await?;
        let session = SessionInfo::from(data.ok_or(ApiError::MissingData(PATH_APP_START))?);
        info!(
            game_id = %session.game_id,
            room_id = session.anchor.room_id,
            endpoints = session.wss_links.len(),
            "session started"
        );
        Ok(session)
    }

    /// End a session (`/v2/app/end`). Sessions without a game ID need no end
    /// call and succeed immediately.
    pub async fn app_end(&self, game_id: &str) -> Result<()> {
        if game_id.is_empty() {
            debug!("no game id, skipping app end");
            return Ok(());
        }
        self.call::<_, serde_json::Value>(
            PATH_APP_END,
            &json!({ "app_id": self.project_id, "game_id": game_id }),
        )
        .await?;
        info!(game_id, "session ended");
        Ok(())
    }

    /// Keep a session alive (`/v2/app/heartbeat`). Sessions without a game ID
    /// need no heartbeat and succeed immediately.
    pub async fn app_heartbeat(&self, game_id: &str) -> Result<()> {
        if game_id.is_empty() {
            return Ok(());
        }
        self.call::<_, serde_json::Value>(PATH_APP_HEARTBEAT, &json!({ "game_id": game_id }))
            .await?;
        debug!(game_id, "session heartbeat sent");
        Ok(())
    }

    /// Build a signed POST request without sending it.
    pub fn build_request(
        &self,
        path: &str,
        body: Vec<u8>,
        headers: &SignedHeaders,
    ) -> Result<reqwest::Request> {
        let url = format!("{}{}", self.host.trim_end_matches('/'), path);
        let mut builder = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        Ok(builder.body(body).build()?)
    }

    async fn call<Req, T>(&self, path: &'static str, req: &Req) -> Result<Option<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(req)?;
        let headers = sign_request(&self.credentials, Some(&body))?;
        let request = self.build_request(path, body, &headers)?;

        debug!(path, "calling control api");
        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        decode_response(status, &bytes)
    }
}

fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<Option<T>> {
    if status != 200 {
        return Err(ApiError::Status(status));
    }
    let rsp: CommonResponse<T> = serde_json::from_slice(body)?;
    Ok(rsp.into_result()?)
}
