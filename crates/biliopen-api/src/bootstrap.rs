use std::future::Future;

use crate::client::ApiClient;
use crate::error::Result;
use crate::model::SessionInfo;

/// Starts, keeps alive and ends streaming sessions.
///
/// [`ApiClient`] is the production implementation; the live client only
/// depends on this trait.
pub trait SessionBootstrap: Send + Sync + 'static {
    /// Exchange a streamer identity code for a session.
    fn start(&self, code: &str) -> impl Future<Output = Result<SessionInfo>> + Send;

    /// End a session started by [`SessionBootstrap::start`].
    fn end(&self, session: &SessionInfo) -> impl Future<Output = Result<()>> + Send;

    /// Keep a session alive.
    fn heartbeat(&self, session: &SessionInfo) -> impl Future<Output = Result<()>> + Send;
}

impl SessionBootstrap for ApiClient {
    async fn start(&self, code: &str) -> Result<SessionInfo> {
        self.app_start(code).await
    }

    async fn end(&self, session: &SessionInfo) -> Result<()> {
        self.app_end(&session.game_id).await
    }

    async fn heartbeat(&self, session: &SessionInfo) -> Result<()> {
        self.app_heartbeat(&session.game_id).await
    }
}
