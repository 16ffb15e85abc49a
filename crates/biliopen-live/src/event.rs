use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Kind of a danmaku message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum DanmakuType {
    #[default]
    Text,
    Sticker,
    Voice,
    Other(i64),
}

impl From<i64> for DanmakuType {
    fn from(value: i64) -> Self {
        match value {
            0 => DanmakuType::Text,
            1 => DanmakuType::Sticker,
            2 => DanmakuType::Voice,
            other => DanmakuType::Other(other),
        }
    }
}

impl From<DanmakuType> for i64 {
    fn from(value: DanmakuType) -> Self {
        match value {
            DanmakuType::Text => 0,
            DanmakuType::Sticker => 1,
            DanmakuType::Voice => 2,
            DanmakuType::Other(other) => other,
        }
    }
}

/// A chat message sent to the live room.
///
/// Fields missing from the payload keep their default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Danmaku {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub room_id: i64,

    /// Sender UID.
    pub uid: i64,
    /// Sender display name.
    pub uname: String,
    /// Sender avatar URL.
    pub uface: String,
    /// 1 when the sender is a room moderator.
    pub admin: i32,
    /// 1 when the sender holds a monthly membership.
    pub vip: i32,
    /// 1 when the sender holds a yearly membership.
    pub svip: i32,

    /// 1 for gift-triggered danmaku.
    pub msg_type: i32,
    pub dm_type: DanmakuType,

    pub msg: String,
    /// Message identifier, usable for de-duplication.
    pub msg_id: String,
    /// Sticker image URL when `dm_type` is [`DanmakuType::Sticker`].
    pub emoji_img_url: String,

    pub fans_medal_level: i32,
    pub fans_medal_name: String,
    pub fans_medal_wearing_status: bool,
}

impl Danmaku {
    pub fn is_admin(&self) -> bool {
        self.admin != 0
    }
}

/// An application event decoded from a MESSAGE_ACK frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LiveEvent {
    Danmaku(Danmaku),
}

/// Receives decoded events.
///
/// Called synchronously on the connection's dispatch loop: an implementation
/// that blocks delays heartbeats and every later frame.
pub trait EventHandler: Send + Sync + 'static {
    fn on_event(&self, event: LiveEvent);
}

impl<F> EventHandler for F
where
    F: Fn(LiveEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: LiveEvent) {
        self(event)
    }
}

/// Forwards events into a bounded channel. Events are dropped with a warning
/// while the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::Sender<LiveEvent>,
}

/// Create a [`ChannelHandler`] and the receiver it feeds.
pub fn channel(capacity: usize) -> (ChannelHandler, mpsc::Receiver<LiveEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelHandler { tx }, rx)
}

impl EventHandler for ChannelHandler {
    fn on_event(&self, event: LiveEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("event channel full, dropping event"),
            Err(TrySendError::Closed(_)) => debug!("event receiver dropped"),
        }
    }
}
