use std::sync::Arc;

use biliopen_frame::{Frame, Operation};
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{LiveError, Result};
use crate::event::{Danmaku, EventHandler, LiveEvent};
use crate::state::ConnectionState;

/// Command name of a chat message.
pub const CMD_DANMAKU: &str = "LIVE_OPEN_PLATFORM_DM";

/// Body of an AUTH_ACK frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AuthAck {
    pub code: i64,
}

#[derive(Deserialize)]
struct Envelope<'a> {
    cmd: String,
    #[serde(borrow, default)]
    data: Option<&'a RawValue>,
}

/// Decode the JSON body of a MESSAGE_ACK frame.
///
/// Returns `Ok(None)` for commands that have no event type.
pub fn decode_event(body: &[u8]) -> Result<Option<LiveEvent>> {
    let envelope: Envelope<'_> = serde_json::from_slice(body)?;
    match envelope.cmd.as_str() {
        CMD_DANMAKU => {
            let data = envelope.data.ok_or_else(|| LiveError::MissingData {
                cmd: CMD_DANMAKU.to_string(),
            })?;
            let danmaku: Danmaku = serde_json::from_str(data.get())?;
            Ok(Some(LiveEvent::Danmaku(danmaku)))
        }
        other => {
            warn!(cmd = other, "no handler for command");
            Ok(None)
        }
    }
}

/// Applies inbound frames to the connection state and the event handler.
pub(crate) struct Router {
    state: Arc<watch::Sender<ConnectionState>>,
    handler: Arc<dyn EventHandler>,
}

impl Router {
    pub(crate) fn new(
        state: Arc<watch::Sender<ConnectionState>>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self { state, handler }
    }

    pub(crate) fn route(&self, frame: &Frame) -> Result<()> {
        match frame.operation {
            Operation::AuthAck => self.on_auth_ack(frame),
            Operation::HeartbeatAck => {
                debug!(sequence = frame.sequence, "heartbeat acknowledged");
                Ok(())
            }
            Operation::MessageAck => self.on_message(frame),
            other => {
                warn!(operation = other.code(), "no handler for operation");
                Ok(())
            }
        }
    }

    fn on_auth_ack(&self, frame: &Frame) -> Result<()> {
        let state = *self.state.borrow();
        if state != ConnectionState::AwaitingAuth {
            return Err(LiveError::ProtocolViolation {
                operation: frame.operation,
                state,
            });
        }

        let ack: AuthAck = serde_json::from_slice(&frame.body)?;
        if ack.code != 0 {
            return Err(LiveError::AuthRejected { code: ack.code });
        }

        // Loses to a concurrent close, which resets to idle first.
        let promoted = self.state.send_if_modified(|current| {
            if *current == ConnectionState::AwaitingAuth {
                *current = ConnectionState::Active;
                true
            } else {
                false
            }
        });
        if promoted {
            info!("authenticated");
        }
        Ok(())
    }

    fn on_message(&self, frame: &Frame) -> Result<()> {
        if let Some(event) = decode_event(&frame.body)? {
            self.handler.on_event(event);
        }
        Ok(())
    }
}
