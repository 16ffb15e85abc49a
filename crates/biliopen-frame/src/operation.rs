//! Operation codes.
//!
//! Codes ending in `Ack` are sent by the server; the client only ever sends
//! [`Operation::Heartbeat`] and [`Operation::Auth`].

/// Frame operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Client keepalive.
    Heartbeat,
    /// Server reply to a heartbeat.
    HeartbeatAck,
    /// Server push carrying an application message envelope.
    MessageAck,
    /// Client authentication carrying the opaque auth payload.
    Auth,
    /// Server reply to authentication.
    AuthAck,
    /// Any code this client does not understand.
    Other(u32),
}

impl Operation {
    pub const HEARTBEAT: u32 = 2;
    pub const HEARTBEAT_ACK: u32 = 3;
    pub const MESSAGE_ACK: u32 = 5;
    pub const AUTH: u32 = 7;
    pub const AUTH_ACK: u32 = 8;

    /// Wire value of this operation.
    pub fn code(self) -> u32 {
        match self {
            Operation::Heartbeat => Self::HEARTBEAT,
            Operation::HeartbeatAck => Self::HEARTBEAT_ACK,
            Operation::MessageAck => Self::MESSAGE_ACK,
            Operation::Auth => Self::AUTH,
            Operation::AuthAck => Self::AUTH_ACK,
            Operation::Other(code) => code,
        }
    }

    /// Human-readable name, used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Heartbeat => "HEARTBEAT",
            Operation::HeartbeatAck => "HEARTBEAT_ACK",
            Operation::MessageAck => "MESSAGE_ACK",
            Operation::Auth => "AUTH",
            Operation::AuthAck => "AUTH_ACK",
            Operation::Other(_) => "UNKNOWN",
        }
    }
}

impl From<u32> for Operation {
    fn from(code: u32) -> Self {
        match code {
            Self::HEARTBEAT => Operation::Heartbeat,
            Self::HEARTBEAT_ACK => Operation::HeartbeatAck,
            Self::MESSAGE_ACK => Operation::MessageAck,
            Self::AUTH => Operation::Auth,
            Self::AUTH_ACK => Operation::AuthAck,
            other => Operation::Other(other),
        }
    }
}

impl From<Operation> for u32 {
    fn from(op: Operation) -> Self {
        op.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_both_ways() {
        for op in [
            Operation::Heartbeat,
            Operation::HeartbeatAck,
            Operation::MessageAck,
            Operation::Auth,
            Operation::AuthAck,
        ] {
            assert_eq!(Operation::from(op.code()), op);
        }
        assert_eq!(Operation::AuthAck.code(), 8);
        assert_eq!(Operation::Heartbeat.code(), 2);
    }

    #[test]
    fn unknown_code_is_preserved() {
        let op = Operation::from(42);
        assert_eq!(op, Operation::Other(42));
        assert_eq!(op.code(), 42);
        assert_eq!(op.name(), "UNKNOWN");
    }
}
