use std::fmt;

use serde::{Deserialize, Serialize};

/// Request-level result code returned by the control API. `0` is success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommonErrorCode(pub i64);

impl CommonErrorCode {
    pub const OK: CommonErrorCode = CommonErrorCode(0);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Short description of the code.
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "ok",
            4000 => "invalid parameters",
            4001 => "invalid application",
            4002 => "signature mismatch",
            4003 => "request expired",
            4004 => "duplicate request",
            4005 => "invalid identity code",
            _ => "unknown error",
        }
    }
}

impl fmt::Display for CommonErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0, self.description())
    }
}
