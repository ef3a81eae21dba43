//! Per-call authorization outcome.

use serde::{Deserialize, Serialize};

/// Reason message for a missing API id, missing token, or unparseable token.
pub const INVALID_TOKEN: &str = "Invalid token was provided";

/// Reason message for a token whose signature could not be verified.
pub const INVALID_KEYS: &str = "Invalid Keys";

/// Reason message for a verified token lacking the requested API id.
pub const NOT_SUBSCRIBED: &str = "You are not subscribed to this API";

/// Transient result of the authorization gate for one call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub authorized: bool,
    /// HTTP status to surface on failure; `0` when authorized.
    pub reason_code: u16,
    /// Human-readable failure text; empty when authorized.
    pub reason_message: String,
}

impl AuthOutcome {
    pub fn authorized() -> Self {
        Self {
            authorized: true,
            reason_code: 0,
            reason_message: String::new(),
        }
    }

    pub fn denied(reason_code: u16, reason_message: impl Into<String>) -> Self {
        Self {
            authorized: false,
            reason_code,
            reason_message: reason_message.into(),
        }
    }
}
