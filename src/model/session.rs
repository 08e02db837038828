use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// Token handed back on login. Clients send it verbatim in the `Authorization` header.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub session_token: String,
}

impl Session {
    pub fn new(session_token: [u8; 16]) -> Self {
        let base64_session_token = BASE64_STANDARD.encode(session_token);
        Self {
            session_token: base64_session_token,
        }
    }
}

/// The two facts the authorization gate reads from a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub identity: Option<String>,
    pub role: Option<String>,
}

impl SessionInfo {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(identity: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            role: Some(role.into()),
        }
    }
}
