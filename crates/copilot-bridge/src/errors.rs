use serde_json::{json, Value};
use thiserror::Error;

/// HTTP status used when the agent backend cannot give a usable answer.
pub const BAD_GATEWAY: u16 = 502;
const BAD_REQUEST: u16 = 400;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Agent backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The backend answered with a non-success status. `body` holds the
    /// upstream error document when it was valid JSON.
    #[error("Agent backend returned status {status}")]
    Upstream { status: u16, body: Option<Value> },

    #[error("Agent stream failed: {0}")]
    Stream(String),
}

impl BridgeError {
    /// Status code the client should see for this failure.
    pub fn status(&self) -> u16 {
        match self {
            BridgeError::InvalidRequest(_) | BridgeError::UnsupportedOperation(_) => BAD_REQUEST,
            BridgeError::Upstream {
                status,
                body: Some(_),
            } => *status,
            BridgeError::Upstream { body: None, .. }
            | BridgeError::BackendUnreachable(_)
            | BridgeError::Stream(_) => BAD_GATEWAY,
        }
    }

    /// JSON body the client should see for this failure.
    pub fn body(&self) -> Value {
        match self {
            BridgeError::Upstream {
                body: Some(body), ..
            } => body.clone(),
            BridgeError::Upstream { status, body: None } => json!({
                "error": "Agent backend request failed",
                "status": status,
            }),
            BridgeError::BackendUnreachable(_) => json!({
                "error": "Failed to reach agent backend",
            }),
            BridgeError::Stream(_) => json!({
                "error": "Agent backend stream failed",
            }),
            BridgeError::InvalidRequest(_) | BridgeError::UnsupportedOperation(_) => json!({
                "error": self.to_string(),
                "status": self.status(),
            }),
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::BackendUnreachable(err.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
