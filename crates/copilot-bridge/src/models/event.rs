use serde::Deserialize;
use serde_json::Value;

/// An event streamed back by the agent backend during a run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    TextMessageStart {
        message_id: String,
        #[serde(default)]
        role: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageContent { message_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    TextMessageEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(default)]
        parent_message_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },
    /// Any event type the bridge does not aggregate (run lifecycle, state snapshots, ...)
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Interpret a decoded frame payload. Payloads that carry a known `type`
    /// but are missing required fields are dropped with a warning.
    pub fn from_value(payload: Value) -> Option<Self> {
        match serde_json::from_value(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Dropping malformed agent event: {}", e);
                None
            }
        }
    }
}
