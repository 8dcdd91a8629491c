use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The body posted to the agent backend to start a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub thread_id: String,
    pub run_id: String,
    pub state: Value,
    pub messages: Vec<AgentMessage>,
    pub tools: Vec<ToolSpec>,
    pub context: Vec<ContextEntry>,
    pub forwarded_props: Map<String, Value>,
}

/// A flattened conversation message as the agent backend understands it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
}

impl AgentMessage {
    pub fn new<I, R, C>(id: I, role: R, content: C) -> Self
    where
        I: Into<String>,
        R: Into<String>,
        C: Into<String>,
    {
        Self {
            id: id.into(),
            role: role.into(),
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn with_tool_call_id<S: Into<String>>(mut self, tool_call_id: S) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }
}

/// A tool the agent may call, described by a JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSpec {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub description: String,
    pub value: String,
}
