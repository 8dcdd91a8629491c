use serde::Deserialize;
use serde_json::{Map, Value};

/// The body of an inbound GraphQL call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

impl GraphQlRequest {
    /// Parse a GraphQL request out of an arbitrary JSON body.
    ///
    /// Returns `None` unless the body is an object carrying a string `query`
    /// or a string `operationName`.
    pub fn from_value(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let query = object.get("query").and_then(Value::as_str);
        let operation_name = object.get("operationName").and_then(Value::as_str);
        if query.is_none() && operation_name.is_none() {
            return None;
        }

        Some(Self {
            query: query.map(String::from),
            operation_name: operation_name.map(String::from),
            variables: object.get("variables").cloned(),
        })
    }

    /// The `variables.data` payload, when present
    pub fn data(&self) -> Option<&Value> {
        self.variables.as_ref().and_then(|v| v.get("data"))
    }

    /// The `variables.properties` object, when present
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.variables
            .as_ref()
            .and_then(|v| v.get("properties"))
            .and_then(Value::as_object)
    }
}

/// The `variables.data` payload of a `generateCopilotResponse` call.
///
/// Each field is read on its own. A field holding the wrong JSON type is treated
/// as absent, so one bad field never costs the rest of the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateCopilotResponseData {
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub messages: Vec<Value>,
    pub frontend: FrontendInput,
    pub agent_states: Vec<Value>,
    pub forwarded_parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontendInput {
    pub actions: Vec<Value>,
    pub url: Option<String>,
    pub full_context: Option<String>,
}

impl GenerateCopilotResponseData {
    /// Read the payload. An absent, null or non-object `data` reads as empty.
    pub fn from_value(data: Option<&Value>) -> Self {
        let data = match data {
            None | Some(Value::Null) => return Self::default(),
            Some(Value::Object(data)) => data,
            Some(other) => {
                tracing::warn!("Ignoring variables.data that is not an object: {}", other);
                return Self::default();
            }
        };

        Self {
            thread_id: string_field(data, "threadId"),
            run_id: string_field(data, "runId"),
            messages: array_field(data, "messages"),
            frontend: object_field(data, "frontend")
                .map(FrontendInput::from_object)
                .unwrap_or_default(),
            agent_states: array_field(data, "agentStates"),
            forwarded_parameters: object_field(data, "forwardedParameters")
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl FrontendInput {
    fn from_object(frontend: &Map<String, Value>) -> Self {
        Self {
            actions: array_field(frontend, "actions"),
            url: string_field(frontend, "url"),
            full_context: string_field(frontend, "toDeprecate_fullContext"),
        }
    }
}

/// Look up `key`, warning when it is present with a type `accept` rejects
fn typed_field<'a, T>(
    object: &'a Map<String, Value>,
    key: &str,
    accept: impl FnOnce(&'a Value) -> Option<T>,
) -> Option<T> {
    match object.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let field = accept(value);
            if field.is_none() {
                tracing::warn!("Ignoring field {} of unexpected type: {}", key, value);
            }
            field
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    typed_field(object, key, |v| v.as_str().map(String::from))
}

fn array_field(object: &Map<String, Value>, key: &str) -> Vec<Value> {
    typed_field(object, key, |v| v.as_array().cloned()).unwrap_or_default()
}

fn object_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    typed_field(object, key, Value::as_object)
}

/// One entry of the client's conversation history
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    Text {
        id: String,
        role: String,
        content: String,
        parent_message_id: Option<String>,
    },
    ActionExecution {
        id: String,
        name: Option<String>,
        arguments: Value,
        parent_message_id: Option<String>,
    },
    Result {
        id: String,
        result: Value,
        action_execution_id: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChatMessage {
    id: String,
    #[serde(default)]
    text_message: Option<RawTextMessage>,
    #[serde(default)]
    action_execution_message: Option<RawActionExecutionMessage>,
    #[serde(default)]
    result_message: Option<RawResultMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    parent_message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionExecutionMessage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    parent_message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResultMessage {
    action_execution_id: String,
    #[serde(default)]
    result: Value,
}

impl ChatMessage {
    /// Read a client message entry. Entries with none of the known variants
    /// populated, or without an id, yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let raw = RawChatMessage::deserialize(value).ok()?;

        if let Some(text) = raw.text_message {
            return Some(ChatMessage::Text {
                id: raw.id,
                role: text.role.unwrap_or_else(|| "user".to_string()),
                content: text.content.unwrap_or_default(),
                parent_message_id: text.parent_message_id,
            });
        }
        if let Some(action) = raw.action_execution_message {
            return Some(ChatMessage::ActionExecution {
                id: raw.id,
                name: action.name,
                arguments: action.arguments,
                parent_message_id: action.parent_message_id,
            });
        }
        raw.result_message.map(|result| ChatMessage::Result {
            id: raw.id,
            result: result.result,
            action_execution_id: result.action_execution_id,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            ChatMessage::Text { id, .. }
            | ChatMessage::ActionExecution { id, .. }
            | ChatMessage::Result { id, .. } => id,
        }
    }
}
