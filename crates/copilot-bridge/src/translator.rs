use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::{BridgeError, BridgeResult};
use crate::models::agent::{AgentMessage, AgentRequest, ContextEntry, ToolSpec};
use crate::models::graphql::{ChatMessage, FrontendInput, GenerateCopilotResponseData, GraphQlRequest};

const PAGE_URL_CONTEXT: &str = "Current page URL";
const APP_CONTEXT: &str = "Application context";

/// Source of thread and run identifiers for requests that arrive without them
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable identifiers: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicUsize,
}

impl SequentialIdGenerator {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicUsize::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Response to `availableAgents`. The bridge fronts a single backend and
/// advertises no named agents.
pub fn available_agents() -> Value {
    json!({
        "data": {
            "availableAgents": {
                "agents": []
            }
        }
    })
}

/// Response to `loadAgentState`. The bridge keeps no conversation state, so it
/// echoes the requested thread back with an empty history.
pub fn load_agent_state(request: &GraphQlRequest) -> Value {
    let data = request.data();
    let field = |name: &str| {
        data.and_then(|d| d.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    json!({
        "data": {
            "loadAgentState": {
                "threadId": field("threadId"),
                "agentName": field("agentName"),
                "messages": "[]"
            }
        }
    })
}

/// Convert a `generateCopilotResponse` call into the agent backend's run request
pub fn translate(request: &GraphQlRequest, ids: &dyn IdGenerator) -> BridgeResult<AgentRequest> {
    if !request.variables.as_ref().is_some_and(Value::is_object) {
        return Err(BridgeError::InvalidRequest(
            "variables must be a JSON object".to_string(),
        ));
    }

    let data = GenerateCopilotResponseData::from_value(request.data());

    Ok(AgentRequest {
        thread_id: resolve_id(data.thread_id.as_deref(), ids),
        run_id: resolve_id(data.run_id.as_deref(), ids),
        state: agent_state(&data.agent_states),
        messages: agent_messages(&data.messages),
        tools: tool_specs(&data.frontend.actions),
        context: context_entries(&data.frontend),
        forwarded_props: forwarded_props(Some(&data.forwarded_parameters), request.properties()),
    })
}

fn resolve_id(supplied: Option<&str>, ids: &dyn IdGenerator) -> String {
    match supplied {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ids.generate(),
    }
}

/// Map client conversation entries to agent messages, keeping their order.
/// Entries that are none of the known message kinds are skipped.
pub fn agent_messages(messages: &[Value]) -> Vec<AgentMessage> {
    messages
        .iter()
        .filter_map(|value| match ChatMessage::from_value(value) {
            Some(message) => Some(to_agent_message(message)),
            None => {
                tracing::debug!("Skipping unrecognized chat message: {}", value);
                None
            }
        })
        .collect()
}

fn to_agent_message(message: ChatMessage) -> AgentMessage {
    match message {
        ChatMessage::Text {
            id, role, content, ..
        } => AgentMessage::new(id, role, content),
        ChatMessage::ActionExecution { id, arguments, .. } => {
            AgentMessage::new(id.clone(), "tool", stringify(&arguments)).with_tool_call_id(id)
        }
        ChatMessage::Result {
            id,
            result,
            action_execution_id,
        } => AgentMessage::new(id, "tool", stringify(&result)).with_tool_call_id(action_execution_id),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map frontend action descriptors to tool specs. Actions without a name are dropped.
pub fn tool_specs(actions: &[Value]) -> Vec<ToolSpec> {
    actions.iter().filter_map(tool_spec).collect()
}

fn tool_spec(action: &Value) -> Option<ToolSpec> {
    let name = action
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;
    let description = action
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let schema = action.get("jsonSchema").or_else(|| action.get("parameters"));

    Some(ToolSpec::new(name, description, tool_parameters(name, schema)))
}

/// Tool schemas arrive either as JSON objects or as JSON encoded in a string.
/// Anything unusable becomes an empty schema.
fn tool_parameters(name: &str, schema: Option<&Value>) -> Value {
    match schema {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) if parsed.is_object() => parsed,
            Ok(_) => {
                tracing::warn!("Schema for tool {} is not an object, using empty schema", name);
                json!({})
            }
            Err(e) => {
                tracing::warn!("Failed to parse schema for tool {}: {}", name, e);
                json!({})
            }
        },
        Some(object @ Value::Object(_)) => object.clone(),
        _ => json!({}),
    }
}

fn context_entries(frontend: &FrontendInput) -> Vec<ContextEntry> {
    [
        (PAGE_URL_CONTEXT, frontend.url.as_ref()),
        (APP_CONTEXT, frontend.full_context.as_ref()),
    ]
    .into_iter()
    .filter_map(|(description, value)| {
        value.map(|value| ContextEntry {
            description: description.to_string(),
            value: value.clone(),
        })
    })
    .collect()
}

fn agent_state(agent_states: &[Value]) -> Value {
    if agent_states.is_empty() {
        json!({})
    } else {
        json!({ "agentStates": agent_states })
    }
}

/// Merge forwarded parameters and client properties into one object.
/// Properties win on key collisions; null values are left out.
fn forwarded_props(
    parameters: Option<&Map<String, Value>>,
    properties: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    parameters
        .into_iter()
        .chain(properties)
        .flat_map(|map| map.iter())
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
