use std::collections::HashMap;

use crate::models::event::StreamEvent;

/// A text message being assembled from streamed deltas
#[derive(Debug, Clone, PartialEq)]
pub struct MessageAccumulator {
    pub id: String,
    pub role: String,
    pub parts: Vec<String>,
    pub finished: bool,
}

impl MessageAccumulator {
    pub fn content(&self) -> String {
        self.parts.concat()
    }
}

/// A tool call being assembled from streamed argument deltas
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub name: String,
    pub parent_message_id: Option<String>,
    pub parts: Vec<String>,
    pub finished: bool,
}

impl ToolCallAccumulator {
    pub fn arguments(&self) -> String {
        self.parts.concat()
    }
}

/// Entities keyed by id that remember the order in which they were created
#[derive(Debug, Clone)]
struct Ordered<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Ordered<T> {
    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn insert(&mut self, id: String, item: T) {
        self.index.insert(id, self.items.len());
        self.items.push(item);
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let i = *self.index.get(id)?;
        self.items.get_mut(i)
    }
}

/// Folds agent stream events into complete messages and tool calls.
///
/// Only a START event creates an entity. Deltas and END events for ids that were never
/// started, or that already ended, are ignored, as are event types the bridge does not
/// aggregate.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    messages: Ordered<MessageAccumulator>,
    tool_calls: Ordered<ToolCallAccumulator>,
}

/// The result of one aggregation pass, in creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub messages: Vec<MessageAccumulator>,
    pub tool_calls: Vec<ToolCallAccumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event
    pub fn apply(mut self, event: StreamEvent) -> Self {
        match event {
            StreamEvent::TextMessageStart { message_id, role } => {
                if self.messages.contains(&message_id) {
                    tracing::warn!("Ignoring repeated start for message {}", message_id);
                } else {
                    let accumulator = MessageAccumulator {
                        id: message_id.clone(),
                        role: role.unwrap_or_else(|| "assistant".to_string()),
                        parts: Vec::new(),
                        finished: false,
                    };
                    self.messages.insert(message_id, accumulator);
                }
            }
            StreamEvent::TextMessageContent { message_id, delta } => {
                match self.messages.get_mut(&message_id) {
                    Some(message) if !message.finished => message.parts.push(delta),
                    _ => tracing::debug!("Ignoring content for inactive message {}", message_id),
                }
            }
            StreamEvent::TextMessageEnd { message_id } => {
                match self.messages.get_mut(&message_id) {
                    Some(message) => message.finished = true,
                    None => tracing::debug!("Ignoring end for unknown message {}", message_id),
                }
            }
            StreamEvent::ToolCallStart {
                tool_call_id,
                tool_call_name,
                parent_message_id,
            } => {
                if self.tool_calls.contains(&tool_call_id) {
                    tracing::warn!("Ignoring repeated start for tool call {}", tool_call_id);
                } else {
                    let accumulator = ToolCallAccumulator {
                        id: tool_call_id.clone(),
                        name: tool_call_name,
                        parent_message_id,
                        parts: Vec::new(),
                        finished: false,
                    };
                    self.tool_calls.insert(tool_call_id, accumulator);
                }
            }
            StreamEvent::ToolCallArgs {
                tool_call_id,
                delta,
            } => match self.tool_calls.get_mut(&tool_call_id) {
                Some(call) if !call.finished => call.parts.push(delta),
                _ => tracing::debug!("Ignoring args for inactive tool call {}", tool_call_id),
            },
            StreamEvent::ToolCallEnd { tool_call_id } => {
                match self.tool_calls.get_mut(&tool_call_id) {
                    Some(call) => call.finished = true,
                    None => tracing::debug!("Ignoring end for unknown tool call {}", tool_call_id),
                }
            }
            StreamEvent::Unknown => {}
        }
        self
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            messages: self.messages.items,
            tool_calls: self.tool_calls.items,
        }
    }
}

/// Fold a complete event sequence in one pass
pub fn aggregate<I>(events: I) -> Aggregation
where
    I: IntoIterator<Item = StreamEvent>,
{
    events
        .into_iter()
        .fold(Aggregator::new(), Aggregator::apply)
        .finish()
}
