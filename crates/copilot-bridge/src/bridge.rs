use std::sync::Arc;

use chrono::Utc;
use futures::stream::StreamExt;
use serde_json::Value;

use crate::aggregator::{Aggregation, Aggregator};
use crate::assembler::assemble;
use crate::backend::{AgentBackend, ByteStream};
use crate::errors::BridgeResult;
use crate::models::event::StreamEvent;
use crate::models::graphql::GraphQlRequest;
use crate::operation::Operation;
use crate::sse::decode_events;
use crate::translator::{self, IdGenerator, UuidGenerator};

/// Answers the copilot operations the bridge recognizes, calling the agent
/// backend when an operation needs it.
///
/// Every call owns its own aggregation state; nothing is shared between calls.
#[derive(Clone)]
pub struct CopilotBridge {
    backend: Arc<dyn AgentBackend>,
    ids: Arc<dyn IdGenerator>,
}

impl CopilotBridge {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            backend,
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub async fn execute(
        &self,
        operation: Operation,
        request: &GraphQlRequest,
    ) -> BridgeResult<Value> {
        match operation {
            Operation::AvailableAgents => Ok(translator::available_agents()),
            Operation::LoadAgentState => Ok(translator::load_agent_state(request)),
            Operation::GenerateCopilotResponse => self.generate_copilot_response(request).await,
        }
    }

    /// Run the agent for a `generateCopilotResponse` call and wait for its complete reply.
    ///
    /// The upstream body is read inside this future. Dropping the future, as the
    /// server does when the client disconnects, stops the read.
    pub async fn generate_copilot_response(&self, request: &GraphQlRequest) -> BridgeResult<Value> {
        let agent_request = translator::translate(request, self.ids.as_ref())?;
        tracing::info!(
            thread_id = %agent_request.thread_id,
            run_id = %agent_request.run_id,
            messages = agent_request.messages.len(),
            tools = agent_request.tools.len(),
            "Starting agent run"
        );

        let mut guard = RunGuard::new(&agent_request.run_id);
        let outcome = match self.backend.run(&agent_request).await {
            Ok(body) => collect(body).await,
            Err(e) => Err(e),
        };
        guard.disarm();

        if let Err(e) = &outcome {
            tracing::error!(run_id = %agent_request.run_id, "Agent run failed: {}", e);
        }
        let aggregation = outcome?;
        tracing::info!(
            run_id = %agent_request.run_id,
            messages = aggregation.messages.len(),
            tool_calls = aggregation.tool_calls.len(),
            "Agent run finished"
        );

        Ok(assemble(
            &agent_request.thread_id,
            &agent_request.run_id,
            &aggregation,
            Utc::now(),
        ))
    }
}

async fn collect(body: ByteStream) -> BridgeResult<Aggregation> {
    let events = decode_events(body);
    futures::pin_mut!(events);

    let mut aggregator = Aggregator::new();
    while let Some(payload) = events.next().await {
        if let Some(event) = StreamEvent::from_value(payload?) {
            aggregator = aggregator.apply(event);
        }
    }
    Ok(aggregator.finish())
}

/// Logs runs whose future was dropped before the agent stream was consumed
struct RunGuard<'a> {
    run_id: &'a str,
    armed: bool,
}

impl<'a> RunGuard<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(run_id = %self.run_id, "Client went away, agent stream read cancelled");
        }
    }
}
