use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use crate::errors::{BridgeError, BridgeResult};
use crate::models::agent::AgentRequest;

/// Path of the run endpoint on the agent backend
pub const AGENT_PATH: &str = "/agent";

/// Raw response body of an agent run
pub type ByteStream = BoxStream<'static, BridgeResult<Bytes>>;

/// A backend that runs an agent and streams its events back
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Start a run. Resolves once the response headers arrived; the body is
    /// streamed afterwards.
    async fn run(&self, request: &AgentRequest) -> BridgeResult<ByteStream>;
}

/// Agent backend reached over HTTP
pub struct HttpAgentBackend {
    client: Client,
    endpoint: String,
}

impl HttpAgentBackend {
    pub fn new(base_url: &str, timeout: Duration) -> BridgeResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            BridgeError::BackendUnreachable(format!("failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), AGENT_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn run(&self, request: &AgentRequest) -> BridgeResult<ByteStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| BridgeError::Stream(e.to_string())));
            return Ok(body.boxed());
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).ok();
        tracing::error!("Agent backend returned {}: {}", status, text);

        Err(BridgeError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}
