use std::sync::Arc;

use copilot_bridge::backend::HttpAgentBackend;
use copilot_bridge::CopilotBridge;

use crate::configuration::Settings;
use crate::routes::proxy::RuntimeProxy;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bridge: CopilotBridge,
    pub proxy: RuntimeProxy,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(bridge: CopilotBridge, proxy: RuntimeProxy, max_body_bytes: usize) -> Self {
        Self {
            bridge,
            proxy,
            max_body_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = HttpAgentBackend::new(&settings.agent.url, settings.agent.timeout())?;
        tracing::info!("agent backend at {}", backend.endpoint());
        tracing::info!("forwarding other calls to {}", settings.runtime.url);

        Ok(Self::new(
            CopilotBridge::new(Arc::new(backend)),
            RuntimeProxy::new(&settings.runtime.url)?,
            settings.server.max_body_bytes,
        ))
    }
}
