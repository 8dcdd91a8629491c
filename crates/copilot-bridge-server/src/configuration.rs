use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|source| ConfigError::InvalidAddress { addr, source })
    }
}

/// Where the agent backend lives
#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AgentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where calls the bridge does not handle are forwarded to
#[derive(Debug, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub agent: AgentSettings,
    pub runtime: RuntimeSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.max_body_bytes", default_max_body_bytes() as u64)?
            // Upstreams have no usable default, they must come from the environment
            .set_default("agent.url", "")?
            .set_default("agent.timeout_secs", default_timeout_secs())?
            .set_default("runtime.url", "")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })?;

        for (field, value) in [
            ("agent.url", &settings.agent.url),
            ("runtime.url", &settings.runtime.url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                });
            }
        }

        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_timeout_secs() -> u64 {
    600
}
