use std::net::AddrParseError;

use thiserror::Error;

const ENV_PREFIX: &str = "BRIDGE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        source: AddrParseError,
    },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration key,
/// e.g. `agent.url` -> `BRIDGE_AGENT__URL`
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.replace('.', "__").to_uppercase())
}
