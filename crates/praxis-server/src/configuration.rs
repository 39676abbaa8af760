use crate::error::ConfigError;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionSettings {
    #[serde(default = "default_completion_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            host: default_completion_host(),
            model: default_model(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlatformSettings {
    #[serde(default = "default_key_endpoint")]
    pub key_endpoint: String,
    #[serde(default = "default_key_ttl_secs")]
    pub key_ttl_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            key_endpoint: default_key_endpoint(),
            key_ttl_secs: default_key_ttl_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub completion: CompletionSettings,
    #[serde(default)]
    pub platform: PlatformSettings,
}

impl Settings {
    /// Load settings from the environment, e.g. `PRAXIS_SERVER__PORT=8080`
    /// or `PRAXIS_COMPLETION__MODEL=gpt-4o-mini`.
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("PRAXIS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_completion_host() -> String {
    "https://api.githubcopilot.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_key_endpoint() -> String {
    "https://api.github.com/meta/public_keys/copilot_api".to_string()
}

fn default_key_ttl_secs() -> u64 {
    60 * 60
}
