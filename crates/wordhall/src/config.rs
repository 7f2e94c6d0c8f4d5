//! Configuration management for the wordhall server.
//!
//! This module handles loading, validation, and conversion of server
//! configuration from TOML files and command-line arguments.

use realm_hub::HubConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Application configuration loaded from a TOML file.
///
/// This is the main configuration structure that encompasses all server
/// settings including networking, the word-source provider, connection
/// authentication, and logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Word-source provider settings
    pub word_source: WordSourceSettings,
    /// Connection authentication settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, per-connection buffering, and keep-alive
/// timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Outbound frames queued per connection before it is dropped
    #[serde(default = "default_send_buffer_size")]
    pub send_buffer_size: usize,
    /// Maximum inbound message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Time allowed to write one frame to a peer, in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// Idle deadline between inbound frames, in seconds
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
}

fn default_send_buffer_size() -> usize {
    256
}

fn default_max_message_size() -> usize {
    512
}

fn default_write_timeout() -> u64 {
    10
}

fn default_pong_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            send_buffer_size: default_send_buffer_size(),
            max_message_size: default_max_message_size(),
            write_timeout_secs: default_write_timeout(),
            pong_timeout_secs: default_pong_timeout(),
        }
    }
}

/// Word-source provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSourceSettings {
    /// Base URL of the provider serving game options and word lists
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for WordSourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Connection authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Secret key for verifying connection tokens. The `SECRET_KEY`
    /// environment variable takes precedence when set, so the key can be
    /// kept out of the config file entirely.
    #[serde(default)]
    pub secret_key: Option<String>,
}

/// Logging system configuration.
///
/// Controls log output format and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, writing a default
    /// configuration to that path first if it does not exist yet.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            let config = Self::default();
            let toml_content = toml::to_string_pretty(&config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration at {}", path.display());
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&content)?)
    }

    /// Validates the merged configuration before anything binds or spawns.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "invalid bind address: {}",
                self.server.bind_address
            ));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!("invalid log level: {}", self.logging.level));
        }

        if self.word_source.base_url.is_empty() {
            return Err("word_source.base_url must be set".to_string());
        }
        if self.server.max_message_size == 0 {
            return Err("server.max_message_size must be positive".to_string());
        }
        if self.server.send_buffer_size == 0 {
            return Err("server.send_buffer_size must be positive".to_string());
        }

        Ok(())
    }

    /// The secret key used for connection tokens: the `SECRET_KEY`
    /// environment variable when set, the config file otherwise.
    pub fn resolved_secret_key(&self) -> Option<String> {
        std::env::var("SECRET_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                self.auth
                    .secret_key
                    .clone()
                    .filter(|key| !key.is_empty())
            })
    }

    /// Converts the application configuration into the hub's config.
    pub fn to_hub_config(&self) -> Result<HubConfig, String> {
        let bind_address = self
            .server
            .bind_address
            .parse()
            .map_err(|e| format!("invalid bind address: {e}"))?;
        let secret_key = self
            .resolved_secret_key()
            .ok_or("no secret key configured; set auth.secret_key or SECRET_KEY")?;

        Ok(HubConfig {
            bind_address,
            secret_key,
            send_buffer_size: self.server.send_buffer_size,
            max_message_size: self.server.max_message_size,
            write_timeout_secs: self.server.write_timeout_secs,
            pong_timeout_secs: self.server.pong_timeout_secs,
        })
    }
}
