//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listener and routing.
    pub server: ServerConfig,
    /// Per-connection timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Buffer limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Known hosts with their secrets and provisioned slaves.
    #[serde(default)]
    pub hosts: Vec<HostBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Host name to shared secret table, as consumed by the handshake verifier.
    pub fn host_secrets(&self) -> HashMap<String, String> {
        self.hosts
            .iter()
            .map(|h| (h.name.clone(), h.secret.clone()))
            .collect()
    }
}

/// Listener and routing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to (e.g., "0.0.0.0:8080").
    pub listen: SocketAddr,
    /// Node id (3 characters) prefixed to every session id.
    #[serde(default = "default_node")]
    pub node: String,
    /// Route serving the WebSocket upgrade.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Route serving the JSON status snapshot.
    #[serde(default = "default_status_path")]
    pub status_path: String,
}

/// Timeout configuration.
///
/// `handshake` bounds every read the handshake performs: the opening message
/// and, for users, the echo reply.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// Seconds to wait for each handshake message (default: 10).
    #[serde(default = "default_handshake_timeout")]
    pub handshake: u64,
}

impl TimeoutsConfig {
    pub fn handshake(&self) -> Duration {
        Duration::from_secs(self.handshake)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            handshake: default_handshake_timeout(),
        }
    }
}

/// Buffer limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Frames buffered per session before sends start failing (default: 32).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
        }
    }
}

/// A host allowed to authenticate, and the slaves provisioned under it.
#[derive(Debug, Clone, Deserialize)]
pub struct HostBlock {
    pub name: String,
    pub secret: String,
    /// Slave names; each must start with `name`.
    #[serde(default)]
    pub slaves: Vec<String>,
}

fn default_node() -> String {
    "001".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_status_path() -> String {
    "/status".to_string()
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_outbound_queue() -> usize {
    32
}
