//! Core configuration types and loading.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
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

/// Top-level client configuration: one block per IRC network.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Networks to manage.
    #[serde(default, rename = "network")]
    pub networks: Vec<NetworkConfig>,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl FromStr for ClientConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Configuration for a single IRC network.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Short identifier (e.g., "libera").
    pub name: String,
    /// Human-readable name; falls back to `name` when empty.
    #[serde(default)]
    pub display_name: String,
    /// Nickname to register with.
    #[serde(default = "default_identity")]
    pub nickname: String,
    /// Username (ident).
    #[serde(default = "default_identity")]
    pub username: String,
    /// Real name / GECOS.
    #[serde(default = "default_identity")]
    pub fullname: String,
    /// Server password, if required.
    #[serde(default)]
    pub password: Option<String>,
    /// Candidate servers, in configuration order.
    #[serde(default, rename = "server")]
    pub servers: Vec<ServerConfig>,
    /// Connect when the client starts.
    #[serde(default)]
    pub autoconnect: bool,
    /// Seconds to wait for the first sign of life after connecting (0 disables).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Seconds to wait for any reply after a keepalive PING (0 disables).
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout: u64,
}

impl NetworkConfig {
    /// Create a configuration with default identity and timeouts.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            nickname: default_identity(),
            username: default_identity(),
            fullname: default_identity(),
            password: None,
            servers: Vec::new(),
            autoconnect: false,
            connect_timeout: default_connect_timeout(),
            pong_timeout: default_pong_timeout(),
        }
    }

    /// Name used in log lines and `Display` output.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout)
    }
}

/// A candidate server endpoint.
///
/// Two values with the same host, port and TLS flag are the same server:
/// see [`ServerConfig::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Hostname or address.
    pub host: String,
    /// Port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Preference; lower values are tried first (default: 5).
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Whether to use TLS.
    #[serde(default)]
    pub tls: bool,
    /// Whether to verify the remote certificate (only applies when tls = true).
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            priority: default_priority(),
            tls: false,
            tls_verify: true,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tls(mut self, verify: bool) -> Self {
        self.tls = true;
        self.tls_verify = verify;
        self
    }

    /// Stable identity used as the undesirability-score key.
    pub fn identity(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "ircs" } else { "irc" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

pub(super) fn default_true() -> bool {
    true
}

fn default_identity() -> String {
    "slirc".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_priority() -> u8 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pong_timeout() -> u64 {
    30
}
