//! Error types for the client core.
//!
//! Nothing in this crate is fatal: configuration problems are returned to the
//! caller, and transport failures are absorbed by the reconnect path. These
//! types describe what the caller can observe.

use thiserror::Error;

/// Failures reported by a protocol engine or its connector.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("failed to send {command}: {reason}")]
    Send { command: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`Network`](crate::Network) operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The configuration lists no servers to connect to.
    #[error("network '{0}' has no servers configured")]
    NoServers(String),

    /// A command was issued while no session is active.
    #[error("network '{0}' is not connected")]
    NotConnected(String),

    #[error("protocol engine error: {0}")]
    Engine(#[from] EngineError),
}

impl NetworkError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoServers(_) => "no_servers",
            Self::NotConnected(_) => "not_connected",
            Self::Engine(_) => "engine_error",
        }
    }
}
