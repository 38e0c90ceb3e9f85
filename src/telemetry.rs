//! Telemetry utilities.

/// Standardized span constructors for client observability.
pub mod spans {
    use tracing::{Span, info_span};

    use crate::config::ServerConfig;

    /// Create a span for per-network processing.
    pub fn network(name: &str) -> Span {
        info_span!("network", name = %name)
    }

    /// Create a span for a connection attempt to one server.
    pub fn session(server: &ServerConfig) -> Span {
        info_span!("session", server = %server)
    }
}
