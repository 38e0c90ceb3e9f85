//! # slirc-client
//!
//! Connection management and session state for IRC clients.
//!
//! ## Features
//!
//! - Server selection by priority and undesirability score, with random
//!   tiebreaking between equally good servers
//! - Automatic failover on errors and keepalive timeouts
//! - Channel roster, topic and identified-user reconstruction with RFC 1459
//!   casemapping
//! - WHOIS and NAMES reply capture
//! - A cooperative event loop over any number of networks
//!
//! Wire framing, socket I/O and TLS are left to a protocol engine plugged in
//! through [`ProtocolEngine`] and [`Connector`].
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_client::{ClientConfig, validate};
//!
//! let config: ClientConfig = r#"
//! [[network]]
//! name = "libera"
//! nickname = "slirc"
//! autoconnect = true
//!
//! [[network.server]]
//! host = "irc.libera.chat"
//! port = 6697
//! tls = true
//! "#
//! .parse()
//! .expect("valid config");
//!
//! assert!(validate(&config).is_ok());
//! assert_eq!(config.networks[0].servers[0].identity(), "ircs://irc.libera.chat:6697");
//! ```
//!
//! Each [`NetworkConfig`] becomes a [`Network`]; [`connect_autoconnect`] and
//! [`run`] then drive them until every network has shut down.

pub mod casemap;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
mod event_loop;
pub mod network;
pub mod session;
pub mod telemetry;

pub use config::{ClientConfig, ConfigError, NetworkConfig, ServerConfig, ValidationError, validate};
pub use engine::{Command, ConnectRequest, Connector, ProtocolEngine, TlsOptions};
pub use error::{EngineError, NetworkError};
pub use event::{EngineEvent, EventKind, IrcEvent};
pub use event_loop::{POLL_TIMEOUT, connect_autoconnect, run, wait_for_readiness};
pub use network::{
    DisconnectReason, KEEPALIVE_INTERVAL, ListenerContext, Network, NetworkListener, NetworkState,
    RETRY_INTERVAL, Roster,
};
pub use session::{Lifecycle, Session};
