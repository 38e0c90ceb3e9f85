//! Protocol engine boundary.
//!
//! Wire framing, socket I/O and TLS belong to a protocol engine. This crate
//! only talks to it through [`ProtocolEngine`]: it hands the engine
//! [`Command`]s, waits on its readiness, and drains normalized
//! [`EngineEvent`]s from it. A [`Connector`] builds one engine per
//! connection attempt.

use futures_util::future::LocalBoxFuture;

use crate::config::ServerConfig;
use crate::error::EngineError;
use crate::event::EngineEvent;

/// Outbound command requests understood by every engine.
///
/// Text carried by `PRIVMSG` and `NOTICE` is a single line; multi-line text is
/// split by the session before it gets here.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    /// `QUIT :reason`
    QUIT(String),
    /// `JOIN channel [key]`
    JOIN(String, Option<String>),
    /// `PART channel [reason]`
    PART(String, Option<String>),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `NOTICE target :text`
    NOTICE(String, String),
    /// CTCP `ACTION` (`/me`) to a target.
    CtcpAction(String, String),
    /// CTCP request to a target (e.g. `VERSION`).
    CtcpRequest(String, String),
    /// CTCP reply, sent as a NOTICE.
    CtcpReply(String, String),
    /// `WHOIS nick`
    WHOIS(String),
    /// `NAMES channel`
    NAMES(String),
    /// `PING token`, used for keepalive.
    PING(String),
}

impl Command {
    /// Command name for logging and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QUIT(_) => "QUIT",
            Self::JOIN(..) => "JOIN",
            Self::PART(..) => "PART",
            Self::PRIVMSG(..) => "PRIVMSG",
            Self::NOTICE(..) => "NOTICE",
            Self::CtcpAction(..) => "ACTION",
            Self::CtcpRequest(..) => "CTCP",
            Self::CtcpReply(..) => "CTCP_REPLY",
            Self::WHOIS(_) => "WHOIS",
            Self::NAMES(_) => "NAMES",
            Self::PING(_) => "PING",
        }
    }
}

/// TLS settings for a connection attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the server certificate chain.
    pub verify: bool,
}

/// Everything an engine needs to open and register a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub nickname: String,
    pub username: String,
    pub fullname: String,
    /// `None` for plaintext connections.
    pub tls: Option<TlsOptions>,
}

/// A connection to one IRC server.
///
/// Engines are driven from a single thread: the event loop awaits
/// [`readiness`](ProtocolEngine::readiness) and then calls
/// [`process`](ProtocolEngine::process), which must not block.
pub trait ProtocolEngine {
    /// Start connecting and registering. Completion is reported later as a
    /// `CONNECT` event; failure as an `ERROR` event.
    fn connect(&mut self, request: &ConnectRequest) -> Result<(), EngineError>;

    /// Queue a command for the server.
    fn send(&mut self, command: Command) -> Result<(), EngineError>;

    /// Resolves once [`process`](ProtocolEngine::process) has work to do.
    fn readiness(&self) -> LocalBoxFuture<'_, ()>;

    /// Perform pending I/O and append every event it produced, in order.
    fn process(&mut self, events: &mut Vec<EngineEvent>);
}

/// Builds a fresh engine for each connection attempt.
pub trait Connector {
    fn create(&mut self, server: &ServerConfig) -> Result<Box<dyn ProtocolEngine>, EngineError>;
}

impl<F> Connector for F
where
    F: FnMut(&ServerConfig) -> Result<Box<dyn ProtocolEngine>, EngineError>,
{
    fn create(&mut self, server: &ServerConfig) -> Result<Box<dyn ProtocolEngine>, EngineError> {
        self(server)
    }
}
