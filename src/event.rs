//! Normalized IRC events.
//!
//! A protocol engine reports traffic as either a named event or a numeric
//! reply ([`EngineEvent`]). The session turns both into [`IrcEvent`]s, which
//! is the only form the network state and listeners ever see.

use std::fmt;

/// Kind of a normalized event.
///
/// Events received from the engine and events synthesized by the session or
/// network share one closed set, so dispatch code is matched exhaustively.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Received from the engine ===
    Connect,
    Join,
    Part,
    Kick,
    Quit,
    Nick,
    Topic,
    Notice,
    Privmsg,
    Mode,
    Umode,
    Invite,
    CtcpRequest,
    CtcpReply,
    Action,
    Error,
    /// Raw numeric reply; the first parameter carries the code.
    Numeric,
    /// A named event this crate does not interpret.
    Unknown(String),

    // === Synthesized ===
    /// WHOIS finished: params are `(nick, "true"|"false")`.
    Whois,
    /// NAMES finished: params are the channel followed by every name.
    Names,
    /// The connection was lost and will be re-established.
    Disconnect,
}

impl EventKind {
    /// Wire-style name handed to listeners (e.g. `"JOIN"`).
    pub fn name(&self) -> &str {
        match self {
            Self::Connect => "CONNECT",
            Self::Join => "JOIN",
            Self::Part => "PART",
            Self::Kick => "KICK",
            Self::Quit => "QUIT",
            Self::Nick => "NICK",
            Self::Topic => "TOPIC",
            Self::Notice => "NOTICE",
            Self::Privmsg => "PRIVMSG",
            Self::Mode => "MODE",
            Self::Umode => "UMODE",
            Self::Invite => "INVITE",
            Self::CtcpRequest => "CTCP",
            Self::CtcpReply => "CTCP_REPLY",
            Self::Action => "ACTION",
            Self::Error => "ERROR",
            Self::Numeric => "NUMERIC",
            Self::Unknown(name) => name,
            Self::Whois => "WHOIS",
            Self::Names => "NAMES",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// Map an engine event name to its kind.
    ///
    /// `CHANNEL_NOTICE` is folded into `NOTICE`; unrecognized names are kept
    /// as [`EventKind::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "CONNECT" => Self::Connect,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "KICK" => Self::Kick,
            "QUIT" => Self::Quit,
            "NICK" => Self::Nick,
            "TOPIC" => Self::Topic,
            "NOTICE" | "CHANNEL_NOTICE" => Self::Notice,
            "PRIVMSG" | "CHANNEL" => Self::Privmsg,
            "MODE" => Self::Mode,
            "UMODE" => Self::Umode,
            "INVITE" => Self::Invite,
            "CTCP" | "CTCP_REQ" => Self::CtcpRequest,
            "CTCP_REPLY" | "CTCP_REP" => Self::CtcpReply,
            "ACTION" | "CTCP_ACTION" => Self::Action,
            "ERROR" => Self::Error,
            "NUMERIC" => Self::Numeric,
            "WHOIS" => Self::Whois,
            "NAMES" => Self::Names,
            "DISCONNECT" => Self::Disconnect,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized event as delivered to the network and its listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrcEvent {
    pub kind: EventKind,
    /// Bare nickname or server name; empty for synthetic events.
    pub origin: String,
    pub params: Vec<String>,
}

impl IrcEvent {
    pub fn new(kind: EventKind, origin: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            params,
        }
    }

    /// Wire-style event name.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Traffic as reported by a protocol engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A named event such as `JOIN` or `ERROR`.
    Named {
        kind: EventKind,
        origin: String,
        params: Vec<String>,
    },
    /// A numeric reply with its arguments (the code is not repeated).
    Numeric {
        origin: String,
        code: u16,
        args: Vec<String>,
    },
}

impl EngineEvent {
    pub fn named(kind: EventKind, origin: impl Into<String>, params: &[&str]) -> Self {
        Self::Named {
            kind,
            origin: origin.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn numeric(origin: impl Into<String>, code: u16, args: &[&str]) -> Self {
        Self::Numeric {
            origin: origin.into(),
            code,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}
