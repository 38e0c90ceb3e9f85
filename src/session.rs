//! One connection attempt to one server.
//!
//! A [`Session`] owns the protocol engine for its server. It normalizes the
//! engine's events, runs the WHOIS and NAMES capture machines over numeric
//! replies, and reports everything upward through a [`SessionSink`]. It never
//! destroys itself: when the sink asks for teardown the session only records
//! [`Lifecycle::PendingTeardown`] and stops forwarding, and the owning network
//! drops it on its next tick.

use std::fmt;
use std::mem;

use futures_util::future::LocalBoxFuture;
use tracing::{debug, info, warn};

use crate::config::{NetworkConfig, ServerConfig};
use crate::engine::{Command, ConnectRequest, ProtocolEngine, TlsOptions};
use crate::error::EngineError;
use crate::event::{EngineEvent, EventKind, IrcEvent};
use crate::network::DisconnectReason;

/// Numeric replies the session interprets.
pub mod numeric {
    pub const RPL_WHOISREGNICK: u16 = 307;
    pub const RPL_WHOISUSER: u16 = 311;
    pub const RPL_ENDOFWHOIS: u16 = 318;
    pub const RPL_WHOISACCOUNT: u16 = 330;
    pub const RPL_TOPIC: u16 = 332;
    pub const RPL_NAMREPLY: u16 = 353;
    pub const RPL_ENDOFNAMES: u16 = 366;
}

/// Membership prefixes stripped from NAMES entries.
const MEMBERSHIP_PREFIXES: &[char] = &['@', '~', '+', '%', '&', '!'];

/// Whether a session may keep forwarding events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    /// The connection failed; the owner must drop this session before the
    /// next reconnect.
    PendingTeardown,
}

/// What the sink wants after handling an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Teardown,
}

/// Upward interface a session reports into.
pub trait SessionSink {
    /// Handle one normalized event from `server`.
    fn on_event(&mut self, server: &ServerConfig, event: IrcEvent) -> Flow;

    /// A WHOIS capture finished.
    fn whois_received(&mut self, origin: &str, nick: &str, identified: bool);

    /// A NAMES capture finished for `channel`.
    fn names_received(&mut self, channel: &str, names: &[String]);

    /// Commands queued while handling the last event.
    fn take_outbox(&mut self) -> Vec<Command>;
}

#[derive(Debug)]
struct WhoisCapture {
    nick: String,
    identified: bool,
}

/// An active (or failed, awaiting teardown) connection to one server.
pub struct Session {
    server: ServerConfig,
    engine: Box<dyn ProtocolEngine>,
    whois: Option<WhoisCapture>,
    names: Vec<String>,
    lifecycle: Lifecycle,
}

impl Session {
    pub fn new(server: ServerConfig, engine: Box<dyn ProtocolEngine>) -> Self {
        Self {
            server,
            engine,
            whois: None,
            names: Vec::new(),
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_pending_teardown(&self) -> bool {
        self.lifecycle == Lifecycle::PendingTeardown
    }

    /// Ask the engine to connect using the network's identity.
    pub fn connect(&mut self, config: &NetworkConfig) -> Result<(), EngineError> {
        info!(session = %self, nick = %config.nickname, "Connecting to server");
        let request = ConnectRequest {
            host: self.server.host.clone(),
            port: self.server.port,
            password: config.password.clone().filter(|p| !p.is_empty()),
            nickname: config.nickname.clone(),
            username: config.username.clone(),
            fullname: config.fullname.clone(),
            tls: self.server.tls.then_some(TlsOptions {
                verify: self.server.tls_verify,
            }),
        };
        self.engine.connect(&request)
    }

    /// Send QUIT with the human-readable text for `reason`.
    pub fn disconnect(&mut self, reason: DisconnectReason) {
        if self.is_pending_teardown() {
            debug!(session = %self, "Skipping QUIT on failed connection");
            return;
        }
        if let Err(e) = self.quit(reason.message()) {
            warn!(session = %self, error = %e, "Failed to send QUIT");
        }
    }

    pub fn send(&mut self, command: Command) -> Result<(), EngineError> {
        self.engine.send(command)
    }

    pub fn quit(&mut self, reason: &str) -> Result<(), EngineError> {
        self.send(Command::QUIT(reason.to_string()))
    }

    pub fn join(&mut self, channel: &str, key: Option<&str>) -> Result<(), EngineError> {
        self.send(Command::JOIN(channel.to_string(), key.map(str::to_string)))
    }

    pub fn part(&mut self, channel: &str, reason: Option<&str>) -> Result<(), EngineError> {
        self.send(Command::PART(
            channel.to_string(),
            reason.map(str::to_string),
        ))
    }

    /// Send `text` as one PRIVMSG per non-empty line.
    pub fn message(&mut self, target: &str, text: &str) -> Result<(), EngineError> {
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.send(Command::PRIVMSG(target.to_string(), line.to_string()))?;
        }
        Ok(())
    }

    /// Send `text` as one NOTICE per non-empty line.
    pub fn notice(&mut self, target: &str, text: &str) -> Result<(), EngineError> {
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.send(Command::NOTICE(target.to_string(), line.to_string()))?;
        }
        Ok(())
    }

    pub fn action(&mut self, target: &str, text: &str) -> Result<(), EngineError> {
        self.send(Command::CtcpAction(target.to_string(), text.to_string()))
    }

    pub fn ctcp_request(&mut self, target: &str, text: &str) -> Result<(), EngineError> {
        self.send(Command::CtcpRequest(target.to_string(), text.to_string()))
    }

    pub fn ctcp_reply(&mut self, target: &str, text: &str) -> Result<(), EngineError> {
        self.send(Command::CtcpReply(target.to_string(), text.to_string()))
    }

    pub fn whois(&mut self, nick: &str) -> Result<(), EngineError> {
        self.send(Command::WHOIS(nick.to_string()))
    }

    pub fn names(&mut self, channel: &str) -> Result<(), EngineError> {
        self.send(Command::NAMES(channel.to_string()))
    }

    pub fn ping(&mut self) -> Result<(), EngineError> {
        self.send(Command::PING(self.server.host.clone()))
    }

    pub fn readiness(&self) -> LocalBoxFuture<'_, ()> {
        self.engine.readiness()
    }

    /// Drain the engine and report every event to `sink`, in order.
    ///
    /// Stops early once the sink requests teardown; the remaining events of
    /// the batch belong to a dead connection.
    pub fn process<S: SessionSink>(&mut self, sink: &mut S) {
        if self.is_pending_teardown() {
            return;
        }

        let mut batch = Vec::new();
        self.engine.process(&mut batch);

        let total = batch.len();
        for (handled, event) in batch.into_iter().enumerate() {
            match event {
                EngineEvent::Named {
                    kind,
                    origin,
                    params,
                } => self.on_named(sink, kind, &origin, params),
                EngineEvent::Numeric { origin, code, args } => {
                    self.on_numeric(sink, origin, code, args)
                }
            }

            if self.is_pending_teardown() {
                let dropped = total - handled - 1;
                if dropped > 0 {
                    debug!(session = %self, dropped, "Dropping events after connection failure");
                }
                break;
            }
        }
    }

    fn on_named<S: SessionSink>(
        &mut self,
        sink: &mut S,
        kind: EventKind,
        origin: &str,
        params: Vec<String>,
    ) {
        let origin = bare_nick(origin);
        match kind {
            EventKind::Connect => info!(session = %self, "Connected to server"),
            EventKind::Error => {
                warn!(session = %self, origin = %origin, reason = ?params.first(), "Error from protocol engine")
            }
            _ => {}
        }
        self.forward(sink, IrcEvent::new(kind, origin, params));
    }

    fn on_numeric<S: SessionSink>(
        &mut self,
        sink: &mut S,
        origin: String,
        code: u16,
        args: Vec<String>,
    ) {
        match code {
            numeric::RPL_WHOISUSER => match args.get(1) {
                Some(nick) => {
                    if let Some(open) = &self.whois {
                        warn!(
                            session = %self,
                            open = %open.nick,
                            nick = %nick,
                            "WHOIS reply started while another was open; restarting capture"
                        );
                    }
                    self.whois = Some(WhoisCapture {
                        nick: nick.clone(),
                        identified: false,
                    });
                }
                None => warn!(session = %self, code, "Too few arguments for numeric"),
            },
            numeric::RPL_WHOISREGNICK | numeric::RPL_WHOISACCOUNT => {
                if let Some(capture) = self.whois.as_mut() {
                    capture.identified = true;
                }
            }
            numeric::RPL_ENDOFWHOIS => {
                let finished = match self.whois.take() {
                    Some(capture) => Some((capture.nick, capture.identified)),
                    // 401 + 318 for an unknown nick never opens a capture
                    None => args.get(1).map(|nick| (nick.clone(), false)),
                };
                match finished {
                    Some((nick, identified)) => {
                        sink.whois_received(&origin, &nick, identified);
                        self.forward(
                            sink,
                            IrcEvent::new(
                                EventKind::Whois,
                                origin.clone(),
                                vec![nick, identified.to_string()],
                            ),
                        );
                    }
                    None => warn!(session = %self, code, "Too few arguments for numeric"),
                }
            }
            numeric::RPL_NAMREPLY => {
                if let Some(list) = args.last() {
                    self.names.extend(
                        list.split_whitespace()
                            .map(|name| name.trim_start_matches(MEMBERSHIP_PREFIXES))
                            .filter(|name| !name.is_empty())
                            .map(str::to_string),
                    );
                }
            }
            numeric::RPL_ENDOFNAMES => match args.get(1) {
                Some(channel) => {
                    let names = mem::take(&mut self.names);
                    sink.names_received(channel, &names);
                    let mut params = Vec::with_capacity(names.len() + 1);
                    params.push(channel.clone());
                    params.extend(names);
                    self.forward(sink, IrcEvent::new(EventKind::Names, origin.clone(), params));
                }
                None => warn!(session = %self, code, "Too few arguments for numeric"),
            },
            numeric::RPL_TOPIC => {
                if args.len() >= 3 {
                    self.forward(
                        sink,
                        IrcEvent::new(
                            EventKind::Topic,
                            origin.clone(),
                            vec![args[1].clone(), args[2].clone()],
                        ),
                    );
                } else {
                    warn!(session = %self, code, "Too few arguments for numeric");
                }
            }
            _ => {}
        }

        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(code.to_string());
        params.extend(args);
        self.forward(sink, IrcEvent::new(EventKind::Numeric, origin, params));
    }

    fn forward<S: SessionSink>(&mut self, sink: &mut S, event: IrcEvent) {
        if self.is_pending_teardown() {
            return;
        }

        if sink.on_event(&self.server, event) == Flow::Teardown {
            self.lifecycle = Lifecycle::PendingTeardown;
            return;
        }

        for command in sink.take_outbox() {
            let name = command.name();
            if let Err(e) = self.send(command) {
                warn!(session = %self, command = name, error = %e, "Failed to send queued command");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(session = %self, "Session destroyed");
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session[{}:{}]", self.server.host, self.server.port)
    }
}

/// Strip a `!user@host` suffix from an event origin.
fn bare_nick(origin: &str) -> &str {
    origin.split_once('!').map_or(origin, |(nick, _)| nick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Wire {
        inbound: Vec<EngineEvent>,
        sent: Vec<Command>,
    }

    struct ScriptedEngine(Rc<RefCell<Wire>>);

    impl ProtocolEngine for ScriptedEngine {
        fn connect(&mut self, _request: &ConnectRequest) -> Result<(), EngineError> {
            Ok(())
        }

        fn send(&mut self, command: Command) -> Result<(), EngineError> {
            self.0.borrow_mut().sent.push(command);
            Ok(())
        }

        fn readiness(&self) -> LocalBoxFuture<'_, ()> {
            futures_util::future::ready(()).boxed_local()
        }

        fn process(&mut self, events: &mut Vec<EngineEvent>) {
            events.append(&mut self.0.borrow_mut().inbound);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<IrcEvent>,
        whois: Vec<(String, bool)>,
        names: Vec<(String, Vec<String>)>,
        outbox: Vec<Command>,
        teardown_on: Option<EventKind>,
    }

    impl SessionSink for RecordingSink {
        fn on_event(&mut self, _server: &ServerConfig, event: IrcEvent) -> Flow {
            let teardown = self.teardown_on.as_ref() == Some(&event.kind);
            if event.kind == EventKind::Privmsg {
                self.outbox
                    .push(Command::PRIVMSG(event.origin.clone(), "pong".to_string()));
            }
            self.events.push(event);
            if teardown { Flow::Teardown } else { Flow::Continue }
        }

        fn whois_received(&mut self, _origin: &str, nick: &str, identified: bool) {
            self.whois.push((nick.to_string(), identified));
        }

        fn names_received(&mut self, channel: &str, names: &[String]) {
            self.names.push((channel.to_string(), names.to_vec()));
        }

        fn take_outbox(&mut self) -> Vec<Command> {
            mem::take(&mut self.outbox)
        }
    }

    fn session(inbound: Vec<EngineEvent>) -> (Session, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire {
            inbound,
            sent: Vec::new(),
        }));
        let session = Session::new(
            ServerConfig::new("irc.example.net", 6667),
            Box::new(ScriptedEngine(wire.clone())),
        );
        (session, wire)
    }

    fn kinds(sink: &RecordingSink) -> Vec<&str> {
        sink.events.iter().map(IrcEvent::name).collect()
    }

    #[test]
    fn test_whois_capture_reports_identified() {
        let (mut session, _) = session(vec![
            EngineEvent::numeric("srv", 311, &["me", "Alice", "alice", "host", "*", "Alice A"]),
            EngineEvent::numeric("srv", 330, &["me", "Alice", "alice", "is logged in as"]),
            EngineEvent::numeric("srv", 318, &["me", "Alice", "End of /WHOIS list."]),
        ]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(sink.whois, vec![("Alice".to_string(), true)]);
        assert_eq!(kinds(&sink), ["NUMERIC", "NUMERIC", "WHOIS", "NUMERIC"]);
        let whois = &sink.events[2];
        assert_eq!(whois.params, ["Alice", "true"]);
        assert_eq!(whois.origin, "srv");
        assert_eq!(sink.events[3].params[0], "318");
    }

    #[test]
    fn test_whois_end_without_start_reports_unidentified() {
        let (mut session, _) = session(vec![
            EngineEvent::numeric("srv", 401, &["me", "ghost", "No such nick"]),
            EngineEvent::numeric("srv", 318, &["me", "ghost", "End of /WHOIS list."]),
        ]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(sink.whois, vec![("ghost".to_string(), false)]);
        assert_eq!(sink.events[2].params, ["ghost", "false"]);
    }

    #[test]
    fn test_nested_whois_restarts_capture() {
        let (mut session, _) = session(vec![
            EngineEvent::numeric("srv", 311, &["me", "first"]),
            EngineEvent::numeric("srv", 307, &["me", "first", "has identified"]),
            EngineEvent::numeric("srv", 311, &["me", "second"]),
            EngineEvent::numeric("srv", 318, &["me", "second"]),
        ]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(sink.whois, vec![("second".to_string(), false)]);
    }

    #[test]
    fn test_names_capture_spans_multiple_replies() {
        let (mut session, _) = session(vec![
            EngineEvent::numeric("srv", 353, &["me", "=", "#rust", "@Alice +Bob"]),
            EngineEvent::numeric("srv", 353, &["me", "=", "#rust", "~%Carol !dave"]),
            EngineEvent::numeric("srv", 366, &["me", "#rust", "End of /NAMES list."]),
        ]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        let expected: Vec<String> = ["Alice", "Bob", "Carol", "dave"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sink.names, vec![("#rust".to_string(), expected.clone())]);
        let names = sink
            .events
            .iter()
            .find(|e| e.kind == EventKind::Names)
            .unwrap();
        assert_eq!(names.params[0], "#rust");
        assert_eq!(&names.params[1..], &expected[..]);
        assert_eq!(kinds(&sink), ["NUMERIC", "NUMERIC", "NAMES", "NUMERIC"]);
    }

    #[test]
    fn test_topic_reply_synthesizes_topic() {
        let (mut session, _) = session(vec![EngineEvent::numeric(
            "srv",
            332,
            &["me", "#rust", "Rust & friends"],
        )]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(kinds(&sink), ["TOPIC", "NUMERIC"]);
        assert_eq!(sink.events[0].params, ["#rust", "Rust & friends"]);
        assert_eq!(sink.events[1].params, ["332", "me", "#rust", "Rust & friends"]);
    }

    #[test]
    fn test_numeric_code_is_not_zero_padded() {
        let (mut session, _) = session(vec![EngineEvent::numeric("srv", 1, &["me", "Welcome"])]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(sink.events[0].params, ["1", "me", "Welcome"]);
    }

    #[test]
    fn test_origin_is_stripped_to_nick() {
        let (mut session, _) = session(vec![EngineEvent::named(
            EventKind::Join,
            "Alice!alice@example.org",
            &["#rust"],
        )]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(sink.events[0].origin, "Alice");
    }

    #[test]
    fn test_teardown_stops_forwarding() {
        let (mut session, wire) = session(vec![
            EngineEvent::named(EventKind::Error, "", &["Closing link"]),
            EngineEvent::named(EventKind::Privmsg, "Alice", &["me", "late"]),
        ]);
        let mut sink = RecordingSink {
            teardown_on: Some(EventKind::Error),
            ..Default::default()
        };
        session.process(&mut sink);

        assert_eq!(kinds(&sink), ["ERROR"]);
        assert_eq!(session.lifecycle(), Lifecycle::PendingTeardown);

        wire.borrow_mut()
            .inbound
            .push(EngineEvent::named(EventKind::Privmsg, "Alice", &["me", "later"]));
        session.process(&mut sink);
        assert_eq!(sink.events.len(), 1);

        session.disconnect(DisconnectReason::Shutdown);
        assert!(wire.borrow().sent.is_empty());
    }

    #[test]
    fn test_queued_commands_are_flushed_after_each_event() {
        let (mut session, wire) = session(vec![EngineEvent::named(
            EventKind::Privmsg,
            "Alice",
            &["me", "ping"],
        )]);
        let mut sink = RecordingSink::default();
        session.process(&mut sink);

        assert_eq!(
            wire.borrow().sent,
            vec![Command::PRIVMSG("Alice".to_string(), "pong".to_string())]
        );
    }

    #[test]
    fn test_message_splits_lines() {
        let (mut session, wire) = session(Vec::new());
        session.message("#rust", "one\ntwo\r\n\nthree").unwrap();
        session.notice("Bob", "hi").unwrap();

        assert_eq!(
            wire.borrow().sent,
            vec![
                Command::PRIVMSG("#rust".to_string(), "one".to_string()),
                Command::PRIVMSG("#rust".to_string(), "two".to_string()),
                Command::PRIVMSG("#rust".to_string(), "three".to_string()),
                Command::NOTICE("Bob".to_string(), "hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_disconnect_sends_reason_text() {
        let (mut session, wire) = session(Vec::new());
        session.disconnect(DisconnectReason::ConfigReload);

        assert_eq!(
            wire.borrow().sent,
            vec![Command::QUIT("Reloading configuration".to_string())]
        );
    }
}
