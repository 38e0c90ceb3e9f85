//! Network: the long-lived aggregate for one configured IRC network.
//!
//! A [`Network`] owns at most one [`Session`], the reconstructed
//! [`NetworkState`], per-server undesirability scores and the keepalive
//! timers. It picks servers, fails over between them, and dispatches every
//! event to its listeners.
//!
//! The session reports into the network core through a split borrow, so a
//! session can never be dropped while it is still processing. A failed
//! session is marked pending teardown and is dropped (and replaced) at the
//! start of the next call into the network.

mod keepalive;
mod listener;
mod selection;
mod state;

pub use keepalive::{KEEPALIVE_INTERVAL, Keepalive, KeepaliveAction, RETRY_INTERVAL};
pub use listener::{ListenerContext, NetworkListener};
pub use selection::{ServerScores, rank_servers};
pub use state::{NetworkState, Roster};

use std::fmt;
use std::mem;

use futures_util::future::LocalBoxFuture;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{NetworkConfig, ServerConfig};
use crate::engine::{Command, Connector};
use crate::error::NetworkError;
use crate::event::{EventKind, IrcEvent};
use crate::session::{Flow, Session, SessionSink};
use crate::telemetry::spans;

/// Why a network is leaving its server. Sent as the QUIT message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    Unknown,
    Shutdown,
    ConfigReload,
    SwitchingServers,
    Error,
    Timeout,
    AdminRequest,
}

impl DisconnectReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Shutdown => "Shutting down",
            Self::ConfigReload => "Reloading configuration",
            Self::SwitchingServers => "Switching servers",
            Self::Error => "Unknown error",
            Self::Timeout => "Ping timeout",
            Self::AdminRequest => "An admin asked me to disconnect",
            Self::Unknown => "See you around!",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything a session reports into: state, scores, timers, listeners.
struct NetworkCore {
    config: NetworkConfig,
    state: NetworkState,
    scores: ServerScores,
    keepalive: Keepalive,
    listeners: Vec<Box<dyn NetworkListener>>,
    outbox: Vec<Command>,
}

impl NetworkCore {
    fn flag_undesirable_server(&mut self, server: &ServerConfig) {
        let score = self.scores.flag(server);
        info!(server = %server, score, "Flagged server as undesirable");
    }

    fn dispatch(&mut self, event: &IrcEvent) {
        for listener in &mut self.listeners {
            let mut ctx = ListenerContext::new(&self.config, &self.state, &mut self.outbox);
            listener.on_event(event, &mut ctx);
        }
    }

    /// Apply `event` to the reconstructed state. Returns `false` if the
    /// event is malformed and must be dropped.
    fn apply(&mut self, server: &ServerConfig, event: &IrcEvent) -> bool {
        let min = match event.kind {
            EventKind::Join | EventKind::Part | EventKind::Nick => 1,
            EventKind::Kick | EventKind::Topic => 2,
            _ => 0,
        };
        if event.params.len() < min {
            warn!(
                event = %event.kind,
                origin = %event.origin,
                params = event.params.len(),
                min,
                "Too few parameters for event"
            );
            return false;
        }

        let params = &event.params;
        match &event.kind {
            EventKind::Connect => {
                self.scores.clear(server);
                self.keepalive.connected(Instant::now());
            }
            EventKind::Join => {
                self.state.joined(&params[0], &event.origin);
            }
            EventKind::Part => self.state.parted(&params[0], &event.origin),
            EventKind::Kick => self.state.kicked(&params[0], &params[1]),
            EventKind::Quit => self.state.quit(&event.origin),
            EventKind::Nick => self.state.nick_changed(&event.origin, &params[0]),
            EventKind::Topic => self.state.set_topic(&params[0], &params[1]),
            EventKind::Notice
            | EventKind::Privmsg
            | EventKind::Mode
            | EventKind::Umode
            | EventKind::Invite
            | EventKind::CtcpRequest
            | EventKind::CtcpReply
            | EventKind::Action
            | EventKind::Error
            | EventKind::Numeric
            | EventKind::Unknown(_)
            | EventKind::Whois
            | EventKind::Names
            | EventKind::Disconnect => {}
        }
        true
    }

    /// The connection died under the active session.
    fn failed_connection(&mut self, server: &ServerConfig) {
        warn!(server = %server, "Connection failed");
        self.state.clear_membership();
        self.keepalive.reset();
        self.dispatch(&IrcEvent::new(EventKind::Disconnect, "", Vec::new()));
        self.outbox.clear();
        self.flag_undesirable_server(server);
    }
}

impl SessionSink for NetworkCore {
    fn on_event(&mut self, server: &ServerConfig, event: IrcEvent) -> Flow {
        if event.kind != EventKind::Error {
            self.keepalive.pulse();
        }

        if !self.apply(server, &event) {
            return Flow::Continue;
        }

        debug!(event = %event.kind, origin = %event.origin, "Dispatching event");
        self.dispatch(&event);

        if event.kind == EventKind::Error {
            self.failed_connection(server);
            return Flow::Teardown;
        }
        Flow::Continue
    }

    fn whois_received(&mut self, _origin: &str, nick: &str, identified: bool) {
        self.state.whois_received(nick, identified);
    }

    fn names_received(&mut self, channel: &str, names: &[String]) {
        if !self.state.names_received(channel, names) {
            debug!(channel = %channel, "NAMES reply for a channel we are not in");
        }
    }

    fn take_outbox(&mut self) -> Vec<Command> {
        mem::take(&mut self.outbox)
    }
}

/// One configured IRC network.
pub struct Network {
    core: NetworkCore,
    session: Option<Session>,
    connector: Box<dyn Connector>,
    rng: Box<dyn RngCore>,
}

impl Network {
    /// Create a network that draws server tiebreaks from OS entropy.
    pub fn new(config: NetworkConfig, connector: impl Connector + 'static) -> Self {
        Self::with_rng(config, connector, StdRng::from_entropy())
    }

    /// Create a network with an explicit random source for tiebreaks.
    pub fn with_rng(
        config: NetworkConfig,
        connector: impl Connector + 'static,
        rng: impl RngCore + 'static,
    ) -> Self {
        let state = NetworkState::new(config.nickname.clone());
        Self {
            core: NetworkCore {
                config,
                state,
                scores: ServerScores::default(),
                keepalive: Keepalive::default(),
                listeners: Vec::new(),
                outbox: Vec::new(),
            },
            session: None,
            connector: Box::new(connector),
            rng: Box::new(rng),
        }
    }

    pub fn add_listener(&mut self, listener: impl NetworkListener + 'static) {
        self.core.listeners.push(Box::new(listener));
    }

    /// Connect to the best available server.
    ///
    /// Does nothing if a session exists and `reconnect` is false. Candidates
    /// are tried in rank order until one accepts the connection attempt;
    /// each one that refuses is flagged undesirable. If all of them refuse,
    /// another attempt is scheduled one connect timeout later and the
    /// network stays active.
    pub fn connect_to_network(&mut self, reconnect: bool) -> Result<(), NetworkError> {
        if self.session.is_some() && !reconnect {
            return Ok(());
        }

        let candidates: Vec<ServerConfig> = rank_servers(
            &self.core.config.servers,
            &self.core.scores,
            &mut *self.rng,
        )
        .into_iter()
        .cloned()
        .collect();

        if candidates.is_empty() {
            warn!(
                network = %self.core.config.display_name(),
                "Trying to connect to network, but there are no servers to connect to"
            );
            return Err(NetworkError::NoServers(self.core.config.name.clone()));
        }

        info!(network = %self, "Connecting to network");
        let mut last_error = None;
        for server in candidates {
            match self.connect_to_server(server) {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        let delay = self.core.config.connect_timeout();
        self.core.keepalive.schedule_retry(Instant::now(), delay);
        warn!(network = %self, "No server accepted the connection; will retry");
        Err(last_error.unwrap_or_else(|| NetworkError::NoServers(self.core.config.name.clone())))
    }

    fn connect_to_server(&mut self, server: ServerConfig) -> Result<(), NetworkError> {
        if let Some(mut old) = self.session.take() {
            old.disconnect(DisconnectReason::SwitchingServers);
            self.core.state.clear_membership();
            self.core.outbox.clear();
        }
        self.core.keepalive.reset();
        self.core.state.set_nick(self.core.config.nickname.clone());

        let span = spans::session(&server);
        let _enter = span.enter();

        let engine = match self.connector.create(&server) {
            Ok(engine) => engine,
            Err(e) => {
                warn!(error = %e, "Failed to create protocol engine");
                self.core.flag_undesirable_server(&server);
                return Err(e.into());
            }
        };

        let mut session = Session::new(server, engine);
        if let Err(e) = session.connect(&self.core.config) {
            warn!(error = %e, "Connection attempt refused");
            self.core.flag_undesirable_server(session.server());
            return Err(e.into());
        }

        self.core
            .keepalive
            .connecting(Instant::now(), self.core.config.connect_timeout());
        self.session = Some(session);
        Ok(())
    }

    /// Quit the active session with `reason` and drop it. Also cancels a
    /// pending retry.
    pub fn disconnect_from_network(&mut self, reason: DisconnectReason) {
        if self.session.is_none() {
            self.core.keepalive.reset();
            return;
        }
        info!(network = %self, reason = %reason, "Disconnecting from network");

        self.core.state.clear_membership();
        if let Some(mut session) = self.session.take() {
            session.disconnect(reason);
        }
        self.core.keepalive.reset();
        self.core.outbox.clear();
    }

    /// Disconnect with [`DisconnectReason::Shutdown`].
    pub fn shutdown(&mut self) {
        self.disconnect_from_network(DisconnectReason::Shutdown);
    }

    /// Replace the configuration. A connected network quits and reconnects
    /// against the new server list; scores carry over by server identity.
    pub fn reload_config(&mut self, config: NetworkConfig) -> Result<(), NetworkError> {
        let was_connected = self.is_active();
        if was_connected {
            self.disconnect_from_network(DisconnectReason::ConfigReload);
        }
        self.core.config = config;
        if was_connected {
            self.connect_to_network(true)
        } else {
            self.core.state.set_nick(self.core.config.nickname.clone());
            Ok(())
        }
    }

    /// Drop a session that failed during its last processing pass and
    /// reconnect.
    pub(crate) fn settle_session(&mut self) {
        if !self.is_pending_teardown() {
            return;
        }
        self.session = None;
        info!(network = %self, "Reconnecting after connection failure");
        if let Err(e) = self.connect_to_network(false) {
            warn!(network = %self, error = %e, code = e.error_code(), "Reconnect failed");
        }
    }

    /// Process whatever the active session's engine has ready.
    pub fn process_descriptors(&mut self) {
        let span = spans::network(&self.core.config.name);
        let _enter = span.enter();

        self.settle_session();
        if let Some(session) = self.session.as_mut() {
            session.process(&mut self.core);
        }
    }

    /// Run the keepalive and connection-timeout state machine once.
    pub fn check_timeouts(&mut self) {
        let span = spans::network(&self.core.config.name);
        let _enter = span.enter();

        self.settle_session();
        if self.session.is_none() {
            if self.core.keepalive.retry_due(Instant::now()) {
                info!(network = %self, "Retrying connection");
                if let Err(e) = self.connect_to_network(true) {
                    warn!(error = %e, code = e.error_code(), "Reconnect failed");
                }
            }
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match self
            .core
            .keepalive
            .check(Instant::now(), self.core.config.pong_timeout())
        {
            KeepaliveAction::Wait => {}
            KeepaliveAction::SendPing => {
                debug!(server = %session.server(), "Sending keepalive PING");
                if let Err(e) = session.ping() {
                    warn!(error = %e, "Failed to send keepalive PING");
                }
            }
            KeepaliveAction::TimedOut => {
                let server = session.server().clone();
                warn!(server = %server, "Connection timed out");
                self.core.flag_undesirable_server(&server);
                self.disconnect_from_network(DisconnectReason::Timeout);
                self.core
                    .dispatch(&IrcEvent::new(EventKind::Disconnect, "", Vec::new()));
                self.core.outbox.clear();
                if let Err(e) = self.connect_to_network(true) {
                    warn!(error = %e, code = e.error_code(), "Reconnect failed");
                }
            }
        }
    }

    /// Resolves when the active session has work. `None` without a usable
    /// session.
    pub fn readiness(&self) -> Option<LocalBoxFuture<'_, ()>> {
        self.session
            .as_ref()
            .filter(|s| !s.is_pending_teardown())
            .map(Session::readiness)
    }

    /// Whether the network has a session (connected or connecting) or is
    /// waiting to retry after every server refused.
    pub fn is_active(&self) -> bool {
        self.session.is_some() || self.is_retry_pending()
    }

    pub fn is_retry_pending(&self) -> bool {
        self.core.keepalive.retry_at().is_some()
    }

    /// When the next connection attempt is due, if every server refused
    /// the last one.
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.core.keepalive.retry_at()
    }

    /// Whether the active session failed and awaits teardown.
    pub fn is_pending_teardown(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(Session::is_pending_teardown)
    }

    pub fn flag_undesirable_server(&mut self, server: &ServerConfig) {
        self.core.flag_undesirable_server(server);
    }

    pub fn server_is_actually_okay(&mut self, server: &ServerConfig) {
        self.core.scores.clear(server);
    }

    pub fn server_undesirability(&self, server: &ServerConfig) -> u32 {
        self.core.scores.get(server)
    }

    pub fn active_server(&self) -> Option<&ServerConfig> {
        self.session.as_ref().map(Session::server)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.core.config
    }

    pub fn network_name(&self) -> &str {
        &self.core.config.name
    }

    pub fn autoconnect_enabled(&self) -> bool {
        self.core.config.autoconnect
    }

    pub fn state(&self) -> &NetworkState {
        &self.core.state
    }

    pub fn nick(&self) -> &str {
        self.core.state.nick()
    }

    pub fn joined_channels(&self) -> impl Iterator<Item = &str> {
        self.core.state.joined_channels()
    }

    pub fn topics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.core.state.topics()
    }

    pub fn users_in_channel(&self, channel: &str) -> Option<&Roster> {
        self.core.state.users_in_channel(channel)
    }

    pub fn is_identified(&self, nick: &str) -> bool {
        self.core.state.is_identified(nick)
    }

    pub fn is_known_user(&self, nick: &str) -> bool {
        self.core.state.is_known_user(nick)
    }

    /// Armed connection or PONG deadline, if any.
    pub fn connection_deadline(&self) -> Option<Instant> {
        self.core.keepalive.deadline()
    }

    pub fn join_channel(&mut self, channel: &str, key: Option<&str>) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.join(channel, key)?)
    }

    pub fn leave_channel(&mut self, channel: &str, reason: Option<&str>) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.part(channel, reason)?)
    }

    pub fn say(&mut self, target: &str, text: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.message(target, text)?)
    }

    pub fn notice(&mut self, target: &str, text: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.notice(target, text)?)
    }

    pub fn action(&mut self, target: &str, text: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.action(target, text)?)
    }

    pub fn ctcp(&mut self, target: &str, text: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.ctcp_request(target, text)?)
    }

    pub fn ctcp_reply(&mut self, target: &str, text: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.ctcp_reply(target, text)?)
    }

    pub fn names(&mut self, channel: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.names(channel)?)
    }

    pub fn send_whois(&mut self, nick: &str) -> Result<(), NetworkError> {
        Ok(self.session_mut()?.whois(nick)?)
    }

    fn session_mut(&mut self) -> Result<&mut Session, NetworkError> {
        match self.session.as_mut() {
            Some(session) if !session.is_pending_teardown() => Ok(session),
            _ => Err(NetworkError::NotConnected(self.core.config.name.clone())),
        }
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.disconnect_from_network(DisconnectReason::Shutdown);
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network[{}:", self.core.config.display_name())?;
        match &self.session {
            Some(session) => write!(f, "{session}]"),
            None => f.write_str("none]"),
        }
    }
}
