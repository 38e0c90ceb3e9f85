//! Listener interface.
//!
//! Listeners see every event a network dispatches, in delivery order. They
//! run synchronously inside the event loop, so they must not block. Commands
//! queued through the [`ListenerContext`] are sent once the dispatch that
//! produced them returns.

use crate::config::NetworkConfig;
use crate::engine::Command;
use crate::event::IrcEvent;

use super::NetworkState;

/// Receives dispatched events.
pub trait NetworkListener {
    fn on_event(&mut self, event: &IrcEvent, ctx: &mut ListenerContext<'_>);
}

impl<F> NetworkListener for F
where
    F: FnMut(&IrcEvent, &mut ListenerContext<'_>),
{
    fn on_event(&mut self, event: &IrcEvent, ctx: &mut ListenerContext<'_>) {
        self(event, ctx)
    }
}

/// What a listener may see and do while handling an event.
pub struct ListenerContext<'a> {
    config: &'a NetworkConfig,
    state: &'a NetworkState,
    outbox: &'a mut Vec<Command>,
}

impl<'a> ListenerContext<'a> {
    pub(crate) fn new(
        config: &'a NetworkConfig,
        state: &'a NetworkState,
        outbox: &'a mut Vec<Command>,
    ) -> Self {
        Self {
            config,
            state,
            outbox,
        }
    }

    pub fn network_name(&self) -> &str {
        &self.config.name
    }

    pub fn nick(&self) -> &str {
        self.state.nick()
    }

    pub fn state(&self) -> &NetworkState {
        self.state
    }

    /// Queue a PRIVMSG, one per non-empty line.
    pub fn say(&mut self, target: &str, text: &str) {
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.send(Command::PRIVMSG(target.to_string(), line.to_string()));
        }
    }

    /// Queue a NOTICE, one per non-empty line.
    pub fn notice(&mut self, target: &str, text: &str) {
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.send(Command::NOTICE(target.to_string(), line.to_string()));
        }
    }

    pub fn join(&mut self, channel: &str, key: Option<&str>) {
        self.send(Command::JOIN(channel.to_string(), key.map(str::to_string)));
    }

    pub fn part(&mut self, channel: &str, reason: Option<&str>) {
        self.send(Command::PART(
            channel.to_string(),
            reason.map(str::to_string),
        ));
    }

    pub fn action(&mut self, target: &str, text: &str) {
        self.send(Command::CtcpAction(target.to_string(), text.to_string()));
    }

    pub fn whois(&mut self, nick: &str) {
        self.send(Command::WHOIS(nick.to_string()));
    }

    pub fn names(&mut self, channel: &str) {
        self.send(Command::NAMES(channel.to_string()));
    }

    pub fn send(&mut self, command: Command) {
        self.outbox.push(command);
    }
}
