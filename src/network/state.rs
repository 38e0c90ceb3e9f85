//! Reconstructed network state: own nick, channel rosters, topics and
//! identified users.
//!
//! Every key is folded with RFC 1459 casemapping; the original spelling is
//! kept alongside for display. The identified set is always a subset of the
//! nicks present in some roster.

use std::collections::{BTreeMap, HashSet};

use crate::casemap::{irc_eq, irc_to_lower};

/// Members of one channel in the order they were first seen.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<String>,
    keys: HashSet<String>,
}

impl Roster {
    /// Add `nick` unless an equal (case-folded) nick is already present.
    pub fn insert(&mut self, nick: &str) -> bool {
        if !self.keys.insert(irc_to_lower(nick)) {
            return false;
        }
        self.members.push(nick.to_string());
        true
    }

    pub fn remove(&mut self, nick: &str) -> bool {
        if !self.keys.remove(&irc_to_lower(nick)) {
            return false;
        }
        self.members.retain(|m| !irc_eq(m, nick));
        true
    }

    /// Rename `old` to `new` in place. If `new` is already present the old
    /// entry is simply dropped.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if !self.contains(old) {
            return false;
        }
        let new_key = irc_to_lower(new);
        if irc_eq(old, new) || !self.keys.contains(&new_key) {
            self.keys.remove(&irc_to_lower(old));
            self.keys.insert(new_key);
            if let Some(slot) = self.members.iter_mut().find(|m| irc_eq(m.as_str(), old)) {
                *slot = new.to_string();
            }
        } else {
            self.remove(old);
        }
        true
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.keys.contains(&irc_to_lower(nick))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct Channel {
    name: String,
    roster: Roster,
}

#[derive(Debug, Clone)]
struct Topic {
    channel: String,
    text: String,
}

/// Channel, topic and identification state for one network.
#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    nick: String,
    channels: BTreeMap<String, Channel>,
    topics: BTreeMap<String, Topic>,
    identified: HashSet<String>,
}

impl NetworkState {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ..Default::default()
        }
    }

    /// Current own nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn set_nick(&mut self, nick: impl Into<String>) {
        self.nick = nick.into();
    }

    pub fn is_me(&self, nick: &str) -> bool {
        irc_eq(nick, &self.nick)
    }

    /// `nick` joined `channel`.
    ///
    /// Only our own join opens a roster; joins into channels we are not in
    /// are ignored. Returns whether the roster changed.
    pub fn joined(&mut self, channel: &str, nick: &str) -> bool {
        let key = irc_to_lower(channel);
        if self.is_me(nick) {
            self.channels.entry(key.clone()).or_insert_with(|| Channel {
                name: channel.to_string(),
                roster: Roster::default(),
            });
        }
        match self.channels.get_mut(&key) {
            Some(chan) => chan.roster.insert(nick),
            None => false,
        }
    }

    /// `nick` left `channel`; our own departure forgets the channel.
    pub fn parted(&mut self, channel: &str, nick: &str) {
        let key = irc_to_lower(channel);
        if self.is_me(nick) {
            self.channels.remove(&key);
            self.topics.remove(&key);
            self.prune_identified();
        } else {
            if let Some(chan) = self.channels.get_mut(&key) {
                chan.roster.remove(nick);
            }
            self.forget_if_unknown(nick);
        }
    }

    /// `victim` was kicked from `channel`; same effect as a part.
    pub fn kicked(&mut self, channel: &str, victim: &str) {
        self.parted(channel, victim);
    }

    pub fn quit(&mut self, nick: &str) {
        for chan in self.channels.values_mut() {
            chan.roster.remove(nick);
        }
        self.forget_if_unknown(nick);
    }

    pub fn nick_changed(&mut self, old: &str, new: &str) {
        self.identified.remove(&irc_to_lower(old));
        self.identified.remove(&irc_to_lower(new));
        if self.is_me(old) {
            self.nick = new.to_string();
        }
        for chan in self.channels.values_mut() {
            chan.roster.rename(old, new);
        }
    }

    pub fn set_topic(&mut self, channel: &str, text: &str) {
        self.topics.insert(
            irc_to_lower(channel),
            Topic {
                channel: channel.to_string(),
                text: text.to_string(),
            },
        );
    }

    /// Merge a finished NAMES reply. Returns `false` if we are not in the
    /// channel.
    pub fn names_received(&mut self, channel: &str, names: &[String]) -> bool {
        let Some(chan) = self.channels.get_mut(&irc_to_lower(channel)) else {
            return false;
        };
        for name in names {
            chan.roster.insert(name);
        }
        true
    }

    /// Apply a finished WHOIS reply. A nick is only marked identified while
    /// it is known.
    pub fn whois_received(&mut self, nick: &str, identified: bool) {
        if !identified {
            self.identified.remove(&irc_to_lower(nick));
        } else if self.is_known_user(nick) {
            self.identified.insert(irc_to_lower(nick));
        }
    }

    /// Forget rosters and identification. Topics are kept.
    pub fn clear_membership(&mut self) {
        self.channels.clear();
        self.identified.clear();
    }

    pub fn is_known_user(&self, nick: &str) -> bool {
        self.channels.values().any(|c| c.roster.contains(nick))
    }

    pub fn is_identified(&self, nick: &str) -> bool {
        self.identified.contains(&irc_to_lower(nick))
    }

    pub fn identified_count(&self) -> usize {
        self.identified.len()
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        self.channels.contains_key(&irc_to_lower(channel))
    }

    /// Channels we are in, by their first-seen spelling.
    pub fn joined_channels(&self) -> impl Iterator<Item = &str> {
        self.channels.values().map(|c| c.name.as_str())
    }

    pub fn users_in_channel(&self, channel: &str) -> Option<&Roster> {
        self.channels
            .get(&irc_to_lower(channel))
            .map(|c| &c.roster)
    }

    pub fn topic(&self, channel: &str) -> Option<&str> {
        self.topics
            .get(&irc_to_lower(channel))
            .map(|t| t.text.as_str())
    }

    /// `(channel, topic)` pairs for every recorded topic.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.topics
            .values()
            .map(|t| (t.channel.as_str(), t.text.as_str()))
    }

    fn forget_if_unknown(&mut self, nick: &str) {
        if !self.is_known_user(nick) {
            self.identified.remove(&irc_to_lower(nick));
        }
    }

    fn prune_identified(&mut self) {
        let channels = &self.channels;
        self.identified
            .retain(|key| channels.values().any(|c| c.roster.contains(key)));
    }
}
