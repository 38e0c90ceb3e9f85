//! Connection and keepalive deadlines.
//!
//! A network is *Idle* when no deadline is armed, *AwaitingReply* while a
//! deadline lies in the future, and *TimedOut* once it has passed. Any
//! non-error traffic disarms the deadline. An idle connection is pinged as
//! soon as it goes quiet after connecting, then every
//! [`KEEPALIVE_INTERVAL`] once registered.
//!
//! When no server accepted a connection attempt, a retry deadline keeps the
//! network alive until the next attempt.

use std::time::Duration;

use tokio::time::Instant;

/// Interval between keepalive PINGs on an idle connection.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before retrying a network whose servers all refused, when the
/// connect timeout is zero.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// What the caller should do after [`Keepalive::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepaliveAction {
    Wait,
    /// Send a PING; the reply deadline has already been armed.
    SendPing,
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct Keepalive {
    deadline: Option<Instant>,
    next_ping: Option<Instant>,
    retry_at: Option<Instant>,
}

impl Keepalive {
    /// A connection attempt started. A zero `timeout` arms nothing.
    pub fn connecting(&mut self, now: Instant, timeout: Duration) {
        self.next_ping = Some(now);
        self.retry_at = None;
        self.deadline = (!timeout.is_zero()).then(|| now + timeout);
    }

    /// Registration completed: start pinging.
    pub fn connected(&mut self, now: Instant) {
        self.next_ping = Some(now + KEEPALIVE_INTERVAL);
    }

    /// Traffic arrived; the connection is alive.
    pub fn pulse(&mut self) {
        self.deadline = None;
    }

    pub fn reset(&mut self) {
        self.deadline = None;
        self.next_ping = None;
        self.retry_at = None;
    }

    /// Every server refused; try again after `delay` (or
    /// [`RETRY_INTERVAL`] when it is zero).
    pub fn schedule_retry(&mut self, now: Instant, delay: Duration) {
        let delay = if delay.is_zero() { RETRY_INTERVAL } else { delay };
        self.deadline = None;
        self.next_ping = None;
        self.retry_at = Some(now + delay);
    }

    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Consume the retry deadline if it has passed.
    pub fn retry_due(&mut self, now: Instant) -> bool {
        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn next_ping(&self) -> Option<Instant> {
        self.next_ping
    }

    pub fn check(&mut self, now: Instant, pong_timeout: Duration) -> KeepaliveAction {
        match self.deadline {
            Some(deadline) if now >= deadline => KeepaliveAction::TimedOut,
            Some(_) => KeepaliveAction::Wait,
            None => match self.next_ping {
                Some(next) if now >= next => {
                    self.next_ping = Some(now + KEEPALIVE_INTERVAL);
                    self.deadline = (!pong_timeout.is_zero()).then(|| now + pong_timeout);
                    KeepaliveAction::SendPing
                }
                _ => KeepaliveAction::Wait,
            },
        }
    }
}
