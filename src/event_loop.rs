//! Cooperative event loop over any number of networks.
//!
//! Each tick settles failed sessions, waits (at most [`POLL_TIMEOUT`]) for
//! any active session to become ready, then processes readiness and timers
//! for every network in turn. The loop returns once no network has a
//! session or a pending retry left.

use std::time::Duration;

use futures_util::future::select_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::network::Network;

/// Upper bound on one wait, so timers run without traffic.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive `networks` until none of them is active.
pub async fn run(networks: &mut [Network]) {
    info!(networks = networks.len(), "Event loop started");
    loop {
        for network in networks.iter_mut() {
            network.settle_session();
        }
        if !networks.iter().any(Network::is_active) {
            break;
        }

        wait_for_readiness(networks).await;

        for network in networks.iter_mut() {
            network.process_descriptors();
            network.check_timeouts();
        }
    }
    info!("No active networks left; event loop finished");
}

/// Wait until any network's session is ready, or [`POLL_TIMEOUT`] elapses.
pub async fn wait_for_readiness(networks: &[Network]) {
    let pending: Vec<_> = networks.iter().filter_map(Network::readiness).collect();
    if pending.is_empty() {
        sleep(POLL_TIMEOUT).await;
        return;
    }
    if timeout(POLL_TIMEOUT, select_all(pending)).await.is_err() {
        debug!("Poll timeout");
    }
}

/// Connect every network that has `autoconnect` set. Returns how many
/// connection attempts succeeded.
pub fn connect_autoconnect(networks: &mut [Network]) -> usize {
    let mut connected = 0;
    for network in networks.iter_mut().filter(|n| n.autoconnect_enabled()) {
        match network.connect_to_network(false) {
            Ok(()) => connected += 1,
            Err(e) => warn!(network = %network, error = %e, code = e.error_code(), "Autoconnect failed"),
        }
    }
    connected
}

impl Network {
    /// Drive this network alone until it is no longer active.
    pub async fn run(&mut self) {
        run(std::slice::from_mut(self)).await;
    }
}
