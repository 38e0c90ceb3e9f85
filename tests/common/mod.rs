//! Integration test common infrastructure.
//!
//! Provides a scripted protocol engine, a recording listener, and helpers
//! for building networks against them.

pub mod engine;
pub mod listener;

#[allow(unused_imports)]
pub use engine::{EngineHandle, MockConnector, MockServers};
#[allow(unused_imports)]
pub use listener::Recorder;

use rand::SeedableRng;
use rand::rngs::StdRng;
use slirc_client::{EventKind, Network, NetworkConfig, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; honours `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A network config named "test" with nick "me" and the given servers.
#[allow(dead_code)]
pub fn config(servers: Vec<ServerConfig>) -> NetworkConfig {
    let mut config = NetworkConfig::new("test");
    config.display_name = "Test Net".to_string();
    config.nickname = "me".to_string();
    config.username = "me".to_string();
    config.fullname = "Test Bot".to_string();
    config.servers = servers;
    config
}

/// A seeded network with a recorder attached.
#[allow(dead_code)]
pub fn network(config: NetworkConfig) -> (Network, MockServers, Recorder) {
    init_tracing();
    let servers = MockServers::default();
    let recorder = Recorder::default();
    let mut network = Network::with_rng(config, servers.connector(), StdRng::seed_from_u64(1459));
    network.add_listener(recorder.clone());
    (network, servers, recorder)
}

/// Connect, complete registration and clear the recorder.
#[allow(dead_code)]
pub fn connected(config: NetworkConfig) -> (Network, MockServers, Recorder) {
    let (mut network, servers, recorder) = network(config);
    network
        .connect_to_network(false)
        .expect("connect_to_network failed");
    servers.last().push_named(EventKind::Connect, "irc.example.net", &[]);
    network.process_descriptors();
    recorder.clear();
    (network, servers, recorder)
}

/// [`connected`] and already in `channel` with `members`.
#[allow(dead_code)]
pub fn in_channel(channel: &str, members: &[&str]) -> (Network, MockServers, Recorder) {
    let (mut network, servers, recorder) =
        connected(config(vec![ServerConfig::new("irc.example.net", 6667)]));
    let engine = servers.last();
    engine.push_named(EventKind::Join, "me!me@host", &[channel]);
    for member in members {
        engine.push_named(EventKind::Join, member, &[channel]);
    }
    network.process_descriptors();
    recorder.clear();
    (network, servers, recorder)
}
