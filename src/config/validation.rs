//! Configuration validation.
//!
//! Validates configuration up front to catch common errors before any
//! connection attempt.

use super::ClientConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("network.name is required")]
    MissingNetworkName,
    #[error("duplicate network name: {0}")]
    DuplicateNetwork(String),
    #[error("network '{0}': nickname is required")]
    MissingNickname(String),
    #[error("network '{0}': at least one server is required")]
    NoServers(String),
    #[error("network '{0}': server host is required")]
    MissingHost(String),
    #[error("network '{network}': server {host} has port 0")]
    InvalidPort { network: String, host: String },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for network in &config.networks {
        if network.name.is_empty() {
            errors.push(ValidationError::MissingNetworkName);
        } else if !seen.insert(network.name.as_str()) {
            errors.push(ValidationError::DuplicateNetwork(network.name.clone()));
        }

        if network.nickname.is_empty() {
            errors.push(ValidationError::MissingNickname(network.name.clone()));
        }

        if network.servers.is_empty() {
            errors.push(ValidationError::NoServers(network.name.clone()));
        }

        for server in &network.servers {
            if server.host.is_empty() {
                errors.push(ValidationError::MissingHost(network.name.clone()));
            }
            if server.port == 0 {
                errors.push(ValidationError::InvalidPort {
                    network: network.name.clone(),
                    host: server.host.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
