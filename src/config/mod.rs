//! Configuration types and loading.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (ClientConfig, NetworkConfig, ServerConfig)
//! - [`validation`]: Up-front checks that collect every problem found

mod types;
mod validation;

pub use types::{ClientConfig, ConfigError, NetworkConfig, ServerConfig};
pub use validation::{ValidationError, validate};
