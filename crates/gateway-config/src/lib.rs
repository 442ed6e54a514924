//! # Gateway Config
//!
//! Loads provider connection parameters and logging settings from a TOML or
//! YAML file, then applies environment overrides.
//!
//! Only binaries load configuration; adapters receive the resulting
//! [`ProviderConnectionParams`](gateway_core::ProviderConnectionParams) at
//! construction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigLoader, GatewayConfig};
