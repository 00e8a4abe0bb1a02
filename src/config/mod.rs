//! Configuration Module
//!
//! Loads and validates gateway configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, ConfigError, ConnectorTables, GatewayConfig, JupiterSection, NetworkSection,
    TokenEntry, WalletSection,
};
