//! Configuration Loader
//!
//! Per-network connection and fee parameters plus per-connector alias tables,
//! loaded from TOML. The built-in default targets mainnet-beta so the CLI
//! works without a config file; anything sensitive stays in the environment.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::FeeSchedule;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub networks: HashMap<String, NetworkSection>,
    #[serde(default)]
    pub wallet: WalletSection,
    pub jupiter: JupiterSection,
    #[serde(default)]
    pub kamino: ConnectorTables,
    #[serde(default, rename = "raydium-clmm")]
    pub raydium_clmm: ConnectorTables,
    #[serde(default)]
    pub meteora: ConnectorTables,
}

/// Connection and transaction-landing parameters for one network.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSection {
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Compute budget attached to every landed transaction
    pub default_compute_units: u32,
    /// First-attempt priority fee when the live estimate is lower, lamports
    pub base_priority_fee_lamports: u64,
    /// Priority-fee ceiling, lamports
    pub max_priority_fee_lamports: u64,
    /// Escalation multiplier, must be > 1
    pub priority_fee_multiplier: f64,
    /// Per-attempt confirmation timeout
    pub confirm_timeout_ms: u64,
    /// Known tokens, symbol -> descriptor
    #[serde(default)]
    pub tokens: HashMap<String, TokenEntry>,
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_native_symbol() -> String {
    "SOL".to_string()
}

impl NetworkSection {
    /// RPC URL with environment variable override (SOLANA_RPC_URL).
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(
            self.base_priority_fee_lamports,
            self.priority_fee_multiplier,
            self.max_priority_fee_lamports,
        )
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

/// A known token on one network.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub mint: String,
    pub decimals: u8,
}

/// Wallet configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct WalletSection {
    /// Keypair path (JSON array format, never committed)
    pub keypair_path: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            keypair_path: "~/.config/solana/id.json".to_string(),
        }
    }
}

impl WalletSection {
    /// Keypair path with environment variable override
    /// (SOLANA_KEYPAIR_PATH), tilde-expanded.
    pub fn get_keypair_path(&self) -> String {
        let raw = std::env::var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|_| self.keypair_path.clone());
        shellexpand::tilde(&raw).to_string()
    }
}

/// Jupiter aggregator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JupiterSection {
    /// Jupiter swap API base URL
    pub api_url: String,
    /// Optional API key for higher rate limits
    #[serde(default)]
    pub api_key: Option<String>,
    pub default_slippage_pct: Decimal,
}

/// Alias tables and defaults for a table-driven connector.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectorTables {
    #[serde(default = "default_slippage_pct")]
    pub default_slippage_pct: Decimal,
    /// network -> alias -> program address
    #[serde(default)]
    pub program_ids: HashMap<String, HashMap<String, String>>,
    /// network -> alias -> market/pool address
    #[serde(default)]
    pub markets: HashMap<String, HashMap<String, String>>,
}

fn default_slippage_pct() -> Decimal {
    dec!(1)
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl GatewayConfig {
    pub fn network(&self, name: &str) -> Option<&NetworkSection> {
        self.networks.get(name)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one network must be configured".to_string(),
            ));
        }

        for (name, network) in &self.networks {
            if network.rpc_url.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.rpc_url cannot be empty"
                )));
            }
            if network.priority_fee_multiplier <= 1.0 {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.priority_fee_multiplier must be > 1, got {}",
                    network.priority_fee_multiplier
                )));
            }
            if network.max_priority_fee_lamports < network.base_priority_fee_lamports {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.max_priority_fee_lamports must be >= base_priority_fee_lamports"
                )));
            }
            if network.default_compute_units == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.default_compute_units must be > 0"
                )));
            }
            if network.confirm_timeout_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "networks.{name}.confirm_timeout_ms must be > 0"
                )));
            }
            for (symbol, token) in &network.tokens {
                if token.mint.is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "networks.{name}.tokens.{symbol}.mint cannot be empty"
                    )));
                }
            }
        }

        if self.jupiter.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "jupiter.api_url cannot be empty".to_string(),
            ));
        }
        if self.jupiter.default_slippage_pct <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "jupiter.default_slippage_pct must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(
            "SOL".to_string(),
            TokenEntry {
                mint: "So11111111111111111111111111111111111111112".to_string(),
                decimals: 9,
            },
        );
        tokens.insert(
            "USDC".to_string(),
            TokenEntry {
                mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
                decimals: 6,
            },
        );
        tokens.insert(
            "USDT".to_string(),
            TokenEntry {
                mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(),
                decimals: 6,
            },
        );

        let mut networks = HashMap::new();
        networks.insert(
            "mainnet-beta".to_string(),
            NetworkSection {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                commitment: default_commitment(),
                native_symbol: default_native_symbol(),
                default_compute_units: 600_000,
                base_priority_fee_lamports: 100_000,
                max_priority_fee_lamports: 5_000_000,
                priority_fee_multiplier: 2.0,
                confirm_timeout_ms: 30_000,
                tokens,
            },
        );

        let one_network =
            |alias: &str, address: &str| -> HashMap<String, HashMap<String, String>> {
                let mut table = HashMap::new();
                table.insert(alias.to_string(), address.to_string());
                let mut by_network = HashMap::new();
                by_network.insert("mainnet-beta".to_string(), table);
                by_network
            };

        Self {
            networks,
            wallet: WalletSection::default(),
            jupiter: JupiterSection {
                api_url: "https://api.jup.ag/swap/v1".to_string(),
                api_key: None,
                default_slippage_pct: dec!(1),
            },
            kamino: ConnectorTables {
                default_slippage_pct: dec!(1),
                program_ids: one_network("KLEND", "KLend2g3cP87fffoy8q1mQqGKjrxjC8boSyAYavgmjD"),
                markets: one_network("MAIN", "7u3HeHxYDLhnCoErrtycNokbQYbWGzLs6JSDqGAv5PfF"),
            },
            raydium_clmm: ConnectorTables {
                default_slippage_pct: dec!(1),
                program_ids: one_network("CLMM", "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK"),
                markets: one_network("RAY-USDC", "61R1ndXxvsWXXkWSyNkCxnzwd3zUNB8Q2ibmkiLPC8ht"),
            },
            meteora: ConnectorTables {
                default_slippage_pct: dec!(1),
                program_ids: one_network("DLMM", "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo"),
                markets: one_network("SOL-USDC", "FtFUzuXbbw6oBbU53SDUGspEka1D5Xyc4cwnkxer6xKz"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.network("mainnet-beta").is_some());
        assert!(config.network("testnet").is_none());
    }

    #[test]
    fn test_load_minimal_config() {
        let toml = r#"
            [networks.mainnet-beta]
            rpc_url = "https://rpc.example.com"
            default_compute_units = 600000
            base_priority_fee_lamports = 100000
            max_priority_fee_lamports = 5000000
            priority_fee_multiplier = 2.0
            confirm_timeout_ms = 30000

            [networks.mainnet-beta.tokens.SOL]
            mint = "So11111111111111111111111111111111111111112"
            decimals = 9

            [jupiter]
            api_url = "https://api.jup.ag/swap/v1"
            default_slippage_pct = 0.5
        "#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        let network = config.network("mainnet-beta").unwrap();
        assert_eq!(network.commitment, "confirmed");
        assert_eq!(network.tokens["SOL"].decimals, 9);
        assert_eq!(
            network.fee_schedule(),
            FeeSchedule::new(100_000, 2.0, 5_000_000)
        );
    }

    #[test]
    fn test_rejects_non_escalating_multiplier() {
        let mut config = GatewayConfig::default();
        config
            .networks
            .get_mut("mainnet-beta")
            .unwrap()
            .priority_fee_multiplier = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_ceiling_below_base_fee() {
        let mut config = GatewayConfig::default();
        let network = config.networks.get_mut("mainnet-beta").unwrap();
        network.max_priority_fee_lamports = network.base_priority_fee_lamports - 1;
        assert!(config.validate().is_err());
    }
}
