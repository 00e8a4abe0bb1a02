//! CLI Command Handlers
//!
//! Quote and swap commands against the Jupiter connector. Results print as
//! JSON so they compose with shell tooling.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::adapters::jupiter::{JupiterApiConfig, JupiterClient};
use crate::adapters::solana::{SolanaRpcFactory, WalletManager};
use crate::application::{ConnectorKind, ConnectorRegistry};
use crate::config::{load_config, GatewayConfig};
use crate::connectors::JupiterConnector;
use crate::domain::{Side, TradeIntent};

/// Solana trading gateway for DEX and lending connectors
#[derive(Parser, Debug)]
#[command(
    name = "solgate",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Solana trading gateway (Jupiter, Kamino, Raydium CLMM, Meteora DLMM)"
)]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Price a trade without executing it
    Quote(QuoteCmd),

    /// Execute a trade through Jupiter
    Swap(SwapCmd),
}

/// Get a trade quote
#[derive(Parser, Debug)]
pub struct QuoteCmd {
    /// Trade side: BUY or SELL (of the base asset)
    #[arg(value_name = "SIDE")]
    pub side: Side,

    /// Base token symbol or mint address
    #[arg(value_name = "BASE")]
    pub base: String,

    /// Quote token symbol or mint address
    #[arg(value_name = "QUOTE")]
    pub quote: String,

    /// Amount of the base asset, human units
    #[arg(value_name = "AMOUNT")]
    pub amount: Decimal,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,

    /// Network name
    #[arg(short, long, value_name = "NETWORK", default_value = "mainnet-beta")]
    pub network: String,

    /// Slippage tolerance override, percent
    #[arg(long, value_name = "PCT")]
    pub slippage: Option<Decimal>,
}

/// Execute a trade
#[derive(Parser, Debug)]
pub struct SwapCmd {
    #[command(flatten)]
    pub quote: QuoteCmd,

    /// Refuse to trade beyond this price (quote per base)
    #[arg(long, value_name = "PRICE")]
    pub limit_price: Option<Decimal>,

    /// Override keypair path
    #[arg(long, value_name = "FILE")]
    pub keypair: Option<PathBuf>,
}

pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Quote(cmd) => quote_command(cmd).await,
        Command::Swap(cmd) => swap_command(cmd).await,
    }
}

fn load_or_default(path: &PathBuf) -> Result<GatewayConfig> {
    if path.exists() {
        load_config(path).with_context(|| format!("failed to load {}", path.display()))
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(GatewayConfig::default())
    }
}

async fn jupiter_connector(
    config: GatewayConfig,
    network: &str,
) -> Result<JupiterConnector> {
    let client = JupiterClient::new(JupiterApiConfig::from(&config.jupiter))
        .context("failed to create Jupiter client")?;
    let factory = Arc::new(SolanaRpcFactory::new(config.clone()));
    let registry = ConnectorRegistry::new(config, factory);
    let handle = registry
        .get(ConnectorKind::Jupiter, network)
        .await
        .context("failed to initialize Jupiter connector")?;
    Ok(JupiterConnector::new(handle, client))
}

fn intent_from(cmd: &QuoteCmd, limit_price: Option<Decimal>) -> TradeIntent {
    let mut intent = TradeIntent::new(cmd.side, cmd.base.clone(), cmd.quote.clone(), cmd.amount);
    if let Some(slippage) = cmd.slippage {
        intent = intent.with_slippage_pct(slippage);
    }
    if let Some(limit) = limit_price {
        intent = intent.with_limit_price(limit);
    }
    intent
}

async fn quote_command(cmd: QuoteCmd) -> Result<()> {
    let config = load_or_default(&cmd.config)?;
    let connector = jupiter_connector(config, &cmd.network).await?;
    let quote = connector.quote(&intent_from(&cmd, None)).await?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn swap_command(cmd: SwapCmd) -> Result<()> {
    let config = load_or_default(&cmd.quote.config)?;
    let keypair_path = match &cmd.keypair {
        Some(path) => path.display().to_string(),
        None => config.wallet.get_keypair_path(),
    };
    let wallet = WalletManager::from_file(&keypair_path)
        .with_context(|| format!("failed to load wallet from {keypair_path}"))?;

    let connector = jupiter_connector(config, &cmd.quote.network).await?;
    let receipt = connector
        .execute(&wallet, &intent_from(&cmd.quote, cmd.limit_price))
        .await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
