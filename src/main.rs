//! solgate - Solana Trading Gateway
//!
//! Unified gateway to Solana DEX and lending connectors: Jupiter swaps,
//! Kamino lending, Raydium CLMM, and Meteora DLMM.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use solgate::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = cli::init();
    init_logging(app.verbose, app.debug)?;

    cli::execute(app).await
}

fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}
