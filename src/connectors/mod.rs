//! Connectors
//!
//! One module per venue, each wired from the same three mechanisms: the
//! registry hands it a connector handle, the quote pipeline prices its
//! trades, and the landing protocol lands its transactions. Receipts report
//! realized amounts from confirmed balance changes, not from estimates.

pub mod jupiter;
pub mod kamino;
pub mod meteora;
pub mod raydium_clmm;

pub use jupiter::JupiterConnector;
pub use kamino::KaminoConnector;
pub use meteora::MeteoraConnector;
pub use raydium_clmm::RaydiumClmmConnector;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::pipeline::QuoteError;
use crate::application::registry::ConnectorHandle;
use crate::domain::to_raw_units;
use crate::error::GatewayError;
use crate::ports::clmm::PoolState;
use crate::ports::lending::ReserveAction;
use crate::ports::TxConfirmation;

pub(crate) const NATIVE_DECIMALS: u32 = 9;

/// Convert a pool pair's human amounts to raw units using the configured
/// token table for the pool's mints.
pub(crate) async fn raw_pair_amounts(
    handle: &ConnectorHandle,
    state: &PoolState,
    base_amount: Decimal,
    quote_amount: Decimal,
) -> Result<(u64, u64), GatewayError> {
    let base = handle.network.resolve_token(&state.base_mint).await?;
    let quote = handle.network.resolve_token(&state.quote_mint).await?;
    let raw_base = to_raw_units(base_amount, base.decimals).map_err(QuoteError::from)?;
    let raw_quote = to_raw_units(quote_amount, quote.decimals).map_err(QuoteError::from)?;
    Ok((raw_base, raw_quote))
}

/// Wallet SOL moves for seeded liquidity, the network fee, and the position
/// account rent. The rent is the residual after the first two.
pub(crate) fn position_rent_residual(
    confirmation: &TxConfirmation,
    owner: &str,
    seeded_native: Decimal,
) -> Decimal {
    let native_mint = spl_token::native_mint::ID.to_string();
    let sol_delta = confirmation.delta_for(owner, &native_mint);
    let fee_sol =
        Decimal::from_i128_with_scale(confirmation.fee_lamports as i128, NATIVE_DECIMALS);
    (-sol_delta - fee_sol - seeded_native).max(Decimal::ZERO)
}

/// Native-mint share of the amounts seeding a position.
pub(crate) fn seeded_native_amount(
    state: &PoolState,
    base_amount: Decimal,
    quote_amount: Decimal,
) -> Decimal {
    let native_mint = spl_token::native_mint::ID.to_string();
    let mut seeded = Decimal::ZERO;
    if state.base_mint == native_mint {
        seeded += base_amount;
    }
    if state.quote_mint == native_mint {
        seeded += quote_amount;
    }
    seeded
}

/// Outcome of an executed swap. Deltas are the wallet's realized balance
/// changes; `expected_price` is what the quote promised at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub signature: String,
    pub attempts: u32,
    /// Priority fee of the confirmed attempt, total lamports
    pub priority_fee_lamports: u64,
    /// Network fee actually paid, lamports
    pub fee_lamports: u64,
    pub expected_price: Decimal,
    /// Realized base-asset delta, positive on a buy
    pub base_delta: Decimal,
    /// Realized quote-asset delta, positive on a sell
    pub quote_delta: Decimal,
}

/// Outcome of a landed lending-market operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendReceipt {
    pub signature: String,
    pub action: ReserveAction,
    pub token_symbol: String,
    /// Requested amount, human units
    pub amount: Decimal,
    pub attempts: u32,
    pub fee_lamports: u64,
}

/// Outcome of opening a DLMM position over a bin range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionReceipt {
    pub signature: String,
    pub position_address: String,
    pub lower_bin_id: i32,
    pub upper_bin_id: i32,
    /// Realized base-asset delta, negative when liquidity left the wallet
    pub base_delta: Decimal,
    pub quote_delta: Decimal,
    /// Rent paid for the position account, SOL
    pub position_rent_sol: Decimal,
    pub fee_lamports: u64,
}

/// Outcome of opening a CLMM position over a tick range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClmmOpenPositionReceipt {
    pub signature: String,
    /// Position NFT mint
    pub position_address: String,
    pub lower_tick: i32,
    pub upper_tick: i32,
    /// Realized base-asset delta, negative when liquidity left the wallet
    pub base_delta: Decimal,
    pub quote_delta: Decimal,
    /// Rent paid for the position account, SOL
    pub position_rent_sol: Decimal,
    pub fee_lamports: u64,
}

/// Outcome of adding liquidity to an existing position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityReceipt {
    pub signature: String,
    pub position_address: String,
    /// Realized base-asset delta, negative when liquidity left the wallet
    pub base_delta: Decimal,
    pub quote_delta: Decimal,
    pub fee_lamports: u64,
}
