//! Concentrated-Liquidity Ports
//!
//! Boundaries to the Raydium CLMM and Meteora DLMM SDKs. Tick/bin curve math
//! stays behind these traits; the gateway resolves pools, converts amounts,
//! validates ranges, and lands the returned instructions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::ports::venue::{SwapMode, VenueError, VenueQuote};

/// Token pair of a concentrated-liquidity pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    pub address: String,
    /// Base (token X) mint
    pub base_mint: String,
    /// Quote (token Y) mint
    pub quote_mint: String,
    /// Current pool price, quote per base, human units
    pub current_price: Decimal,
}

/// Sized deposit for a new CLMM position over a tick range. One leg is
/// fixed, the other floats up to a slippage-adjusted cap; which leg is fixed
/// is decided by the SDK from the range and the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClmmPositionQuote {
    /// True when the base (token X) leg is the fixed side
    pub input_base: bool,
    pub raw_base_amount: u64,
    pub raw_quote_amount: u64,
    /// Slippage-adjusted cap on the floating leg
    pub raw_other_amount_max: u64,
}

/// An owned position in a Raydium CLMM pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClmmPositionInfo {
    pub position_address: String,
    pub pool_address: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub base_token_amount: Decimal,
    pub quote_token_amount: Decimal,
    pub unclaimed_base_fees: Decimal,
    pub unclaimed_quote_fees: Decimal,
}

/// Boundary to the Raydium CLMM SDK.
#[async_trait]
pub trait ClmmPool: Send + Sync {
    async fn pool_state(&self, pool: &Pubkey) -> Result<PoolState, VenueError>;

    /// Compute the counter-amount for a swap against current pool liquidity.
    async fn compute_swap(
        &self,
        pool: &Pubkey,
        mode: SwapMode,
        raw_amount: u64,
        slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError>;

    /// Swap instructions for a previously computed quote payload.
    async fn swap_instructions(
        &self,
        pool: &Pubkey,
        payload: &serde_json::Value,
        owner: &Pubkey,
    ) -> Result<Vec<Instruction>, VenueError>;

    /// Tick containing `price`, per the pool's tick spacing.
    async fn tick_for_price(&self, pool: &Pubkey, price: Decimal) -> Result<i32, VenueError>;

    /// Size the deposit for a position over [lower_tick, upper_tick] from the
    /// requested amounts and the current pool price.
    async fn quote_position(
        &self,
        pool: &Pubkey,
        lower_tick: i32,
        upper_tick: i32,
        raw_base_amount: u64,
        raw_quote_amount: u64,
        slippage_pct: Decimal,
    ) -> Result<ClmmPositionQuote, VenueError>;

    /// Instructions opening a position over [lower_tick, upper_tick] with the
    /// sized deposit. Returns the position NFT mint alongside them; the mint
    /// keypair is consumed by the SDK, only the owner signs.
    async fn open_position_instructions(
        &self,
        pool: &Pubkey,
        owner: &Pubkey,
        lower_tick: i32,
        upper_tick: i32,
        quote: &ClmmPositionQuote,
    ) -> Result<(Pubkey, Vec<Instruction>), VenueError>;

    async fn position_info(&self, position: &Pubkey) -> Result<ClmmPositionInfo, VenueError>;

    async fn positions_owned(&self, owner: &Pubkey)
        -> Result<Vec<ClmmPositionInfo>, VenueError>;
}

/// An owned position in a Meteora DLMM pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlmmPositionInfo {
    pub position_address: String,
    pub pool_address: String,
    pub lower_bin_id: i32,
    pub upper_bin_id: i32,
    pub base_token_amount: Decimal,
    pub quote_token_amount: Decimal,
}

/// Liquidity-shape strategy for a DLMM position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DlmmStrategy {
    SpotBalanced,
    CurveBalanced,
    BidAskBalanced,
    SpotImbalanced,
}

impl Default for DlmmStrategy {
    fn default() -> Self {
        DlmmStrategy::SpotBalanced
    }
}

/// Boundary to the Meteora DLMM SDK.
#[async_trait]
pub trait DlmmPool: Send + Sync {
    async fn pool_state(&self, pool: &Pubkey) -> Result<PoolState, VenueError>;

    /// Up to `limit` pools, optionally restricted to those holding the given
    /// mints on either side.
    async fn pools(
        &self,
        limit: usize,
        mint_a: Option<&str>,
        mint_b: Option<&str>,
    ) -> Result<Vec<PoolState>, VenueError>;

    /// Bin id containing `price`. `round_down` picks the lower bin on a bin
    /// boundary, mirroring the SDK's price-per-lamport lookup.
    async fn bin_id_for_price(
        &self,
        pool: &Pubkey,
        price: Decimal,
        round_down: bool,
    ) -> Result<i32, VenueError>;

    async fn position_info(&self, position: &Pubkey) -> Result<DlmmPositionInfo, VenueError>;

    /// Instructions creating `position` over [min_bin_id, max_bin_id] and
    /// seeding it with the given raw amounts.
    #[allow(clippy::too_many_arguments)]
    async fn open_position_instructions(
        &self,
        pool: &Pubkey,
        position: &Pubkey,
        owner: &Pubkey,
        min_bin_id: i32,
        max_bin_id: i32,
        raw_base_amount: u64,
        raw_quote_amount: u64,
        strategy: DlmmStrategy,
        slippage_pct: Decimal,
    ) -> Result<Vec<Instruction>, VenueError>;

    /// Instructions adding liquidity to an existing position, reusing its
    /// bin range.
    async fn add_liquidity_instructions(
        &self,
        position: &Pubkey,
        owner: &Pubkey,
        raw_base_amount: u64,
        raw_quote_amount: u64,
        strategy: DlmmStrategy,
        slippage_pct: Decimal,
    ) -> Result<Vec<Instruction>, VenueError>;
}
