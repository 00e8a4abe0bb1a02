//! Raydium CLMM Connector
//!
//! Swaps and position management against Raydium concentrated-liquidity
//! pools. Pools may be named by configured alias or by literal address; swap
//! pricing goes through the shared pipeline with the pool bound as the venue.
//! Opening a position snaps the requested prices to ticks and lets the SDK
//! size the deposit around the current pool price.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::adapters::solana::{rpc::parse_pubkey, WalletManager};
use crate::application::pipeline::{enforce_limit, quote_trade};
use crate::application::registry::ConnectorHandle;
use crate::application::{land, pair_balance_changes, InstructionPlan, LandingParams};
use crate::domain::{TokenInfo, TradeIntent, TradeQuote};
use crate::error::GatewayError;
use crate::ports::clmm::{ClmmPool, ClmmPositionInfo};
use crate::ports::{SwapMode, SwapVenue, VenueError, VenueQuote};

use super::{
    position_rent_residual, raw_pair_amounts, seeded_native_amount, ClmmOpenPositionReceipt,
    SwapReceipt,
};

/// Parameters for opening a position over a price range.
#[derive(Debug, Clone)]
pub struct ClmmOpenPositionRequest {
    /// Pool alias or literal address
    pub pool: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    /// Base amount to seed, human units
    pub base_amount: Decimal,
    /// Quote amount to seed, human units
    pub quote_amount: Decimal,
    pub slippage_pct: Option<Decimal>,
}

pub struct RaydiumClmmConnector {
    handle: Arc<ConnectorHandle>,
    pool_sdk: Arc<dyn ClmmPool>,
}

impl RaydiumClmmConnector {
    pub fn new(handle: Arc<ConnectorHandle>, pool_sdk: Arc<dyn ClmmPool>) -> Self {
        Self { handle, pool_sdk }
    }

    fn resolve_pool(&self, pool: &str) -> Result<Pubkey, GatewayError> {
        Ok(self.handle.markets.resolve_or_literal(pool)?)
    }

    /// Price an intent against one pool.
    pub async fn quote_swap(
        &self,
        pool: &str,
        intent: &TradeIntent,
    ) -> Result<TradeQuote, GatewayError> {
        let pool = self.resolve_pool(pool)?;
        let venue = PoolBoundVenue {
            pool,
            pool_sdk: self.pool_sdk.clone(),
        };
        Ok(quote_trade(&self.handle, &venue, intent).await?)
    }

    /// Quote, guard, and land a swap against one pool.
    pub async fn execute_swap(
        &self,
        wallet: &WalletManager,
        pool: &str,
        intent: &TradeIntent,
    ) -> Result<SwapReceipt, GatewayError> {
        let pool_address = self.resolve_pool(pool)?;
        let venue = PoolBoundVenue {
            pool: pool_address,
            pool_sdk: self.pool_sdk.clone(),
        };
        let quote = quote_trade(&self.handle, &venue, intent).await?;
        enforce_limit(&quote, intent.limit_price)?;
        info!(
            pool = %pool_address,
            side = intent.side.as_str(),
            expected_price = %quote.expected_price,
            "executing CLMM swap"
        );

        let owner = wallet.pubkey();
        let instructions = self
            .pool_sdk
            .swap_instructions(&pool_address, &quote.venue_payload, &owner)
            .await?;
        let plan = InstructionPlan::new(self.handle.network.clone(), owner, instructions);
        let params = LandingParams::from(&self.handle.settings);
        let receipt = land(
            self.handle.network.as_ref(),
            &[wallet.keypair()],
            &params,
            &plan,
        )
        .await?;

        let owner = owner.to_string();
        let (base_delta, quote_delta) = pair_balance_changes(
            &receipt.confirmation,
            &owner,
            &quote.base.address,
            &quote.quote.address,
        );
        Ok(SwapReceipt {
            signature: receipt.confirmation.signature,
            attempts: receipt.attempts,
            priority_fee_lamports: receipt.priority_fee_lamports,
            fee_lamports: receipt.confirmation.fee_lamports,
            expected_price: quote.expected_price,
            base_delta,
            quote_delta,
        })
    }

    /// Open a position over [lower_price, upper_price] and seed it.
    pub async fn open_position(
        &self,
        wallet: &WalletManager,
        request: &ClmmOpenPositionRequest,
    ) -> Result<ClmmOpenPositionReceipt, GatewayError> {
        if request.base_amount.is_zero() && request.quote_amount.is_zero() {
            return Err(GatewayError::InvalidRequest(
                "at least one of base and quote amount must be non-zero".to_string(),
            ));
        }

        let pool = self.resolve_pool(&request.pool)?;
        let state = self.pool_sdk.pool_state(&pool).await?;
        let (raw_base, raw_quote) = raw_pair_amounts(
            &self.handle,
            &state,
            request.base_amount,
            request.quote_amount,
        )
        .await?;

        // Tick snapping can reorder the bounds; the position always spans
        // [min, max]
        let tick_a = self
            .pool_sdk
            .tick_for_price(&pool, request.lower_price)
            .await?;
        let tick_b = self
            .pool_sdk
            .tick_for_price(&pool, request.upper_price)
            .await?;
        let (lower_tick, upper_tick) = (tick_a.min(tick_b), tick_a.max(tick_b));
        if lower_tick == upper_tick {
            return Err(GatewayError::InvalidRequest(format!(
                "price range [{}, {}] maps to an empty tick range",
                request.lower_price, request.upper_price
            )));
        }

        let slippage_pct = request
            .slippage_pct
            .unwrap_or(self.handle.settings.default_slippage_pct);
        let sized = self
            .pool_sdk
            .quote_position(&pool, lower_tick, upper_tick, raw_base, raw_quote, slippage_pct)
            .await?;

        let owner = wallet.pubkey();
        info!(
            pool = %pool,
            lower_tick,
            upper_tick,
            input_base = sized.input_base,
            "opening CLMM position"
        );

        // The SDK mints the position NFT; the wallet is the only signer
        let (position_mint, instructions) = self
            .pool_sdk
            .open_position_instructions(&pool, &owner, lower_tick, upper_tick, &sized)
            .await?;
        let plan = InstructionPlan::new(self.handle.network.clone(), owner, instructions);
        let params = LandingParams::from(&self.handle.settings);
        let receipt = land(
            self.handle.network.as_ref(),
            &[wallet.keypair()],
            &params,
            &plan,
        )
        .await?;

        let (base_delta, quote_delta) = pair_balance_changes(
            &receipt.confirmation,
            &owner.to_string(),
            &state.base_mint,
            &state.quote_mint,
        );
        let seeded_native =
            seeded_native_amount(&state, request.base_amount, request.quote_amount);
        let position_rent_sol =
            position_rent_residual(&receipt.confirmation, &owner.to_string(), seeded_native);

        Ok(ClmmOpenPositionReceipt {
            signature: receipt.confirmation.signature,
            position_address: position_mint.to_string(),
            lower_tick,
            upper_tick,
            base_delta,
            quote_delta,
            position_rent_sol,
            fee_lamports: receipt.confirmation.fee_lamports,
        })
    }

    pub async fn position_info(
        &self,
        position: &str,
    ) -> Result<ClmmPositionInfo, GatewayError> {
        let position = parse_pubkey(position)?;
        Ok(self.pool_sdk.position_info(&position).await?)
    }

    pub async fn positions_owned(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<ClmmPositionInfo>, GatewayError> {
        let owner = parse_pubkey(wallet_address)?;
        Ok(self.pool_sdk.positions_owned(&owner).await?)
    }
}

/// Adapts one pool to the swap venue port so the pipeline can price against
/// it like any other venue.
struct PoolBoundVenue {
    pool: Pubkey,
    pool_sdk: Arc<dyn ClmmPool>,
}

#[async_trait]
impl SwapVenue for PoolBoundVenue {
    async fn market_quote(
        &self,
        _input: &TokenInfo,
        _output: &TokenInfo,
        raw_amount: u64,
        mode: SwapMode,
        slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError> {
        self.pool_sdk
            .compute_swap(&self.pool, mode, raw_amount, slippage_pct)
            .await
    }
}
