//! Meteora Connector
//!
//! DLMM pool listing and position management: open a position over a price
//! range or an explicit bin range, and add liquidity to an existing one.
//! Prices are mapped to bin ids by the pool SDK; the price-range path widens
//! the range by one bin on each side so the requested prices always fall
//! strictly inside the position.

use std::sync::Arc;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use tracing::info;

use crate::adapters::solana::{rpc::parse_pubkey, WalletManager};
use crate::application::registry::ConnectorHandle;
use crate::application::{land, pair_balance_changes, InstructionPlan, LandingParams};
use crate::error::GatewayError;
use crate::ports::clmm::{DlmmPool, DlmmPositionInfo, DlmmStrategy, PoolState};

use super::{
    position_rent_residual, raw_pair_amounts, seeded_native_amount, AddLiquidityReceipt,
    OpenPositionReceipt,
};

/// Widest allowed position, in bins.
const MAX_BIN_WIDTH: i32 = 69;

/// Pools returned by a listing when no limit is given.
const DEFAULT_POOL_LIMIT: usize = 10;

/// Parameters for opening a position.
#[derive(Debug, Clone)]
pub struct OpenPositionRequest {
    /// Pool alias or literal address
    pub pool: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    /// Base amount to seed, human units
    pub base_amount: Decimal,
    /// Quote amount to seed, human units
    pub quote_amount: Decimal,
    pub strategy: DlmmStrategy,
    pub slippage_pct: Option<Decimal>,
}

/// Parameters for opening a position directly over a bin range.
#[derive(Debug, Clone)]
pub struct OpenPositionBinIdRequest {
    /// Pool alias or literal address
    pub pool: String,
    pub min_bin_id: i32,
    pub max_bin_id: i32,
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
    pub strategy: DlmmStrategy,
    pub slippage_pct: Option<Decimal>,
}

pub struct MeteoraConnector {
    handle: Arc<ConnectorHandle>,
    pool_sdk: Arc<dyn DlmmPool>,
}

impl MeteoraConnector {
    pub fn new(handle: Arc<ConnectorHandle>, pool_sdk: Arc<dyn DlmmPool>) -> Self {
        Self { handle, pool_sdk }
    }

    fn resolve_pool(&self, pool: &str) -> Result<Pubkey, GatewayError> {
        Ok(self.handle.markets.resolve_or_literal(pool)?)
    }

    pub async fn pool_state(&self, pool: &str) -> Result<PoolState, GatewayError> {
        let pool = self.resolve_pool(pool)?;
        Ok(self.pool_sdk.pool_state(&pool).await?)
    }

    pub async fn position_info(
        &self,
        position: &str,
    ) -> Result<DlmmPositionInfo, GatewayError> {
        let position = parse_pubkey(position)?;
        Ok(self.pool_sdk.position_info(&position).await?)
    }

    /// List pools known to the SDK, optionally filtered to tokens held on
    /// either side.
    pub async fn fetch_pools(
        &self,
        limit: Option<usize>,
        token_a: Option<&str>,
        token_b: Option<&str>,
    ) -> Result<Vec<PoolState>, GatewayError> {
        let mint_a = match token_a {
            Some(token) => Some(self.handle.network.resolve_token(token).await?.address),
            None => None,
        };
        let mint_b = match token_b {
            Some(token) => Some(self.handle.network.resolve_token(token).await?.address),
            None => None,
        };
        let limit = limit.unwrap_or(DEFAULT_POOL_LIMIT);
        Ok(self
            .pool_sdk
            .pools(limit, mint_a.as_deref(), mint_b.as_deref())
            .await?)
    }

    /// Open a position over [lower_price, upper_price] and seed it.
    pub async fn open_position(
        &self,
        wallet: &WalletManager,
        request: &OpenPositionRequest,
    ) -> Result<OpenPositionReceipt, GatewayError> {
        let pool = self.resolve_pool(&request.pool)?;

        // One bin of margin on each side keeps the requested prices strictly
        // inside the position
        let min_bin_id = self
            .pool_sdk
            .bin_id_for_price(&pool, request.lower_price, true)
            .await?
            - 1;
        let max_bin_id = self
            .pool_sdk
            .bin_id_for_price(&pool, request.upper_price, false)
            .await?
            + 1;

        self.open_at_bins(
            wallet,
            &pool,
            min_bin_id,
            max_bin_id,
            request.base_amount,
            request.quote_amount,
            request.strategy,
            request.slippage_pct,
        )
        .await
    }

    /// Open a position directly over [min_bin_id, max_bin_id], skipping the
    /// price-to-bin mapping.
    pub async fn open_position_bin_id(
        &self,
        wallet: &WalletManager,
        request: &OpenPositionBinIdRequest,
    ) -> Result<OpenPositionReceipt, GatewayError> {
        let pool = self.resolve_pool(&request.pool)?;
        self.open_at_bins(
            wallet,
            &pool,
            request.min_bin_id,
            request.max_bin_id,
            request.base_amount,
            request.quote_amount,
            request.strategy,
            request.slippage_pct,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn open_at_bins(
        &self,
        wallet: &WalletManager,
        pool: &Pubkey,
        min_bin_id: i32,
        max_bin_id: i32,
        base_amount: Decimal,
        quote_amount: Decimal,
        strategy: DlmmStrategy,
        slippage_pct: Option<Decimal>,
    ) -> Result<OpenPositionReceipt, GatewayError> {
        if base_amount.is_zero() && quote_amount.is_zero() {
            return Err(GatewayError::InvalidRequest(
                "at least one of base and quote amount must be non-zero".to_string(),
            ));
        }
        let width = max_bin_id - min_bin_id;
        if width <= 0 {
            return Err(GatewayError::InvalidRequest(format!(
                "bin range [{min_bin_id}, {max_bin_id}] is empty"
            )));
        }
        if width > MAX_BIN_WIDTH {
            return Err(GatewayError::InvalidRequest(format!(
                "position spans {width} bins, maximum is {MAX_BIN_WIDTH}"
            )));
        }

        let state = self.pool_sdk.pool_state(pool).await?;
        let (raw_base, raw_quote) =
            raw_pair_amounts(&self.handle, &state, base_amount, quote_amount).await?;

        let position = Keypair::new();
        let owner = wallet.pubkey();
        let slippage_pct = slippage_pct.unwrap_or(self.handle.settings.default_slippage_pct);
        info!(
            pool = %pool,
            position = %position.pubkey(),
            min_bin_id,
            max_bin_id,
            "opening DLMM position"
        );

        let instructions = self
            .pool_sdk
            .open_position_instructions(
                pool,
                &position.pubkey(),
                &owner,
                min_bin_id,
                max_bin_id,
                raw_base,
                raw_quote,
                strategy,
                slippage_pct,
            )
            .await?;
        let plan = InstructionPlan::new(self.handle.network.clone(), owner, instructions);
        let params = LandingParams::from(&self.handle.settings);
        let receipt = land(
            self.handle.network.as_ref(),
            &[wallet.keypair(), &position],
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
        let seeded_native = seeded_native_amount(&state, base_amount, quote_amount);
        let position_rent_sol =
            position_rent_residual(&receipt.confirmation, &owner.to_string(), seeded_native);

        Ok(OpenPositionReceipt {
            signature: receipt.confirmation.signature,
            position_address: position.pubkey().to_string(),
            lower_bin_id: min_bin_id,
            upper_bin_id: max_bin_id,
            base_delta,
            quote_delta,
            position_rent_sol,
            fee_lamports: receipt.confirmation.fee_lamports,
        })
    }

    /// Add liquidity to an existing position, reusing its bin range.
    pub async fn add_liquidity(
        &self,
        wallet: &WalletManager,
        position: &str,
        base_amount: Decimal,
        quote_amount: Decimal,
        strategy: DlmmStrategy,
        slippage_pct: Option<Decimal>,
    ) -> Result<AddLiquidityReceipt, GatewayError> {
        if base_amount.is_zero() && quote_amount.is_zero() {
            return Err(GatewayError::InvalidRequest(
                "at least one of base and quote amount must be non-zero".to_string(),
            ));
        }

        let position_address = parse_pubkey(position)?;
        let position_info = self.pool_sdk.position_info(&position_address).await?;
        let pool = parse_pubkey(&position_info.pool_address)?;
        let state = self.pool_sdk.pool_state(&pool).await?;
        let (raw_base, raw_quote) =
            raw_pair_amounts(&self.handle, &state, base_amount, quote_amount).await?;

        let owner = wallet.pubkey();
        let slippage_pct = slippage_pct.unwrap_or(self.handle.settings.default_slippage_pct);
        info!(
            position = %position_address,
            lower_bin_id = position_info.lower_bin_id,
            upper_bin_id = position_info.upper_bin_id,
            "adding liquidity to DLMM position"
        );

        let instructions = self
            .pool_sdk
            .add_liquidity_instructions(
                &position_address,
                &owner,
                raw_base,
                raw_quote,
                strategy,
                slippage_pct,
            )
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
        Ok(AddLiquidityReceipt {
            signature: receipt.confirmation.signature,
            position_address: position_address.to_string(),
            base_delta,
            quote_delta,
            fee_lamports: receipt.confirmation.fee_lamports,
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use crate::application::registry::{
        AliasTable, ConnectorId, ConnectorKind, ConnectorSettings,
    };
    use crate::domain::FeeSchedule;
    use crate::ports::mocks::{MockDlmmPool, MockNetwork};
    use crate::ports::{TokenBalanceChange, TxConfirmation};

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const POOL: &str = "FtFUzuXbbw6oBbU53SDUGspEka1D5Xyc4cwnkxer6xKz";

    fn handle(network: MockNetwork) -> Arc<ConnectorHandle> {
        let mut markets = std::collections::HashMap::new();
        markets.insert("SOL-USDC".to_string(), POOL.to_string());
        Arc::new(ConnectorHandle {
            id: ConnectorId::new(ConnectorKind::Meteora, "mainnet-beta"),
            network: Arc::new(network),
            settings: ConnectorSettings {
                default_slippage_pct: dec!(1),
                compute_units: 1_000_000,
                fees: FeeSchedule::new(100, 2.0, 750),
                confirm_timeout: Duration::from_millis(10),
            },
            programs: AliasTable::default(),
            markets: AliasTable::new("meteora pool", markets),
        })
    }

    fn pool_state() -> PoolState {
        PoolState {
            address: POOL.to_string(),
            base_mint: SOL_MINT.to_string(),
            quote_mint: USDC_MINT.to_string(),
            current_price: dec!(101),
        }
    }

    fn tokens() -> MockNetwork {
        MockNetwork::new()
            .with_token("SOL", SOL_MINT, 9)
            .with_token("USDC", USDC_MINT, 6)
    }

    fn open_request(lower: Decimal, upper: Decimal) -> OpenPositionRequest {
        OpenPositionRequest {
            pool: "SOL-USDC".to_string(),
            lower_price: lower,
            upper_price: upper,
            base_amount: dec!(1),
            quote_amount: dec!(100),
            strategy: DlmmStrategy::SpotBalanced,
            slippage_pct: None,
        }
    }

    fn confirmed(wallet_sol_delta: Decimal, owner: &str) -> TxConfirmation {
        TxConfirmation {
            signature: "dlmm-sig".to_string(),
            slot: 5,
            fee_lamports: 5000,
            balance_changes: vec![TokenBalanceChange {
                mint: SOL_MINT.to_string(),
                owner: owner.to_string(),
                delta: wallet_sol_delta,
            }],
        }
    }

    #[tokio::test]
    async fn test_open_position_widens_range_by_one_bin() {
        let wallet = WalletManager::new_random();
        let owner = wallet.pubkey().to_string();
        let network = tokens().with_confirmation(confirmed(dec!(-1.057579), &owner));
        // One price unit per bin: 100.5 -> bin 100, 102.3 -> bin 103
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(network), pool.clone());

        let receipt = connector
            .open_position(&wallet, &open_request(dec!(100.5), dec!(102.3)))
            .await
            .unwrap();

        assert_eq!(receipt.lower_bin_id, 99);
        assert_eq!(receipt.upper_bin_id, 104);
        let calls = pool.open_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(99, 104, 1_000_000_000, 100_000_000)]);
    }

    #[tokio::test]
    async fn test_open_position_rent_excludes_network_fee() {
        let wallet = WalletManager::new_random();
        let owner = wallet.pubkey().to_string();
        let network = tokens().with_confirmation(confirmed(dec!(-1.057579), &owner));
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(network), pool);

        let receipt = connector
            .open_position(&wallet, &open_request(dec!(100.5), dec!(102.3)))
            .await
            .unwrap();

        // 1 SOL seeded the position; the rest minus the network fee is rent
        assert_eq!(receipt.position_rent_sol, dec!(0.057574));
        assert_eq!(receipt.fee_lamports, 5000);
        // Realized deltas come straight from the confirmation
        assert_eq!(receipt.base_delta, dec!(-1.057579));
        assert_eq!(receipt.quote_delta, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_open_position_rejects_empty_amounts() {
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(tokens()), pool.clone());
        let wallet = WalletManager::new_random();

        let mut request = open_request(dec!(100), dec!(102));
        request.base_amount = Decimal::ZERO;
        request.quote_amount = Decimal::ZERO;

        let err = connector.open_position(&wallet, &request).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(pool.open_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_position_rejects_too_wide_range() {
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(tokens()), pool.clone());
        let wallet = WalletManager::new_random();

        let err = connector
            .open_position(&wallet, &open_request(dec!(10), dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(pool.open_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_position_rejects_inverted_range() {
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(tokens()), pool);
        let wallet = WalletManager::new_random();

        let err = connector
            .open_position(&wallet, &open_request(dec!(105), dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    fn bin_id_request(min_bin_id: i32, max_bin_id: i32) -> OpenPositionBinIdRequest {
        OpenPositionBinIdRequest {
            pool: "SOL-USDC".to_string(),
            min_bin_id,
            max_bin_id,
            base_amount: dec!(1),
            quote_amount: dec!(100),
            strategy: DlmmStrategy::SpotBalanced,
            slippage_pct: None,
        }
    }

    #[tokio::test]
    async fn test_open_position_bin_id_uses_requested_range() {
        let wallet = WalletManager::new_random();
        let owner = wallet.pubkey().to_string();
        let network = tokens().with_confirmation(confirmed(dec!(-1.06), &owner));
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(network), pool.clone());

        let receipt = connector
            .open_position_bin_id(&wallet, &bin_id_request(120, 150))
            .await
            .unwrap();

        // Bin ids pass through unchanged, no price mapping and no widening
        assert_eq!(receipt.lower_bin_id, 120);
        assert_eq!(receipt.upper_bin_id, 150);
        let calls = pool.open_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(120, 150, 1_000_000_000, 100_000_000)]);
    }

    #[tokio::test]
    async fn test_open_position_bin_id_rejects_too_wide_range() {
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)));
        let connector = MeteoraConnector::new(handle(tokens()), pool.clone());
        let wallet = WalletManager::new_random();

        let err = connector
            .open_position_bin_id(&wallet, &bin_id_request(0, 70))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(pool.open_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_pools_filters_by_token_pair() {
        let other_pool = PoolState {
            address: Pubkey::new_unique().to_string(),
            base_mint: USDC_MINT.to_string(),
            quote_mint: Pubkey::new_unique().to_string(),
            current_price: dec!(1),
        };
        let pool = Arc::new(
            MockDlmmPool::new(pool_state(), dec!(1))
                .with_listed_pool(pool_state())
                .with_listed_pool(other_pool),
        );
        let connector = MeteoraConnector::new(handle(tokens()), pool);

        let pools = connector
            .fetch_pools(None, Some("SOL"), Some("USDC"))
            .await
            .unwrap();

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].address, POOL);
    }

    #[tokio::test]
    async fn test_fetch_pools_rejects_unknown_token() {
        let pool = Arc::new(MockDlmmPool::new(pool_state(), dec!(1)).with_listed_pool(pool_state()));
        let connector = MeteoraConnector::new(handle(tokens()), pool);

        let err = connector
            .fetch_pools(None, Some("BONK"), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_add_liquidity_reuses_position() {
        let wallet = WalletManager::new_random();
        let owner = wallet.pubkey().to_string();
        let position_address = Pubkey::new_unique();
        let network = tokens().with_confirmation(confirmed(dec!(-0.5), &owner));
        let pool = Arc::new(
            MockDlmmPool::new(pool_state(), dec!(1)).with_position(DlmmPositionInfo {
                position_address: position_address.to_string(),
                pool_address: POOL.to_string(),
                lower_bin_id: 99,
                upper_bin_id: 104,
                base_token_amount: dec!(1),
                quote_token_amount: dec!(100),
            }),
        );
        let connector = MeteoraConnector::new(handle(network), pool.clone());

        let receipt = connector
            .add_liquidity(
                &wallet,
                &position_address.to_string(),
                dec!(0.5),
                dec!(50),
                DlmmStrategy::SpotBalanced,
                None,
            )
            .await
            .unwrap();

        assert_eq!(receipt.position_address, position_address.to_string());
        assert_eq!(receipt.base_delta, dec!(-0.5));
        let calls = pool.add_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(position_address, 500_000_000, 50_000_000)]);
    }
}
