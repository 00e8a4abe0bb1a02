//! Kamino Connector
//!
//! Lending-market reads and operations against a Kamino market. Markets are
//! resolved strictly through the configured alias table; reserve math lives
//! behind the lending port, and every state change goes through the landing
//! protocol as a plain instruction list.

use std::sync::Arc;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::adapters::solana::{rpc::parse_pubkey, WalletManager};
use crate::application::pipeline::QuoteError;
use crate::application::registry::ConnectorHandle;
use crate::application::{land, InstructionPlan, LandingParams};
use crate::domain::to_raw_units;
use crate::error::GatewayError;
use crate::ports::lending::{LendingMarket, ObligationInfo, ReserveAction, ReserveInfo};

use super::LendReceipt;

pub struct KaminoConnector {
    handle: Arc<ConnectorHandle>,
    market_sdk: Arc<dyn LendingMarket>,
}

impl KaminoConnector {
    pub fn new(handle: Arc<ConnectorHandle>, market_sdk: Arc<dyn LendingMarket>) -> Self {
        Self { handle, market_sdk }
    }

    /// Markets are alias-only: a literal address here is almost always a
    /// caller mistake, so it is rejected.
    fn resolve_market(&self, market: &str) -> Result<Pubkey, GatewayError> {
        Ok(self.handle.markets.resolve(market)?)
    }

    pub async fn reserve_info(
        &self,
        market: &str,
        token: &str,
    ) -> Result<ReserveInfo, GatewayError> {
        let market = self.resolve_market(market)?;
        let mint = self.resolve_mint(token).await?;
        Ok(self.market_sdk.reserve_info(&market, &mint).await?)
    }

    pub async fn reserves_info(&self, market: &str) -> Result<Vec<ReserveInfo>, GatewayError> {
        let market = self.resolve_market(market)?;
        Ok(self.market_sdk.reserves_info(&market).await?)
    }

    pub async fn obligation_info(
        &self,
        market: &str,
        wallet_address: &str,
    ) -> Result<ObligationInfo, GatewayError> {
        let market = self.resolve_market(market)?;
        let owner = parse_pubkey(wallet_address)?;
        Ok(self.market_sdk.obligation_info(&market, &owner).await?)
    }

    /// Land one reserve operation: deposit, withdraw, borrow, or repay.
    pub async fn execute(
        &self,
        wallet: &WalletManager,
        market: &str,
        token: &str,
        action: ReserveAction,
        amount: Decimal,
    ) -> Result<LendReceipt, GatewayError> {
        let market = self.resolve_market(market)?;
        let token = self
            .handle
            .network
            .resolve_token(token)
            .await
            .map_err(|e| GatewayError::Quote(resolve_error(token, e)))?;
        let raw_amount =
            to_raw_units(amount, token.decimals).map_err(QuoteError::from)?;
        if raw_amount == 0 {
            return Err(GatewayError::InvalidRequest(format!(
                "amount {amount} is below one raw unit of {}",
                token.symbol
            )));
        }
        let mint = parse_pubkey(&token.address)?;
        let owner = wallet.pubkey();
        info!(
            market = %market,
            token = %token.symbol,
            action = action.as_str(),
            raw_amount,
            "executing reserve operation"
        );

        let instructions = self
            .market_sdk
            .reserve_instructions(&market, &mint, &owner, action, raw_amount)
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

        Ok(LendReceipt {
            signature: receipt.confirmation.signature,
            action,
            token_symbol: token.symbol,
            amount,
            attempts: receipt.attempts,
            fee_lamports: receipt.confirmation.fee_lamports,
        })
    }

    async fn resolve_mint(&self, token: &str) -> Result<Pubkey, GatewayError> {
        let info = self
            .handle
            .network
            .resolve_token(token)
            .await
            .map_err(|e| GatewayError::Quote(resolve_error(token, e)))?;
        Ok(parse_pubkey(&info.address)?)
    }
}

fn resolve_error(token: &str, err: crate::ports::NetworkError) -> QuoteError {
    match err {
        crate::ports::NetworkError::NotFound(_) => QuoteError::TokenNotFound {
            token: token.to_string(),
        },
        other => QuoteError::Network(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use crate::application::registry::{
        AliasTable, ConnectorId, ConnectorKind, ConnectorSettings, RegistryError,
    };
    use crate::domain::FeeSchedule;
    use crate::ports::mocks::{MockLendingMarket, MockNetwork};
    use crate::ports::TxConfirmation;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const MAIN_MARKET: &str = "7u3HeHxYDLhnCoErrtycNokbQYbWGzLs6JSDqGAv5PfF";

    fn handle(network: MockNetwork) -> Arc<ConnectorHandle> {
        let mut markets = std::collections::HashMap::new();
        markets.insert("MAIN".to_string(), MAIN_MARKET.to_string());
        Arc::new(ConnectorHandle {
            id: ConnectorId::new(ConnectorKind::Kamino, "mainnet-beta"),
            network: Arc::new(network),
            settings: ConnectorSettings {
                default_slippage_pct: dec!(1),
                compute_units: 1_000_000,
                fees: FeeSchedule::new(100, 2.0, 750),
                confirm_timeout: Duration::from_millis(10),
            },
            programs: AliasTable::default(),
            markets: AliasTable::new("kamino market", markets),
        })
    }

    fn confirmed_network() -> MockNetwork {
        MockNetwork::new()
            .with_token("USDC", USDC_MINT, 6)
            .with_confirmation(TxConfirmation {
                signature: "lend-sig".to_string(),
                slot: 9,
                fee_lamports: 5000,
                balance_changes: Vec::new(),
            })
    }

    fn reserve(symbol: &str) -> ReserveInfo {
        ReserveInfo {
            reserve_address: "reserve".to_string(),
            token_symbol: symbol.to_string(),
            liquidity_available: dec!(1000000),
            utilization_ratio: dec!(0.8),
            total_supplied: dec!(5000000),
            total_supply_apy: dec!(0.04),
            total_borrowed: dec!(4000000),
            total_borrow_apy: dec!(0.09),
            borrow_factor: dec!(1),
        }
    }

    #[tokio::test]
    async fn test_unknown_market_alias_rejected() {
        let connector = KaminoConnector::new(
            handle(confirmed_network()),
            Arc::new(MockLendingMarket::new()),
        );
        let err = connector.reserves_info("JLP").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Registry(RegistryError::UnknownAlias { .. })
        ));
    }

    #[tokio::test]
    async fn test_literal_market_address_rejected() {
        let connector = KaminoConnector::new(
            handle(confirmed_network()),
            Arc::new(MockLendingMarket::new()),
        );
        // Strict table: even a well-formed address is not accepted
        assert!(connector.reserves_info(MAIN_MARKET).await.is_err());
    }

    #[tokio::test]
    async fn test_deposit_floors_amount_into_raw_units() {
        let market = Arc::new(MockLendingMarket::new().with_reserve(reserve("USDC")));
        let connector = KaminoConnector::new(handle(confirmed_network()), market.clone());
        let wallet = WalletManager::new_random();

        let receipt = connector
            .execute(
                &wallet,
                "MAIN",
                "USDC",
                ReserveAction::Deposit,
                dec!(150.2500009),
            )
            .await
            .unwrap();

        assert_eq!(receipt.signature, "lend-sig");
        assert_eq!(receipt.action, ReserveAction::Deposit);
        let calls = market.instruction_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let (mint, action, raw) = calls[0];
        assert_eq!(mint, parse_pubkey(USDC_MINT).unwrap());
        assert_eq!(action, ReserveAction::Deposit);
        assert_eq!(raw, 150_250_000);
    }

    #[tokio::test]
    async fn test_dust_amount_rejected_before_instructions() {
        let market = Arc::new(MockLendingMarket::new());
        let connector = KaminoConnector::new(handle(confirmed_network()), market.clone());
        let wallet = WalletManager::new_random();

        let err = connector
            .execute(
                &wallet,
                "MAIN",
                "USDC",
                ReserveAction::Borrow,
                dec!(0.0000001),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(market.instruction_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reserve_info_passthrough() {
        let market = Arc::new(MockLendingMarket::new().with_reserve(reserve("USDC")));
        let connector = KaminoConnector::new(handle(confirmed_network()), market);

        let info = connector.reserve_info("MAIN", "USDC").await.unwrap();
        assert_eq!(info.token_symbol, "USDC");
        assert_eq!(info.utilization_ratio, dec!(0.8));
    }
}
