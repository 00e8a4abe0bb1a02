//! Jupiter Connector
//!
//! Routes trades through the Jupiter aggregator. Quoting goes through the
//! shared pipeline with the Jupiter client as the venue; execution wraps the
//! swap endpoint in a transaction builder so the landing protocol can rebuild
//! the transaction at each fee attempt without re-quoting.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::transaction::VersionedTransaction;
use tracing::info;

use crate::adapters::jupiter::{JupiterClient, SwapRequest};
use crate::adapters::solana::WalletManager;
use crate::application::pipeline::{enforce_limit, quote_trade};
use crate::application::{land, pair_balance_changes, LandingParams, LandingReceipt};
use crate::application::registry::ConnectorHandle;
use crate::domain::{TradeIntent, TradeQuote};
use crate::error::GatewayError;
use crate::ports::{TransactionBuilder, VenueError};

use super::SwapReceipt;

pub struct JupiterConnector {
    handle: Arc<ConnectorHandle>,
    client: JupiterClient,
}

impl JupiterConnector {
    pub fn new(handle: Arc<ConnectorHandle>, client: JupiterClient) -> Self {
        Self { handle, client }
    }

    /// Price an intent without touching any state.
    pub async fn quote(&self, intent: &TradeIntent) -> Result<TradeQuote, GatewayError> {
        Ok(quote_trade(&self.handle, &self.client, intent).await?)
    }

    /// Quote, guard, and land a swap.
    pub async fn execute(
        &self,
        wallet: &WalletManager,
        intent: &TradeIntent,
    ) -> Result<SwapReceipt, GatewayError> {
        let quote = quote_trade(&self.handle, &self.client, intent).await?;
        enforce_limit(&quote, intent.limit_price)?;
        info!(
            side = intent.side.as_str(),
            expected_price = %quote.expected_price,
            "executing Jupiter swap"
        );

        let builder = JupiterSwapBuilder {
            client: self.client.clone(),
            user_public_key: wallet.pubkey().to_string(),
            quote_response: quote.venue_payload.clone(),
        };
        let params = LandingParams::from(&self.handle.settings);
        let receipt = land(
            self.handle.network.as_ref(),
            &[wallet.keypair()],
            &params,
            &builder,
        )
        .await?;

        Ok(swap_receipt(&quote, &wallet.pubkey().to_string(), &receipt))
    }
}

/// Fold a landed confirmation into a swap receipt with realized deltas.
fn swap_receipt(quote: &TradeQuote, owner: &str, receipt: &LandingReceipt) -> SwapReceipt {
    let (base_delta, quote_delta) = pair_balance_changes(
        &receipt.confirmation,
        owner,
        &quote.base.address,
        &quote.quote.address,
    );
    SwapReceipt {
        signature: receipt.confirmation.signature.clone(),
        attempts: receipt.attempts,
        priority_fee_lamports: receipt.priority_fee_lamports,
        fee_lamports: receipt.confirmation.fee_lamports,
        expected_price: quote.expected_price,
        base_delta,
        quote_delta,
    }
}

/// Rebuilds the Jupiter swap transaction per attempt. The quote response is
/// fixed; only the priority fee changes between attempts.
struct JupiterSwapBuilder {
    client: JupiterClient,
    user_public_key: String,
    quote_response: serde_json::Value,
}

#[async_trait]
impl TransactionBuilder for JupiterSwapBuilder {
    async fn build(
        &self,
        priority_fee_micro_lamports_per_cu: u64,
        compute_units: u32,
    ) -> Result<VersionedTransaction, VenueError> {
        let total_fee =
            (priority_fee_micro_lamports_per_cu as u128 * compute_units as u128 / 1_000_000) as u64;
        let request = SwapRequest::new(
            self.user_public_key.clone(),
            self.quote_response.clone(),
        )
        .with_priority_fee(total_fee);
        let response = self.client.get_swap_transaction(&request).await?;
        response.decode_transaction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::domain::{Side, TokenInfo};
    use crate::ports::{TokenBalanceChange, TxConfirmation};

    fn quote() -> TradeQuote {
        TradeQuote {
            side: Side::Sell,
            base: TokenInfo {
                address: "base-mint".to_string(),
                symbol: "SOL".to_string(),
                decimals: 9,
            },
            quote: TokenInfo {
                address: "quote-mint".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
            request_raw_amount: 1_500_000_000,
            raw_input_amount: 1_500_000_000,
            raw_output_amount: 210_300_000,
            base_amount: dec!(1.5),
            quote_amount: dec!(210.3),
            expected_price: dec!(140.2),
            price_impact_pct: dec!(0.01),
            slippage_pct: dec!(1),
            venue_payload: json!({}),
        }
    }

    #[test]
    fn test_receipt_reports_realized_deltas() {
        let landing = LandingReceipt {
            confirmation: TxConfirmation {
                signature: "sig".to_string(),
                slot: 7,
                fee_lamports: 5000,
                balance_changes: vec![
                    TokenBalanceChange {
                        mint: "base-mint".to_string(),
                        owner: "wallet".to_string(),
                        delta: dec!(-1.5),
                    },
                    TokenBalanceChange {
                        mint: "quote-mint".to_string(),
                        owner: "wallet".to_string(),
                        delta: dec!(210.15),
                    },
                ],
            },
            attempts: 2,
            priority_fee_lamports: 200_000,
        };

        let receipt = swap_receipt(&quote(), "wallet", &landing);

        // Realized amounts come from the chain, not from the estimate
        assert_eq!(receipt.quote_delta, dec!(210.15));
        assert_eq!(receipt.base_delta, dec!(-1.5));
        assert_eq!(receipt.expected_price, dec!(140.2));
        assert_eq!(receipt.attempts, 2);
        assert_eq!(receipt.priority_fee_lamports, 200_000);
    }
}
