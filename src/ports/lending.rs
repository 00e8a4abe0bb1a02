//! Lending Market Port
//!
//! Boundary to the Kamino lending SDK. Reserve math (interest models, mint
//! factors, LTV accounting) lives behind this trait; the gateway only turns
//! the returned instruction sets into landed transactions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::ports::venue::VenueError;

/// Direction of a reserve operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReserveAction {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

impl ReserveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReserveAction::Deposit => "deposit",
            ReserveAction::Withdraw => "withdraw",
            ReserveAction::Borrow => "borrow",
            ReserveAction::Repay => "repay",
        }
    }
}

/// State of one market reserve, human units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveInfo {
    pub reserve_address: String,
    pub token_symbol: String,
    pub liquidity_available: Decimal,
    pub utilization_ratio: Decimal,
    pub total_supplied: Decimal,
    pub total_supply_apy: Decimal,
    pub total_borrowed: Decimal,
    pub total_borrow_apy: Decimal,
    pub borrow_factor: Decimal,
}

/// One deposit or borrow leg of an obligation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationPosition {
    pub reserve_address: String,
    pub token_symbol: String,
    pub amount: Decimal,
}

/// A wallet's standing in one lending market.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationInfo {
    pub obligation_address: String,
    pub deposit_positions: Vec<ObligationPosition>,
    pub borrow_positions: Vec<ObligationPosition>,
    pub max_ltv: Decimal,
    pub liquidation_ltv: Decimal,
    pub current_ltv: Decimal,
}

#[async_trait]
pub trait LendingMarket: Send + Sync {
    async fn reserve_info(
        &self,
        market: &Pubkey,
        mint: &Pubkey,
    ) -> Result<ReserveInfo, VenueError>;

    async fn reserves_info(&self, market: &Pubkey) -> Result<Vec<ReserveInfo>, VenueError>;

    async fn obligation_info(
        &self,
        market: &Pubkey,
        owner: &Pubkey,
    ) -> Result<ObligationInfo, VenueError>;

    /// Full instruction set (setup, lending, cleanup) for one reserve
    /// operation of `raw_amount` units of `mint`.
    async fn reserve_instructions(
        &self,
        market: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
        action: ReserveAction,
        raw_amount: u64,
    ) -> Result<Vec<Instruction>, VenueError>;
}
