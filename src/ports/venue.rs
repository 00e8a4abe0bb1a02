//! Swap Venue Port
//!
//! A swap venue prices an exact-in or exact-out trade and hands back an
//! opaque payload that later feeds the transaction builder. The payload is
//! what binds the quoted amounts to the transaction: the landing protocol
//! rebuilds per fee attempt but never re-quotes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

use crate::domain::TokenInfo;
use crate::ports::network::NetworkError;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("venue request failed: {0}")]
    Request(String),
    #[error("venue returned an unusable payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Which leg of the trade is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapMode {
    /// Input amount fixed, output floats (sell-side)
    ExactIn,
    /// Output amount fixed, input floats (buy-side)
    ExactOut,
}

impl SwapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapMode::ExactIn => "ExactIn",
            SwapMode::ExactOut => "ExactOut",
        }
    }
}

/// A venue's answer for one trade at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueQuote {
    /// Raw units entering the venue
    pub in_amount: u64,
    /// Raw units leaving the venue
    pub out_amount: u64,
    /// Slippage-adjusted bound on the floating leg (min out for ExactIn,
    /// max in for ExactOut)
    pub other_amount_threshold: u64,
    pub price_impact_pct: Decimal,
    /// Venue-specific quote blob consumed by the matching builder
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// Price `raw_amount` of the fixed leg at the given slippage tolerance.
    async fn market_quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        raw_amount: u64,
        mode: SwapMode,
        slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError>;
}

/// Builds an unsigned transaction for one landing attempt. Invoked fresh for
/// every attempt with the current fee; everything else about the transaction
/// must come from state fixed at construction time.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn build(
        &self,
        priority_fee_micro_lamports_per_cu: u64,
        compute_units: u32,
    ) -> Result<VersionedTransaction, VenueError>;
}
