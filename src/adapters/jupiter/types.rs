//! Jupiter API Wire Types
//!
//! Request and response structures for the quote and swap endpoints. The
//! quote response is kept round-trippable: unknown fields are retained so the
//! exact quote can be posted back to the swap endpoint.

use serde::{Deserialize, Serialize};

use crate::ports::{SwapMode, VenueError};

/// Parameters for the quote endpoint.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Raw units of the fixed leg
    pub amount: u64,
    pub slippage_bps: u32,
    pub swap_mode: SwapMode,
}

impl QuoteRequest {
    pub fn new(
        input_mint: impl Into<String>,
        output_mint: impl Into<String>,
        amount: u64,
        slippage_bps: u32,
        swap_mode: SwapMode,
    ) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            slippage_bps,
            swap_mode,
        }
    }
}

/// Response from the quote endpoint. Amount fields arrive as strings; extra
/// fields (route plan, context slot) are retained for the swap request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub in_amount: String,
    pub output_mint: String,
    pub out_amount: String,
    pub other_amount_threshold: String,
    pub swap_mode: String,
    #[serde(default)]
    pub price_impact_pct: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QuoteResponse {
    pub fn in_amount(&self) -> Result<u64, VenueError> {
        parse_amount(&self.in_amount, "inAmount")
    }

    pub fn out_amount(&self) -> Result<u64, VenueError> {
        parse_amount(&self.out_amount, "outAmount")
    }

    pub fn other_amount_threshold(&self) -> Result<u64, VenueError> {
        parse_amount(&self.other_amount_threshold, "otherAmountThreshold")
    }
}

fn parse_amount(value: &str, field: &str) -> Result<u64, VenueError> {
    value
        .parse::<u64>()
        .map_err(|_| VenueError::InvalidPayload(format!("{field} is not a raw amount: {value}")))
}

/// Request body for the swap endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub user_public_key: String,
    /// The full quote response, returned verbatim
    pub quote_response: serde_json::Value,
    /// Exact priority fee for this attempt, total lamports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritization_fee_lamports: Option<u64>,
    pub dynamic_compute_unit_limit: bool,
}

impl SwapRequest {
    pub fn new(user_public_key: String, quote_response: serde_json::Value) -> Self {
        Self {
            user_public_key,
            quote_response,
            prioritization_fee_lamports: None,
            dynamic_compute_unit_limit: false,
        }
    }

    pub fn with_priority_fee(mut self, lamports: u64) -> Self {
        self.prioritization_fee_lamports = Some(lamports);
        self
    }
}

/// Response from the swap endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64-encoded serialized transaction, unsigned
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
    #[serde(default)]
    pub prioritization_fee_lamports: u64,
}

impl SwapResponse {
    /// Decode the wire transaction into an unsigned versioned transaction.
    pub fn decode_transaction(
        &self,
    ) -> Result<solana_sdk::transaction::VersionedTransaction, VenueError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.swap_transaction)
            .map_err(|e| VenueError::InvalidPayload(format!("transaction base64: {e}")))?;
        bincode::deserialize(&bytes)
            .map_err(|e| VenueError::InvalidPayload(format!("transaction bytes: {e}")))
    }
}
