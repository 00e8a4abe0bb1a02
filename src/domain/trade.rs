//! Trade Intents and Quotes
//!
//! A `TradeIntent` is the caller's symbolic request: side, token pair, and a
//! human-unit amount of the base asset. The quote pipeline turns it into a
//! `TradeQuote` with exact raw amounts and an expected price; the limit-price
//! guard runs on the quote before any transaction exists.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade direction, relative to the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Acquire base, spend quote (fixed output amount)
    Buy,
    /// Sell base, receive quote (fixed input amount)
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown trade side: {other}")),
        }
    }
}

/// Canonical on-chain token descriptor, resolved from a symbol or address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Mint address (base58)
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A symbolic trade request. Immutable once constructed; `amount` is in
/// human units of the base asset regardless of side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub side: Side,
    /// Base asset symbol or mint address
    pub base: String,
    /// Quote asset symbol or mint address
    pub quote: String,
    /// Amount of base asset, human units
    pub amount: Decimal,
    /// Overrides the connector's configured default when set
    pub allowed_slippage_pct: Option<Decimal>,
    /// Price bound that must not be crossed for the trade to execute
    pub limit_price: Option<Decimal>,
}

impl TradeIntent {
    pub fn new(side: Side, base: impl Into<String>, quote: impl Into<String>, amount: Decimal) -> Self {
        Self {
            side,
            base: base.into(),
            quote: quote.into(),
            amount,
            allowed_slippage_pct: None,
            limit_price: None,
        }
    }

    pub fn with_slippage_pct(mut self, pct: Decimal) -> Self {
        self.allowed_slippage_pct = Some(pct);
        self
    }

    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.limit_price = Some(price);
        self
    }
}

/// A priced trade, valid for the instant it was computed. The venue payload
/// binds the chosen amounts to the transaction that will be built; it is
/// fixed for the life of a landing call even as the fee escalates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeQuote {
    pub side: Side,
    pub base: TokenInfo,
    pub quote: TokenInfo,
    /// The requested base amount in raw units, as placed on-chain
    pub request_raw_amount: u64,
    /// Raw amount entering the venue
    pub raw_input_amount: u64,
    /// Raw amount leaving the venue
    pub raw_output_amount: u64,
    /// Base-side amount in human units
    pub base_amount: Decimal,
    /// Quote-side (counter) amount in human units
    pub quote_amount: Decimal,
    /// quote_amount / base_amount, side-independent
    pub expected_price: Decimal,
    pub price_impact_pct: Decimal,
    /// Slippage tolerance the quote was computed at
    pub slippage_pct: Decimal,
    /// Opaque venue quote blob consumed by the transaction builder
    pub venue_payload: serde_json::Value,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LimitPriceError {
    #[error("swap price {expected} exceeds limit price {limit}")]
    ExceedsLimit { expected: Decimal, limit: Decimal },
    #[error("swap price {expected} below limit price {limit}")]
    BelowLimit { expected: Decimal, limit: Decimal },
}

/// Limit-price guard. Must run before any transaction is built: a violation
/// never reaches the landing protocol.
pub fn check_limit_price(
    side: Side,
    expected_price: Decimal,
    limit_price: Option<Decimal>,
) -> Result<(), LimitPriceError> {
    let Some(limit) = limit_price else {
        return Ok(());
    };
    match side {
        Side::Buy if expected_price > limit => Err(LimitPriceError::ExceedsLimit {
            expected: expected_price,
            limit,
        }),
        Side::Sell if expected_price < limit => Err(LimitPriceError::BelowLimit {
            expected: expected_price,
            limit,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        assert!("HODL".parse::<Side>().is_err());
    }

    #[test]
    fn test_buy_guard_fails_above_limit() {
        let err = check_limit_price(Side::Buy, dec!(10), Some(dec!(9))).unwrap_err();
        assert!(matches!(err, LimitPriceError::ExceedsLimit { .. }));
    }

    #[test]
    fn test_buy_guard_passes_below_limit() {
        assert!(check_limit_price(Side::Buy, dec!(10), Some(dec!(11))).is_ok());
    }

    #[test]
    fn test_sell_guard_fails_below_limit() {
        let err = check_limit_price(Side::Sell, dec!(10), Some(dec!(11))).unwrap_err();
        assert!(matches!(err, LimitPriceError::BelowLimit { .. }));
    }

    #[test]
    fn test_guard_passes_at_exact_limit() {
        assert!(check_limit_price(Side::Buy, dec!(10), Some(dec!(10))).is_ok());
        assert!(check_limit_price(Side::Sell, dec!(10), Some(dec!(10))).is_ok());
    }

    #[test]
    fn test_guard_skipped_without_limit() {
        assert!(check_limit_price(Side::Buy, dec!(10), None).is_ok());
    }

    #[test]
    fn test_intent_builder() {
        let intent = TradeIntent::new(Side::Sell, "SOL", "USDC", dec!(1.5))
            .with_slippage_pct(dec!(0.5))
            .with_limit_price(dec!(140));
        assert_eq!(intent.allowed_slippage_pct, Some(dec!(0.5)));
        assert_eq!(intent.limit_price, Some(dec!(140)));
    }
}
