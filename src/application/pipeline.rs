//! Quote Pipeline
//!
//! Turns a symbolic trade intent into a priced quote: resolve both tokens,
//! convert the human-unit amount to raw units, ask the venue for the counter
//! amount, and derive the expected price. Quoting never builds a transaction
//! and never mutates state; executing connectors run the limit-price guard
//! on the result before anything is signed.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::application::registry::ConnectorHandle;
use crate::domain::{
    check_limit_price, from_raw_units, to_raw_units, AmountError, LimitPriceError, TradeIntent,
    TradeQuote, Side,
};
use crate::ports::{NetworkError, SwapMode, SwapVenue, VenueError};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("token {token} not found")]
    TokenNotFound { token: String },
    #[error("amount {amount} is below one raw unit at {decimals} decimals")]
    AmountTooSmall { amount: Decimal, decimals: u8 },
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    #[error(transparent)]
    Limit(#[from] LimitPriceError),
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error(transparent)]
    Network(NetworkError),
}

fn resolve_error(token: &str, err: NetworkError) -> QuoteError {
    match err {
        NetworkError::NotFound(_) => QuoteError::TokenNotFound {
            token: token.to_string(),
        },
        other => QuoteError::Network(other),
    }
}

/// Price `intent` against `venue`.
///
/// The requested amount is always in base-asset units. A buy fixes the
/// output leg (acquire exactly this much base), a sell fixes the input leg
/// (dispose of exactly this much base); the venue prices the floating leg.
pub async fn quote_trade(
    handle: &ConnectorHandle,
    venue: &dyn SwapVenue,
    intent: &TradeIntent,
) -> Result<TradeQuote, QuoteError> {
    let base = handle
        .network
        .resolve_token(&intent.base)
        .await
        .map_err(|e| resolve_error(&intent.base, e))?;
    let quote = handle
        .network
        .resolve_token(&intent.quote)
        .await
        .map_err(|e| resolve_error(&intent.quote, e))?;

    let request_raw_amount = to_raw_units(intent.amount, base.decimals)?;
    if request_raw_amount == 0 {
        return Err(QuoteError::AmountTooSmall {
            amount: intent.amount,
            decimals: base.decimals,
        });
    }

    let slippage_pct = intent
        .allowed_slippage_pct
        .unwrap_or(handle.settings.default_slippage_pct);

    let (input, output, mode) = match intent.side {
        Side::Buy => (&quote, &base, SwapMode::ExactOut),
        Side::Sell => (&base, &quote, SwapMode::ExactIn),
    };
    debug!(
        connector = %handle.id,
        side = intent.side.as_str(),
        base = %base.symbol,
        quote = %quote.symbol,
        raw_amount = request_raw_amount,
        mode = mode.as_str(),
        "requesting venue quote"
    );

    let venue_quote = venue
        .market_quote(input, output, request_raw_amount, mode, slippage_pct)
        .await?;

    // The base leg is the fixed one: venue output on a buy, input on a sell
    let (raw_base, raw_quote) = match intent.side {
        Side::Buy => (venue_quote.out_amount, venue_quote.in_amount),
        Side::Sell => (venue_quote.in_amount, venue_quote.out_amount),
    };
    let base_amount = from_raw_units(raw_base, base.decimals);
    let quote_amount = from_raw_units(raw_quote, quote.decimals);
    if base_amount.is_zero() {
        return Err(QuoteError::Venue(VenueError::InvalidPayload(
            "venue quoted a zero base amount".to_string(),
        )));
    }
    let expected_price = quote_amount / base_amount;

    Ok(TradeQuote {
        side: intent.side,
        base,
        quote,
        request_raw_amount,
        raw_input_amount: venue_quote.in_amount,
        raw_output_amount: venue_quote.out_amount,
        base_amount,
        quote_amount,
        expected_price,
        price_impact_pct: venue_quote.price_impact_pct,
        slippage_pct,
        venue_payload: venue_quote.payload,
    })
}

/// Pre-execution limit-price guard over a computed quote.
pub fn enforce_limit(quote: &TradeQuote, limit_price: Option<Decimal>) -> Result<(), QuoteError> {
    check_limit_price(quote.side, quote.expected_price, limit_price)?;
    Ok(())
}
