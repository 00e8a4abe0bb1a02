//! Raw Unit Conversion
//!
//! Converts between human-readable token amounts and the raw integer units
//! placed on-chain. Conversion to raw units always rounds toward zero so the
//! on-chain amount is reproducible bit-for-bit from the same input and never
//! exceeds what the caller asked for.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} overflows raw units at {1} decimals")]
    Overflow(Decimal, u8),
    #[error("unsupported decimal precision: {0}")]
    UnsupportedPrecision(u8),
}

/// Convert a human amount into raw integer units at the given precision,
/// truncating (floor for non-negative input) any fraction below one raw unit.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<u64, AmountError> {
    if amount.is_sign_negative() {
        return Err(AmountError::Negative(amount));
    }
    let factor = 10u64
        .checked_pow(decimals as u32)
        .ok_or(AmountError::UnsupportedPrecision(decimals))?;
    let scaled = amount
        .checked_mul(Decimal::from(factor))
        .ok_or(AmountError::Overflow(amount, decimals))?;
    scaled
        .trunc()
        .to_u64()
        .ok_or(AmountError::Overflow(amount, decimals))
}

/// Convert raw integer units back into a human amount. Exact: the raw value
/// is re-scaled, never divided through floating point.
pub fn from_raw_units(raw: u64, decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, decimals as u32)
}
