//! Domain Module
//!
//! Pure trade/quote types and the amount math shared by every connector.
//! Nothing here touches the network.

pub mod amounts;
pub mod fees;
pub mod trade;

pub use amounts::{from_raw_units, to_raw_units, AmountError};
pub use fees::FeeSchedule;
pub use trade::{check_limit_price, LimitPriceError, Side, TokenInfo, TradeIntent, TradeQuote};
