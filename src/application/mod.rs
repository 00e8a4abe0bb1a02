//! Application Layer
//!
//! The three shared mechanisms every connector is built from: the connector
//! registry (one live instance per connector and network), the quote pipeline
//! (symbolic intent to priced quote), and the transaction-landing protocol
//! (fee-escalating sign, simulate, submit, confirm loop).

pub mod landing;
pub mod pipeline;
pub mod registry;

pub use landing::{
    land, pair_balance_changes, InstructionPlan, LandingError, LandingParams, LandingReceipt,
};
pub use pipeline::{quote_trade, QuoteError};
pub use registry::{
    AliasTable, ConnectorHandle, ConnectorId, ConnectorKind, ConnectorRegistry, ConnectorSettings,
    RegistryError,
};
