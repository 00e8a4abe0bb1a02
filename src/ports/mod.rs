//! Ports Module
//!
//! Trait boundaries to every external collaborator: the chain network client,
//! the swap venues, and the protocol SDKs whose internal math is consumed but
//! never reimplemented here. `mocks` provides call-recording fakes used by
//! unit and integration tests.

pub mod clmm;
pub mod lending;
pub mod mocks;
pub mod network;
pub mod venue;

pub use network::{
    NetworkError, NetworkFactory, NetworkPort, SimulationVerdict, SubmitOutcome,
    TokenBalanceChange, TxConfirmation,
};
pub use venue::{SwapMode, SwapVenue, TransactionBuilder, VenueError, VenueQuote};
