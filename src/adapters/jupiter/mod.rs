//! Jupiter Adapter
//!
//! HTTP client and wire types for the Jupiter swap API.

pub mod client;
pub mod types;

pub use client::{JupiterApiConfig, JupiterClient};
pub use types::{QuoteRequest, QuoteResponse, SwapRequest, SwapResponse};
