//! Solgate - Unified Trading Gateway Core for Solana
//!
//! One library surface over several independent on-chain protocols: the
//! Jupiter AMM aggregator, the Kamino lending market, and the Raydium CLMM
//! and Meteora DLMM concentrated-liquidity market makers. Each protocol is
//! reached through its own SDK boundary, but they all share the same three
//! pieces of machinery:
//!
//! - `application::registry`: one lazily-initialized connector handle per
//!   (connector, network) pair, with alias-to-address resolution
//! - `application::pipeline`: symbolic trade request -> exact raw amounts,
//!   expected price, and slippage/limit-price guards
//! - `application::landing`: sign, simulate, submit, confirm, and escalate
//!   the priority fee until a single terminal outcome is reached
//!
//! # Modules
//!
//! - `domain`: Pure trade/quote types and amount math
//! - `ports`: Trait abstractions for the network client and protocol SDKs
//! - `application`: Registry, quote pipeline, transaction-landing protocol
//! - `adapters`: External implementations (Solana RPC, Jupiter API, CLI)
//! - `connectors`: Per-protocol operations built on the shared machinery
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod connectors;
pub mod domain;
pub mod error;
pub mod ports;

pub use error::{ErrorKind, GatewayError};
