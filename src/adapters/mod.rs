//! Adapters
//!
//! Implementations of the ports against real infrastructure: the Solana RPC
//! layer, the Jupiter swap API, and the command-line surface.

pub mod cli;
pub mod jupiter;
pub mod solana;
