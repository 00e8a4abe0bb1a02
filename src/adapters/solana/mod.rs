//! Solana Adapters
//!
//! The RPC-backed network client and local wallet handling.

pub mod rpc;
pub mod wallet;

pub use rpc::{SolanaRpc, SolanaRpcFactory};
pub use wallet::{WalletError, WalletManager};
