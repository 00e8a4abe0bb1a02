//! Network Client Port
//!
//! The boundary to the chain RPC layer. Implementations own the connection;
//! the gateway core only ever sees this trait. Suspension points of the
//! landing protocol (fee estimate, simulate, submit, confirm) all live here.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

use crate::domain::TokenInfo;

#[derive(Debug, Error, Clone)]
pub enum NetworkError {
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The transaction executed on-chain and failed. Same class as a
    /// simulation rejection: retrying the bytes at a higher fee cannot help.
    #[error("transaction failed on-chain: {0}")]
    TransactionFailed(String),
}

impl NetworkError {
    /// Whether the failure originated in the RPC transport rather than in
    /// on-chain logic. Transport failures are escalatable; a missing token
    /// or wallet is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, NetworkError::Rpc(_))
    }
}

/// Outcome of simulating a signed transaction.
///
/// `Rejected` means the chain itself would fail the transaction (insufficient
/// funds, constraint violation); a higher fee cannot fix that. A transport
/// failure during simulation surfaces as `Err(NetworkError)` instead and is
/// treated as escalatable by the landing protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationVerdict {
    Passed,
    Rejected { reason: String, logs: Vec<String> },
}

/// One realized balance movement of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceChange {
    /// Mint address (base58); the native mint for SOL movements
    pub mint: String,
    /// Owner wallet address
    pub owner: String,
    /// Signed human-unit delta (post minus pre)
    pub delta: Decimal,
}

/// The confirmation payload of a landed transaction. Balance changes are the
/// authoritative record of what actually moved; pre-trade estimates are
/// advisory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxConfirmation {
    pub signature: String,
    pub slot: u64,
    /// Total network fee paid, lamports
    pub fee_lamports: u64,
    pub balance_changes: Vec<TokenBalanceChange>,
}

impl TxConfirmation {
    /// Net human-unit delta for one (owner, mint) pair.
    pub fn delta_for(&self, owner: &str, mint: &str) -> Decimal {
        self.balance_changes
            .iter()
            .filter(|c| c.owner == owner && c.mint == mint)
            .map(|c| c.delta)
            .sum()
    }
}

/// Outcome of submitting a transaction and waiting for confirmation.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Confirmed(TxConfirmation),
    /// Not confirmed within the timeout. The transaction may still land
    /// later; the landing protocol treats this as evidence of underpricing.
    TimedOut { signature: String },
}

/// Stateful client for one network, shared read-only by concurrent requests.
#[async_trait]
pub trait NetworkPort: Send + Sync {
    /// Resolve a token symbol or mint address to its canonical descriptor.
    async fn resolve_token(&self, symbol_or_address: &str) -> Result<TokenInfo, NetworkError>;

    /// Current priority-fee estimate, micro-lamports per compute unit.
    async fn estimate_priority_fee(&self) -> Result<u64, NetworkError>;

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError>;

    async fn simulate(
        &self,
        tx: &VersionedTransaction,
    ) -> Result<SimulationVerdict, NetworkError>;

    /// Submit and wait for confirmation with a bounded timeout.
    async fn submit_and_confirm(
        &self,
        tx: &VersionedTransaction,
        timeout: Duration,
    ) -> Result<SubmitOutcome, NetworkError>;
}

/// Produces (and may cache) a network client per network name. The registry
/// calls this exactly once per connector identity.
#[async_trait]
pub trait NetworkFactory: Send + Sync {
    async fn connect(
        &self,
        network: &str,
    ) -> Result<std::sync::Arc<dyn NetworkPort>, NetworkError>;
}
