//! Solana RPC Network Client
//!
//! Implements the network port over the blocking `RpcClient`, bridged into
//! the async runtime with `spawn_blocking`. Token resolution is served from
//! the configured token table; everything else goes to the node.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    UiTransactionEncoding, UiTransactionStatusMeta, UiTransactionTokenBalance,
};
use tracing::{debug, warn};

use crate::config::{GatewayConfig, NetworkSection};
use crate::domain::TokenInfo;
use crate::ports::{
    NetworkError, NetworkFactory, NetworkPort, SimulationVerdict, SubmitOutcome,
    TokenBalanceChange, TxConfirmation,
};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const NATIVE_DECIMALS: u32 = 9;

fn parse_commitment(commitment: &str) -> CommitmentConfig {
    match commitment {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

/// RPC-backed network client for one network.
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    tokens: Vec<TokenInfo>,
}

impl SolanaRpc {
    pub fn from_section(section: &NetworkSection) -> Self {
        let tokens = section
            .tokens
            .iter()
            .map(|(symbol, entry)| TokenInfo {
                address: entry.mint.clone(),
                symbol: symbol.clone(),
                decimals: entry.decimals,
            })
            .collect();
        Self::new(section.get_rpc_url(), &section.commitment, tokens)
    }

    pub fn new(rpc_url: String, commitment: &str, tokens: Vec<TokenInfo>) -> Self {
        let commitment = parse_commitment(commitment);
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self {
            client,
            commitment,
            tokens,
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, NetworkError>
    where
        T: Send + 'static,
        F: FnOnce(&RpcClient) -> Result<T, NetworkError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| NetworkError::Rpc(format!("task join error: {e}")))?
    }

    async fn fetch_confirmation(
        &self,
        signature: Signature,
    ) -> Result<TxConfirmation, NetworkError> {
        let commitment = self.commitment;
        self.blocking(move |client| {
            let config = RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::Base64),
                commitment: Some(commitment),
                max_supported_transaction_version: Some(0),
            };
            let response = client
                .get_transaction_with_config(&signature, config)
                .map_err(|e| NetworkError::Rpc(e.to_string()))?;
            let meta = response.transaction.meta.ok_or_else(|| {
                NetworkError::Rpc(format!("transaction {signature} has no meta"))
            })?;
            let decoded = response.transaction.transaction.decode().ok_or_else(|| {
                NetworkError::Rpc(format!("transaction {signature} is not decodable"))
            })?;
            let account_keys: Vec<String> = decoded
                .message
                .static_account_keys()
                .iter()
                .map(|k| k.to_string())
                .collect();
            Ok(build_confirmation(
                signature,
                response.slot,
                &meta,
                &account_keys,
            ))
        })
        .await
    }
}

/// Assemble the confirmation payload from transaction meta: the fee plus the
/// realized native and token balance deltas keyed by owner and mint.
fn build_confirmation(
    signature: Signature,
    slot: u64,
    meta: &UiTransactionStatusMeta,
    account_keys: &[String],
) -> TxConfirmation {
    let native_mint = spl_token::native_mint::ID.to_string();
    let mut balance_changes = Vec::new();

    for (index, owner) in account_keys.iter().enumerate() {
        let pre = meta.pre_balances.get(index).copied().unwrap_or(0);
        let post = meta.post_balances.get(index).copied().unwrap_or(0);
        if pre != post {
            balance_changes.push(TokenBalanceChange {
                mint: native_mint.clone(),
                owner: owner.clone(),
                delta: Decimal::from_i128_with_scale(post as i128 - pre as i128, NATIVE_DECIMALS),
            });
        }
    }

    let mut token_deltas: HashMap<(String, String), (i128, u32)> = HashMap::new();
    accumulate_token_balances(&meta.pre_token_balances, account_keys, -1, &mut token_deltas);
    accumulate_token_balances(&meta.post_token_balances, account_keys, 1, &mut token_deltas);
    for ((owner, mint), (raw_delta, decimals)) in token_deltas {
        if raw_delta == 0 {
            continue;
        }
        balance_changes.push(TokenBalanceChange {
            mint,
            owner,
            delta: Decimal::from_i128_with_scale(raw_delta, decimals),
        });
    }

    TxConfirmation {
        signature: signature.to_string(),
        slot,
        fee_lamports: meta.fee,
        balance_changes,
    }
}

fn accumulate_token_balances(
    balances: &OptionSerializer<Vec<UiTransactionTokenBalance>>,
    account_keys: &[String],
    sign: i128,
    deltas: &mut HashMap<(String, String), (i128, u32)>,
) {
    let OptionSerializer::Some(balances) = balances else {
        return;
    };
    for balance in balances {
        let owner = match &balance.owner {
            OptionSerializer::Some(owner) => owner.clone(),
            _ => match account_keys.get(balance.account_index as usize) {
                Some(key) => key.clone(),
                None => continue,
            },
        };
        let Ok(raw) = balance.ui_token_amount.amount.parse::<i128>() else {
            continue;
        };
        let decimals = balance.ui_token_amount.decimals as u32;
        let entry = deltas
            .entry((owner, balance.mint.clone()))
            .or_insert((0, decimals));
        entry.0 += raw * sign;
    }
}

#[async_trait]
impl NetworkPort for SolanaRpc {
    async fn resolve_token(&self, symbol_or_address: &str) -> Result<TokenInfo, NetworkError> {
        self.tokens
            .iter()
            .find(|t| {
                t.symbol.eq_ignore_ascii_case(symbol_or_address)
                    || t.address == symbol_or_address
            })
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("token {symbol_or_address}")))
    }

    async fn estimate_priority_fee(&self) -> Result<u64, NetworkError> {
        self.blocking(|client| {
            let fees = client
                .get_recent_prioritization_fees(&[])
                .map_err(|e| NetworkError::Rpc(e.to_string()))?;
            Ok(fees.iter().map(|f| f.prioritization_fee).max().unwrap_or(0))
        })
        .await
    }

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.blocking(|client| {
            client
                .get_latest_blockhash()
                .map_err(|e| NetworkError::Rpc(e.to_string()))
        })
        .await
    }

    async fn simulate(
        &self,
        tx: &VersionedTransaction,
    ) -> Result<SimulationVerdict, NetworkError> {
        let tx = tx.clone();
        self.blocking(move |client| {
            let response = client
                .simulate_transaction(&tx)
                .map_err(|e| NetworkError::Rpc(e.to_string()))?;
            match response.value.err {
                Some(err) => Ok(SimulationVerdict::Rejected {
                    reason: err.to_string(),
                    logs: response.value.logs.unwrap_or_default(),
                }),
                None => Ok(SimulationVerdict::Passed),
            }
        })
        .await
    }

    async fn submit_and_confirm(
        &self,
        tx: &VersionedTransaction,
        timeout: Duration,
    ) -> Result<SubmitOutcome, NetworkError> {
        // Preflight already ran as an explicit simulation step
        let send_config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..RpcSendTransactionConfig::default()
        };
        let tx_clone = tx.clone();
        let signature = self
            .blocking(move |client| {
                client
                    .send_transaction_with_config(&tx_clone, send_config)
                    .map_err(|e| NetworkError::Rpc(e.to_string()))
            })
            .await?;
        debug!(%signature, "transaction submitted");

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = self
                .blocking(move |client| {
                    client
                        .get_signature_statuses(&[signature])
                        .map(|response| response.value.into_iter().next().flatten())
                        .map_err(|e| NetworkError::Rpc(e.to_string()))
                })
                .await?;

            if let Some(status) = status {
                if let Some(err) = status.err {
                    warn!(%signature, error = %err, "transaction failed on-chain");
                    return Err(NetworkError::TransactionFailed(err.to_string()));
                }
                if status.satisfies_commitment(self.commitment) {
                    let confirmation = self.fetch_confirmation(signature).await?;
                    return Ok(SubmitOutcome::Confirmed(confirmation));
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(SubmitOutcome::TimedOut {
                    signature: signature.to_string(),
                });
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}

/// Builds and caches one [`SolanaRpc`] per configured network.
pub struct SolanaRpcFactory {
    config: GatewayConfig,
    clients: Mutex<HashMap<String, Arc<SolanaRpc>>>,
}

impl SolanaRpcFactory {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl NetworkFactory for SolanaRpcFactory {
    async fn connect(&self, network: &str) -> Result<Arc<dyn NetworkPort>, NetworkError> {
        let section = self
            .config
            .network(network)
            .ok_or_else(|| NetworkError::NotFound(format!("network {network}")))?;
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| NetworkError::Rpc("client cache lock poisoned".to_string()))?;
        let client = clients
            .entry(network.to_string())
            .or_insert_with(|| Arc::new(SolanaRpc::from_section(section)))
            .clone();
        Ok(client as Arc<dyn NetworkPort>)
    }
}

// Pubkey strings in the token table are validated at resolve time by the
// callers that need a Pubkey; keep a helper for them.
pub fn parse_pubkey(address: &str) -> Result<solana_sdk::pubkey::Pubkey, NetworkError> {
    solana_sdk::pubkey::Pubkey::from_str(address)
        .map_err(|_| NetworkError::InvalidAddress(address.to_string()))
}
