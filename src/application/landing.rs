//! Transaction Landing Protocol
//!
//! The fee-escalating loop every state-changing operation goes through:
//! estimate a priority fee, then build, sign, simulate, submit, and await
//! confirmation, doubling down on the fee after each timeout until the
//! transaction lands or the fee ceiling is exhausted. A simulation rejection
//! aborts immediately: the chain would fail the same bytes at any fee.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::registry::ConnectorSettings;
use crate::domain::FeeSchedule;
use crate::ports::{
    NetworkError, NetworkPort, SimulationVerdict, SubmitOutcome, TransactionBuilder,
    TxConfirmation, VenueError,
};

#[derive(Debug, Error)]
pub enum LandingError {
    #[error("priority fee estimation failed: {0}")]
    FeeEstimate(NetworkError),
    #[error("transaction build failed: {0}")]
    Build(VenueError),
    #[error("transaction signing failed: {0}")]
    Signing(String),
    #[error("transaction rejected in simulation: {reason}")]
    SimulationRejected { reason: String },
    #[error(
        "transaction not confirmed after {attempts} attempts up to {max_fee_attempted} lamports \
         (ceiling {ceiling})"
    )]
    FeeCeilingExhausted {
        max_fee_attempted: u64,
        ceiling: u64,
        attempts: u32,
    },
    #[error(transparent)]
    Network(NetworkError),
}

/// Landing-loop inputs, fixed for the life of one call.
#[derive(Debug, Clone)]
pub struct LandingParams {
    pub compute_units: u32,
    pub fees: FeeSchedule,
    pub confirm_timeout: Duration,
}

impl From<&ConnectorSettings> for LandingParams {
    fn from(settings: &ConnectorSettings) -> Self {
        Self {
            compute_units: settings.compute_units,
            fees: settings.fees,
            confirm_timeout: settings.confirm_timeout,
        }
    }
}

/// A landed transaction: the confirmation plus what it took to get there.
#[derive(Debug, Clone)]
pub struct LandingReceipt {
    pub confirmation: TxConfirmation,
    /// Submission attempts made, including the successful one
    pub attempts: u32,
    /// Priority fee of the confirmed attempt, total lamports
    pub priority_fee_lamports: u64,
}

fn total_to_micro_per_cu(total_lamports: u64, compute_units: u32) -> u64 {
    (total_lamports as u128 * 1_000_000 / compute_units.max(1) as u128) as u64
}

fn micro_per_cu_to_total(micro_lamports: u64, compute_units: u32) -> u64 {
    (micro_lamports as u128 * compute_units as u128 / 1_000_000) as u64
}

/// Land one logical transaction.
///
/// The builder is invoked fresh per attempt with the current fee; the quoted
/// amounts it encodes never change across attempts. Submission timeouts and
/// transient transport failures escalate the fee; a simulation rejection or a
/// non-transient failure aborts the loop.
pub async fn land(
    network: &dyn NetworkPort,
    signers: &[&Keypair],
    params: &LandingParams,
    builder: &dyn TransactionBuilder,
) -> Result<LandingReceipt, LandingError> {
    let estimate_micro = network
        .estimate_priority_fee()
        .await
        .map_err(LandingError::FeeEstimate)?;
    let estimate_total = micro_per_cu_to_total(estimate_micro, params.compute_units);
    let mut fee = params.fees.first_fee.max(estimate_total);
    let mut attempts: u32 = 0;
    // Stays zero until an attempt is actually made; a seed already above the
    // ceiling exhausts the ladder without ever naming a fee as attempted
    let mut max_fee_attempted: u64 = 0;

    while params.fees.within_ceiling(fee) {
        attempts += 1;
        max_fee_attempted = fee;
        let micro_per_cu = total_to_micro_per_cu(fee, params.compute_units);
        info!(
            attempt = attempts,
            priority_fee_lamports = fee,
            micro_lamports_per_cu = micro_per_cu,
            "building transaction attempt"
        );

        let unsigned = builder
            .build(micro_per_cu, params.compute_units)
            .await
            .map_err(LandingError::Build)?;
        let signed = VersionedTransaction::try_new(unsigned.message, &signers.to_vec())
            .map_err(|e| LandingError::Signing(e.to_string()))?;

        match network.simulate(&signed).await {
            Ok(SimulationVerdict::Passed) => {}
            Ok(SimulationVerdict::Rejected { reason, logs }) => {
                warn!(%reason, ?logs, "simulation rejected transaction");
                return Err(LandingError::SimulationRejected { reason });
            }
            Err(err) if err.is_transient() => {
                warn!(error = %err, "simulation unavailable, escalating fee");
                fee = params.fees.next_fee(fee);
                continue;
            }
            Err(err) => return Err(LandingError::Network(err)),
        }

        match network.submit_and_confirm(&signed, params.confirm_timeout).await {
            Ok(SubmitOutcome::Confirmed(confirmation)) => {
                info!(
                    signature = %confirmation.signature,
                    slot = confirmation.slot,
                    attempts,
                    priority_fee_lamports = fee,
                    "transaction confirmed"
                );
                return Ok(LandingReceipt {
                    confirmation,
                    attempts,
                    priority_fee_lamports: fee,
                });
            }
            Ok(SubmitOutcome::TimedOut { signature }) => {
                warn!(%signature, priority_fee_lamports = fee, "confirmation timed out");
            }
            Err(err) if err.is_transient() => {
                warn!(error = %err, "submission failed, escalating fee");
            }
            Err(err) => return Err(LandingError::Network(err)),
        }

        fee = params.fees.next_fee(fee);
    }

    Err(LandingError::FeeCeilingExhausted {
        max_fee_attempted,
        ceiling: params.fees.max_fee,
        attempts,
    })
}

/// Realized (base, quote) deltas for `owner` from a confirmation. The signs
/// follow the trade: base positive on a buy, negative on a sell.
pub fn pair_balance_changes(
    confirmation: &TxConfirmation,
    owner: &str,
    base_mint: &str,
    quote_mint: &str,
) -> (Decimal, Decimal) {
    (
        confirmation.delta_for(owner, base_mint),
        confirmation.delta_for(owner, quote_mint),
    )
}

/// Builder over a fixed instruction list. Each attempt prepends the compute
/// budget for the current fee and rebuilds against a fresh blockhash.
pub struct InstructionPlan {
    network: Arc<dyn NetworkPort>,
    payer: Pubkey,
    instructions: Vec<Instruction>,
}

impl InstructionPlan {
    pub fn new(
        network: Arc<dyn NetworkPort>,
        payer: Pubkey,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            network,
            payer,
            instructions,
        }
    }
}

#[async_trait::async_trait]
impl TransactionBuilder for InstructionPlan {
    async fn build(
        &self,
        priority_fee_micro_lamports_per_cu: u64,
        compute_units: u32,
    ) -> Result<VersionedTransaction, VenueError> {
        let mut instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(compute_units),
            ComputeBudgetInstruction::set_compute_unit_price(priority_fee_micro_lamports_per_cu),
        ];
        instructions.extend(self.instructions.iter().cloned());

        let blockhash = self.network.latest_blockhash().await?;
        let message = Message::new_with_blockhash(&instructions, Some(&self.payer), &blockhash);
        Ok(VersionedTransaction {
            signatures: Vec::new(),
            message: VersionedMessage::Legacy(message),
        })
    }
}
