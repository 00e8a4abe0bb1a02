//! Port Fakes
//!
//! Call-recording fakes for every port, with scripted responses. Used by the
//! unit tests in this crate and the integration tests under `tests/`; all of
//! them are deterministic and make no network calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;

use crate::domain::TokenInfo;
use crate::ports::clmm::{ClmmPositionInfo, ClmmPositionQuote, DlmmPositionInfo};
use crate::ports::lending::{ObligationInfo, ReserveAction, ReserveInfo};
use crate::ports::network::{
    NetworkError, NetworkFactory, NetworkPort, SimulationVerdict, SubmitOutcome, TxConfirmation,
};
use crate::ports::venue::{SwapMode, SwapVenue, TransactionBuilder, VenueError, VenueQuote};

/// Scripted network client. Simulation and submission outcomes are consumed
/// front-to-back from queues; an empty queue falls back to `Passed` /
/// `TimedOut` so escalation paths need no per-attempt scripting.
#[derive(Default)]
pub struct MockNetwork {
    tokens: Vec<TokenInfo>,
    fee_estimate_micro_lamports: u64,
    simulate_plan: Mutex<VecDeque<Result<SimulationVerdict, NetworkError>>>,
    submit_plan: Mutex<VecDeque<Result<SubmitOutcome, NetworkError>>>,
    pub simulate_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, symbol: &str, address: &str, decimals: u8) -> Self {
        self.tokens.push(TokenInfo {
            address: address.to_string(),
            symbol: symbol.to_string(),
            decimals,
        });
        self
    }

    /// Priority-fee estimate returned at landing-loop entry, micro-lamports
    /// per compute unit.
    pub fn with_fee_estimate(mut self, micro_lamports_per_cu: u64) -> Self {
        self.fee_estimate_micro_lamports = micro_lamports_per_cu;
        self
    }

    pub fn push_simulation(self, verdict: Result<SimulationVerdict, NetworkError>) -> Self {
        self.simulate_plan.lock().unwrap().push_back(verdict);
        self
    }

    pub fn push_submit(self, outcome: Result<SubmitOutcome, NetworkError>) -> Self {
        self.submit_plan.lock().unwrap().push_back(outcome);
        self
    }

    /// Script a confirmation for the next submission.
    pub fn with_confirmation(self, confirmation: TxConfirmation) -> Self {
        self.push_submit(Ok(SubmitOutcome::Confirmed(confirmation)))
    }
}

#[async_trait]
impl NetworkPort for MockNetwork {
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
        Ok(self.fee_estimate_micro_lamports)
    }

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        Ok(Hash::default())
    }

    async fn simulate(
        &self,
        _tx: &VersionedTransaction,
    ) -> Result<SimulationVerdict, NetworkError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SimulationVerdict::Passed))
    }

    async fn submit_and_confirm(
        &self,
        _tx: &VersionedTransaction,
        _timeout: Duration,
    ) -> Result<SubmitOutcome, NetworkError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SubmitOutcome::TimedOut {
                signature: "mock-signature".to_string(),
            }))
    }
}

/// Factory handing out one shared [`MockNetwork`] while counting connects.
/// The registry singleton tests assert on `connect_count`.
pub struct MockNetworkFactory {
    network: Arc<MockNetwork>,
    pub connect_count: AtomicUsize,
    fail_first: AtomicUsize,
}

impl MockNetworkFactory {
    pub fn new(network: Arc<MockNetwork>) -> Self {
        Self {
            network,
            connect_count: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` connection attempts with an RPC error.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl NetworkFactory for MockNetworkFactory {
    async fn connect(&self, _network: &str) -> Result<Arc<dyn NetworkPort>, NetworkError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(NetworkError::Rpc("connection refused".to_string()));
        }
        Ok(self.network.clone() as Arc<dyn NetworkPort>)
    }
}

/// Venue returning one fixed quote for every request, recording the calls.
#[derive(Default)]
pub struct MockVenue {
    quote: Option<VenueQuote>,
    calls: Mutex<Vec<(String, String, u64, SwapMode, Decimal)>>,
}

impl MockVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: VenueQuote) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn calls(&self) -> Vec<(String, String, u64, SwapMode, Decimal)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapVenue for MockVenue {
    async fn market_quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        raw_amount: u64,
        mode: SwapMode,
        slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError> {
        self.calls.lock().unwrap().push((
            input.symbol.clone(),
            output.symbol.clone(),
            raw_amount,
            mode,
            slippage_pct,
        ));
        self.quote
            .clone()
            .ok_or_else(|| VenueError::Request("no quote configured".to_string()))
    }
}

/// Builder producing an empty transaction for `payer`, recording the fee and
/// compute budget of every attempt.
pub struct RecordingBuilder {
    payer: Pubkey,
    fees: Mutex<Vec<(u64, u32)>>,
}

impl RecordingBuilder {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            fees: Mutex::new(Vec::new()),
        }
    }

    /// (micro-lamports per CU, compute units) per attempt, in order.
    pub fn attempts(&self) -> Vec<(u64, u32)> {
        self.fees.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionBuilder for RecordingBuilder {
    async fn build(
        &self,
        priority_fee_micro_lamports_per_cu: u64,
        compute_units: u32,
    ) -> Result<VersionedTransaction, VenueError> {
        self.fees
            .lock()
            .unwrap()
            .push((priority_fee_micro_lamports_per_cu, compute_units));
        let message = Message::new_with_blockhash(&[], Some(&self.payer), &Hash::default());
        Ok(VersionedTransaction {
            signatures: Vec::new(),
            message: VersionedMessage::Legacy(message),
        })
    }
}

/// Scripted lending market for the Kamino connector tests.
#[derive(Default)]
pub struct MockLendingMarket {
    reserves: Vec<ReserveInfo>,
    obligation: Option<ObligationInfo>,
    instructions: Vec<Instruction>,
    pub instruction_calls: Mutex<Vec<(Pubkey, ReserveAction, u64)>>,
}

impl MockLendingMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserve(mut self, reserve: ReserveInfo) -> Self {
        self.reserves.push(reserve);
        self
    }

    pub fn with_obligation(mut self, obligation: ObligationInfo) -> Self {
        self.obligation = Some(obligation);
        self
    }
}

#[async_trait]
impl crate::ports::lending::LendingMarket for MockLendingMarket {
    async fn reserve_info(
        &self,
        _market: &Pubkey,
        _mint: &Pubkey,
    ) -> Result<ReserveInfo, VenueError> {
        self.reserves
            .first()
            .cloned()
            .ok_or_else(|| VenueError::Request("reserve not found".to_string()))
    }

    async fn reserves_info(&self, _market: &Pubkey) -> Result<Vec<ReserveInfo>, VenueError> {
        Ok(self.reserves.clone())
    }

    async fn obligation_info(
        &self,
        _market: &Pubkey,
        _owner: &Pubkey,
    ) -> Result<ObligationInfo, VenueError> {
        self.obligation
            .clone()
            .ok_or_else(|| VenueError::Request("obligation not found".to_string()))
    }

    async fn reserve_instructions(
        &self,
        _market: &Pubkey,
        mint: &Pubkey,
        _owner: &Pubkey,
        action: ReserveAction,
        raw_amount: u64,
    ) -> Result<Vec<Instruction>, VenueError> {
        self.instruction_calls
            .lock()
            .unwrap()
            .push((*mint, action, raw_amount));
        Ok(self.instructions.clone())
    }
}

/// Scripted DLMM pool for the Meteora connector tests. Bin ids are derived
/// linearly from price with the configured bin width in price units.
pub struct MockDlmmPool {
    state: crate::ports::clmm::PoolState,
    price_per_bin: Decimal,
    position: Option<DlmmPositionInfo>,
    listed: Vec<crate::ports::clmm::PoolState>,
    pub open_calls: Mutex<Vec<(i32, i32, u64, u64)>>,
    pub add_calls: Mutex<Vec<(Pubkey, u64, u64)>>,
}

impl MockDlmmPool {
    pub fn new(state: crate::ports::clmm::PoolState, price_per_bin: Decimal) -> Self {
        Self {
            state,
            price_per_bin,
            position: None,
            listed: Vec::new(),
            open_calls: Mutex::new(Vec::new()),
            add_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_position(mut self, position: DlmmPositionInfo) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_listed_pool(mut self, state: crate::ports::clmm::PoolState) -> Self {
        self.listed.push(state);
        self
    }
}

#[async_trait]
impl crate::ports::clmm::DlmmPool for MockDlmmPool {
    async fn pool_state(
        &self,
        _pool: &Pubkey,
    ) -> Result<crate::ports::clmm::PoolState, VenueError> {
        Ok(self.state.clone())
    }

    async fn pools(
        &self,
        limit: usize,
        mint_a: Option<&str>,
        mint_b: Option<&str>,
    ) -> Result<Vec<crate::ports::clmm::PoolState>, VenueError> {
        let holds = |state: &crate::ports::clmm::PoolState, mint: Option<&str>| match mint {
            Some(mint) => state.base_mint == mint || state.quote_mint == mint,
            None => true,
        };
        Ok(self
            .listed
            .iter()
            .filter(|state| holds(state, mint_a) && holds(state, mint_b))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn bin_id_for_price(
        &self,
        _pool: &Pubkey,
        price: Decimal,
        round_down: bool,
    ) -> Result<i32, VenueError> {
        use rust_decimal::prelude::ToPrimitive;
        let bins = price / self.price_per_bin;
        let id = if round_down { bins.floor() } else { bins.ceil() };
        id.to_i32()
            .ok_or_else(|| VenueError::InvalidPayload(format!("price {price} out of range")))
    }

    async fn position_info(
        &self,
        _position: &Pubkey,
    ) -> Result<DlmmPositionInfo, VenueError> {
        self.position
            .clone()
            .ok_or_else(|| VenueError::Request("position not found".to_string()))
    }

    async fn open_position_instructions(
        &self,
        _pool: &Pubkey,
        position: &Pubkey,
        owner: &Pubkey,
        min_bin_id: i32,
        max_bin_id: i32,
        raw_base_amount: u64,
        raw_quote_amount: u64,
        _strategy: crate::ports::clmm::DlmmStrategy,
        _slippage_pct: Decimal,
    ) -> Result<Vec<Instruction>, VenueError> {
        self.open_calls.lock().unwrap().push((
            min_bin_id,
            max_bin_id,
            raw_base_amount,
            raw_quote_amount,
        ));
        // The position account co-signs its own creation, as on-chain
        use solana_sdk::instruction::AccountMeta;
        Ok(vec![Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![
                AccountMeta::new(*owner, true),
                AccountMeta::new(*position, true),
            ],
        )])
    }

    async fn add_liquidity_instructions(
        &self,
        position: &Pubkey,
        _owner: &Pubkey,
        raw_base_amount: u64,
        raw_quote_amount: u64,
        _strategy: crate::ports::clmm::DlmmStrategy,
        _slippage_pct: Decimal,
    ) -> Result<Vec<Instruction>, VenueError> {
        self.add_calls
            .lock()
            .unwrap()
            .push((*position, raw_base_amount, raw_quote_amount));
        Ok(Vec::new())
    }
}

/// Scripted Raydium CLMM pool for connector tests. Tick ids are derived
/// linearly from price with the configured tick size in price units.
pub struct MockClmmPool {
    state: crate::ports::clmm::PoolState,
    price_per_tick: Decimal,
    quote: Option<VenueQuote>,
    position_quote: Option<ClmmPositionQuote>,
    positions: Vec<ClmmPositionInfo>,
    pub swap_instruction_calls: AtomicUsize,
    pub open_calls: Mutex<Vec<(i32, i32, ClmmPositionQuote)>>,
}

impl MockClmmPool {
    pub fn new(state: crate::ports::clmm::PoolState) -> Self {
        Self {
            state,
            price_per_tick: Decimal::ONE,
            quote: None,
            position_quote: None,
            positions: Vec::new(),
            swap_instruction_calls: AtomicUsize::new(0),
            open_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_quote(mut self, quote: VenueQuote) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn with_position_quote(mut self, quote: ClmmPositionQuote) -> Self {
        self.position_quote = Some(quote);
        self
    }

    pub fn with_position(mut self, position: ClmmPositionInfo) -> Self {
        self.positions.push(position);
        self
    }
}

#[async_trait]
impl crate::ports::clmm::ClmmPool for MockClmmPool {
    async fn pool_state(
        &self,
        _pool: &Pubkey,
    ) -> Result<crate::ports::clmm::PoolState, VenueError> {
        Ok(self.state.clone())
    }

    async fn compute_swap(
        &self,
        _pool: &Pubkey,
        _mode: SwapMode,
        _raw_amount: u64,
        _slippage_pct: Decimal,
    ) -> Result<VenueQuote, VenueError> {
        self.quote
            .clone()
            .ok_or_else(|| VenueError::Request("no quote configured".to_string()))
    }

    async fn swap_instructions(
        &self,
        _pool: &Pubkey,
        _payload: &serde_json::Value,
        _owner: &Pubkey,
    ) -> Result<Vec<Instruction>, VenueError> {
        self.swap_instruction_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn tick_for_price(
        &self,
        _pool: &Pubkey,
        price: Decimal,
    ) -> Result<i32, VenueError> {
        use rust_decimal::prelude::ToPrimitive;
        (price / self.price_per_tick)
            .floor()
            .to_i32()
            .ok_or_else(|| VenueError::InvalidPayload(format!("price {price} out of range")))
    }

    async fn quote_position(
        &self,
        _pool: &Pubkey,
        _lower_tick: i32,
        _upper_tick: i32,
        _raw_base_amount: u64,
        _raw_quote_amount: u64,
        _slippage_pct: Decimal,
    ) -> Result<ClmmPositionQuote, VenueError> {
        self.position_quote
            .clone()
            .ok_or_else(|| VenueError::Request("no position quote configured".to_string()))
    }

    async fn open_position_instructions(
        &self,
        _pool: &Pubkey,
        owner: &Pubkey,
        lower_tick: i32,
        upper_tick: i32,
        quote: &ClmmPositionQuote,
    ) -> Result<(Pubkey, Vec<Instruction>), VenueError> {
        self.open_calls
            .lock()
            .unwrap()
            .push((lower_tick, upper_tick, quote.clone()));
        use solana_sdk::instruction::AccountMeta;
        let position = Pubkey::new_unique();
        let instruction = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![AccountMeta::new(*owner, true)],
        );
        Ok((position, vec![instruction]))
    }

    async fn position_info(
        &self,
        _position: &Pubkey,
    ) -> Result<ClmmPositionInfo, VenueError> {
        self.positions
            .first()
            .cloned()
            .ok_or_else(|| VenueError::Request("position not found".to_string()))
    }

    async fn positions_owned(
        &self,
        _owner: &Pubkey,
    ) -> Result<Vec<ClmmPositionInfo>, VenueError> {
        Ok(self.positions.clone())
    }
}
