//! Gateway Integration Tests
//!
//! End-to-end behavior of the registry, quote pipeline, and landing protocol
//! wired together through a connector, with scripted port fakes in place of
//! the network and venue SDKs.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;

use solgate::adapters::solana::WalletManager;
use solgate::application::registry::{
    AliasTable, ConnectorHandle, ConnectorId, ConnectorKind, ConnectorRegistry, ConnectorSettings,
};
use solgate::application::{land, LandingError, LandingParams};
use solgate::config::GatewayConfig;
use solgate::connectors::RaydiumClmmConnector;
use solgate::domain::{FeeSchedule, Side, TradeIntent};
use solgate::ports::clmm::PoolState;
use solgate::ports::mocks::{MockClmmPool, MockNetwork, MockNetworkFactory, RecordingBuilder};
use solgate::ports::{
    NetworkError, SimulationVerdict, TokenBalanceChange, TxConfirmation, VenueQuote,
};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const POOL: &str = "61R1ndXxvsWXXkWSyNkCxnzwd3zUNB8Q2ibmkiLPC8ht";

fn network_with_tokens() -> MockNetwork {
    MockNetwork::new()
        .with_token("SOL", SOL_MINT, 9)
        .with_token("USDC", USDC_MINT, 6)
}

fn connector_handle(network: Arc<MockNetwork>) -> Arc<ConnectorHandle> {
    let mut markets = std::collections::HashMap::new();
    markets.insert("SOL-USDC".to_string(), POOL.to_string());
    Arc::new(ConnectorHandle {
        id: ConnectorId::new(ConnectorKind::RaydiumClmm, "mainnet-beta"),
        network,
        settings: ConnectorSettings {
            default_slippage_pct: dec!(1),
            compute_units: 1_000_000,
            fees: FeeSchedule::new(100, 2.0, 750),
            confirm_timeout: Duration::from_millis(10),
        },
        programs: AliasTable::default(),
        markets: AliasTable::new("raydium-clmm pool", markets),
    })
}

fn pool_with_quote() -> MockClmmPool {
    MockClmmPool::new(PoolState {
        address: POOL.to_string(),
        base_mint: SOL_MINT.to_string(),
        quote_mint: USDC_MINT.to_string(),
        current_price: dec!(140),
    })
    .with_quote(VenueQuote {
        in_amount: 1_000_000_000,
        out_amount: 140_000_000,
        other_amount_threshold: 138_600_000,
        price_impact_pct: dec!(0.05),
        payload: json!({"pool": POOL}),
    })
}

#[tokio::test]
async fn registry_initializes_each_connector_exactly_once_under_load() {
    let shared = Arc::new(MockNetwork::new());
    let factory = Arc::new(MockNetworkFactory::new(shared));
    let registry = Arc::new(ConnectorRegistry::new(
        GatewayConfig::default(),
        factory.clone(),
    ));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry.get(ConnectorKind::Meteora, "mainnet-beta").await
        }));
    }
    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    assert_eq!(factory.connect_count.load(Ordering::SeqCst), 1);
    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], handle));
    }
}

#[tokio::test]
async fn registry_retries_after_failed_initialization() {
    let shared = Arc::new(MockNetwork::new());
    let factory = Arc::new(MockNetworkFactory::new(shared).failing_first(2));
    let registry = ConnectorRegistry::new(GatewayConfig::default(), factory.clone());

    assert!(registry.get(ConnectorKind::Jupiter, "mainnet-beta").await.is_err());
    assert!(registry.get(ConnectorKind::Jupiter, "mainnet-beta").await.is_err());
    assert!(registry.get(ConnectorKind::Jupiter, "mainnet-beta").await.is_ok());
    assert_eq!(factory.connect_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn quoting_makes_no_network_submissions() {
    let network = Arc::new(network_with_tokens());
    let handle = connector_handle(network.clone());
    let connector = RaydiumClmmConnector::new(handle, Arc::new(pool_with_quote()));

    let intent = TradeIntent::new(Side::Sell, "SOL", "USDC", dec!(1));
    let first = connector.quote_swap("SOL-USDC", &intent).await.unwrap();
    let second = connector.quote_swap("SOL-USDC", &intent).await.unwrap();

    assert_eq!(first.expected_price, second.expected_price);
    assert_eq!(first.request_raw_amount, 1_000_000_000);
    // Quoting is read-only: nothing was simulated or submitted
    assert_eq!(network.simulate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(network.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fee_ladder_escalates_geometrically_then_exhausts() {
    let network = MockNetwork::new().with_fee_estimate(0);
    let keypair = Keypair::new();
    let builder = RecordingBuilder::new(keypair.pubkey());
    let params = LandingParams {
        compute_units: 1_000_000,
        fees: FeeSchedule::new(100, 2.0, 750),
        confirm_timeout: Duration::from_millis(5),
    };

    let err = land(&network, &[&keypair], &params, &builder)
        .await
        .unwrap_err();

    // 100 -> 200 -> 400 attempted; 800 would exceed the 750 ceiling
    assert_eq!(
        builder.attempts(),
        vec![(100, 1_000_000), (200, 1_000_000), (400, 1_000_000)]
    );
    assert_eq!(network.submit_calls.load(Ordering::SeqCst), 3);
    match err {
        LandingError::FeeCeilingExhausted {
            max_fee_attempted,
            ceiling,
            attempts,
        } => {
            assert_eq!(max_fee_attempted, 400);
            assert_eq!(ceiling, 750);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn simulation_rejection_aborts_the_ladder() {
    let network = MockNetwork::new()
        .with_fee_estimate(0)
        .push_simulation(Ok(SimulationVerdict::Rejected {
            reason: "custom program error: 0x1771".to_string(),
            logs: Vec::new(),
        }));
    let keypair = Keypair::new();
    let builder = RecordingBuilder::new(keypair.pubkey());
    let params = LandingParams {
        compute_units: 1_000_000,
        fees: FeeSchedule::new(100, 2.0, 750),
        confirm_timeout: Duration::from_millis(5),
    };

    let err = land(&network, &[&keypair], &params, &builder)
        .await
        .unwrap_err();

    assert!(matches!(err, LandingError::SimulationRejected { .. }));
    assert_eq!(network.simulate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(network.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transient_transport_failures_escalate_instead_of_aborting() {
    let network = MockNetwork::new()
        .with_fee_estimate(0)
        .push_simulation(Err(NetworkError::Rpc("503 service unavailable".into())))
        .with_confirmation(TxConfirmation {
            signature: "landed".to_string(),
            slot: 99,
            fee_lamports: 5000,
            balance_changes: Vec::new(),
        });
    let keypair = Keypair::new();
    let builder = RecordingBuilder::new(keypair.pubkey());
    let params = LandingParams {
        compute_units: 1_000_000,
        fees: FeeSchedule::new(100, 2.0, 750),
        confirm_timeout: Duration::from_millis(5),
    };

    let receipt = land(&network, &[&keypair], &params, &builder)
        .await
        .unwrap();

    assert_eq!(receipt.attempts, 2);
    assert_eq!(receipt.priority_fee_lamports, 200);
    assert_eq!(receipt.confirmation.signature, "landed");
}

#[tokio::test]
async fn executed_swap_reports_realized_amounts_from_the_chain() {
    let wallet = WalletManager::new_random();
    let owner = wallet.pubkey().to_string();
    // The chain settled slightly better than the 140.0 estimate
    let network = network_with_tokens().with_confirmation(TxConfirmation {
        signature: "swap-sig".to_string(),
        slot: 11,
        fee_lamports: 5000,
        balance_changes: vec![
            TokenBalanceChange {
                mint: SOL_MINT.to_string(),
                owner: owner.clone(),
                delta: dec!(-1),
            },
            TokenBalanceChange {
                mint: USDC_MINT.to_string(),
                owner,
                delta: dec!(140.12),
            },
        ],
    });
    let handle = connector_handle(Arc::new(network));
    let connector = RaydiumClmmConnector::new(handle, Arc::new(pool_with_quote()));

    let intent = TradeIntent::new(Side::Sell, "SOL", "USDC", dec!(1));
    let receipt = connector
        .execute_swap(&wallet, "SOL-USDC", &intent)
        .await
        .unwrap();

    assert_eq!(receipt.expected_price, dec!(140));
    assert_eq!(receipt.base_delta, dec!(-1));
    assert_eq!(receipt.quote_delta, dec!(140.12));
    assert_eq!(receipt.fee_lamports, 5000);
}

#[tokio::test]
async fn limit_price_violation_never_reaches_the_network() {
    let wallet = WalletManager::new_random();
    let network = Arc::new(network_with_tokens());
    let handle = connector_handle(network.clone());
    let pool = Arc::new(pool_with_quote());
    let connector = RaydiumClmmConnector::new(handle, pool.clone());

    let intent =
        TradeIntent::new(Side::Sell, "SOL", "USDC", dec!(1)).with_limit_price(dec!(150));
    let result = connector.execute_swap(&wallet, "SOL-USDC", &intent).await;

    assert!(result.is_err());
    assert_eq!(pool.swap_instruction_calls.load(Ordering::SeqCst), 0);
    assert_eq!(network.submit_calls.load(Ordering::SeqCst), 0);
}
