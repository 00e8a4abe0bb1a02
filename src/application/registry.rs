//! Connector Registry
//!
//! One live connector handle per (kind, network) pair, created lazily on
//! first use. Concurrent first requests collapse onto a single initialization;
//! a failed initialization is returned to the caller and never cached, so the
//! next request retries from scratch.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ConnectorTables, GatewayConfig, NetworkSection};
use crate::domain::FeeSchedule;
use crate::ports::{NetworkError, NetworkFactory, NetworkPort};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("network {network} is not configured")]
    UnsupportedNetwork { network: String },
    #[error("unknown {table}: {value}")]
    UnknownAlias { table: String, value: String },
    #[error("configured {table} entry {alias} holds an invalid address: {address}")]
    InvalidTableAddress {
        table: String,
        alias: String,
        address: String,
    },
    #[error(transparent)]
    Init(#[from] NetworkError),
    #[error("connector configuration error: {0}")]
    Config(String),
}

/// The connectors this gateway ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    Jupiter,
    Kamino,
    RaydiumClmm,
    Meteora,
}

impl ConnectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Jupiter => "jupiter",
            ConnectorKind::Kamino => "kamino",
            ConnectorKind::RaydiumClmm => "raydium-clmm",
            ConnectorKind::Meteora => "meteora",
        }
    }
}

impl FromStr for ConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jupiter" => Ok(ConnectorKind::Jupiter),
            "kamino" => Ok(ConnectorKind::Kamino),
            "raydium-clmm" => Ok(ConnectorKind::RaydiumClmm),
            "meteora" => Ok(ConnectorKind::Meteora),
            other => Err(format!("unknown connector: {other}")),
        }
    }
}

/// Registry key: connector kind plus network name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorId {
    pub kind: ConnectorKind,
    pub network: String,
}

impl ConnectorId {
    pub fn new(kind: ConnectorKind, network: impl Into<String>) -> Self {
        Self {
            kind,
            network: network.into(),
        }
    }
}

impl std::fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.network)
    }
}

/// Alias-to-address lookup table for one connector on one network.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    name: String,
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(name: impl Into<String>, entries: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Strict lookup: the value must be a configured alias.
    pub fn resolve(&self, alias: &str) -> Result<Pubkey, RegistryError> {
        let address = self
            .entries
            .get(alias)
            .ok_or_else(|| RegistryError::UnknownAlias {
                table: self.name.clone(),
                value: alias.to_string(),
            })?;
        Pubkey::from_str(address).map_err(|_| RegistryError::InvalidTableAddress {
            table: self.name.clone(),
            alias: alias.to_string(),
            address: address.clone(),
        })
    }

    /// Permissive lookup: a configured alias, or a literal base58 address.
    pub fn resolve_or_literal(&self, value: &str) -> Result<Pubkey, RegistryError> {
        if self.entries.contains_key(value) {
            return self.resolve(value);
        }
        Pubkey::from_str(value).map_err(|_| RegistryError::UnknownAlias {
            table: self.name.clone(),
            value: value.to_string(),
        })
    }
}

/// Per-connector operating parameters, fixed at initialization.
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    pub default_slippage_pct: Decimal,
    pub compute_units: u32,
    pub fees: FeeSchedule,
    pub confirm_timeout: Duration,
}

impl ConnectorSettings {
    fn from_sections(network: &NetworkSection, default_slippage_pct: Decimal) -> Self {
        Self {
            default_slippage_pct,
            compute_units: network.default_compute_units,
            fees: network.fee_schedule(),
            confirm_timeout: network.confirm_timeout(),
        }
    }
}

/// A live connector: its identity, network client, settings, and the alias
/// tables it resolves programs and markets against.
pub struct ConnectorHandle {
    pub id: ConnectorId,
    pub network: Arc<dyn NetworkPort>,
    pub settings: ConnectorSettings,
    pub programs: AliasTable,
    pub markets: AliasTable,
}

type HandleCell = Arc<OnceCell<Arc<ConnectorHandle>>>;

/// Lazy singleton store for connector handles.
pub struct ConnectorRegistry {
    config: GatewayConfig,
    factory: Arc<dyn NetworkFactory>,
    cells: Mutex<HashMap<ConnectorId, HandleCell>>,
}

impl ConnectorRegistry {
    pub fn new(config: GatewayConfig, factory: Arc<dyn NetworkFactory>) -> Self {
        Self {
            config,
            factory,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The handle for `kind` on `network`, initializing it on first use.
    /// Concurrent callers during initialization all receive the same handle;
    /// if initialization fails, the error propagates and nothing is cached.
    pub async fn get(
        &self,
        kind: ConnectorKind,
        network: &str,
    ) -> Result<Arc<ConnectorHandle>, RegistryError> {
        let id = ConnectorId::new(kind, network);
        let cell = {
            let mut cells = self.cells.lock().map_err(|_| {
                RegistryError::Config("registry lock poisoned".to_string())
            })?;
            cells.entry(id.clone()).or_default().clone()
        };

        let handle = cell
            .get_or_try_init(|| self.init_handle(&id))
            .await?
            .clone();
        Ok(handle)
    }

    async fn init_handle(&self, id: &ConnectorId) -> Result<Arc<ConnectorHandle>, RegistryError> {
        let section = self.config.network(&id.network).ok_or_else(|| {
            RegistryError::UnsupportedNetwork {
                network: id.network.clone(),
            }
        })?;
        debug!(connector = %id, "initializing connector");

        let network = self.factory.connect(&id.network).await?;

        let (slippage, tables) = match id.kind {
            ConnectorKind::Jupiter => (self.config.jupiter.default_slippage_pct, None),
            ConnectorKind::Kamino => {
                (self.config.kamino.default_slippage_pct, Some(&self.config.kamino))
            }
            ConnectorKind::RaydiumClmm => (
                self.config.raydium_clmm.default_slippage_pct,
                Some(&self.config.raydium_clmm),
            ),
            ConnectorKind::Meteora => {
                (self.config.meteora.default_slippage_pct, Some(&self.config.meteora))
            }
        };

        let (programs, markets) = match tables {
            Some(tables) => alias_tables(id, tables),
            None => (AliasTable::default(), AliasTable::default()),
        };

        let handle = Arc::new(ConnectorHandle {
            id: id.clone(),
            network,
            settings: ConnectorSettings::from_sections(section, slippage),
            programs,
            markets,
        });
        info!(connector = %id, "connector ready");
        Ok(handle)
    }
}

fn alias_tables(id: &ConnectorId, tables: &ConnectorTables) -> (AliasTable, AliasTable) {
    let programs = tables
        .program_ids
        .get(&id.network)
        .cloned()
        .unwrap_or_default();
    let markets = tables.markets.get(&id.network).cloned().unwrap_or_default();
    (
        AliasTable::new(format!("{} program", id.kind.as_str()), programs),
        AliasTable::new(format!("{} market", id.kind.as_str()), markets),
    )
}
