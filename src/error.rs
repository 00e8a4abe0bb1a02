//! Gateway Error Taxonomy
//!
//! Every failure surfaced by the gateway maps onto a small set of caller-facing
//! kinds. The kind decides how a failed transaction attempt is handled: a
//! simulation rejection is fatal at the current state, while a transport
//! failure is worth retrying at a higher fee.

use thiserror::Error;

use crate::adapters::solana::WalletError;
use crate::application::landing::LandingError;
use crate::application::pipeline::QuoteError;
use crate::application::registry::RegistryError;
use crate::config::ConfigError;
use crate::ports::{NetworkError, VenueError};

/// Caller-facing classification of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A named resource (token, pool, market, position) does not exist
    NotFound,
    /// A pre-transaction guard refused the request
    GuardViolation,
    /// The chain's simulation rejected the transaction; retrying the same
    /// bytes at a higher fee cannot help
    SimulationRejected,
    /// Every fee within the ceiling was attempted without confirmation
    FeeCeilingExhausted,
    /// Transport or RPC failure
    Network,
    /// Anything else
    Internal,
}

/// Umbrella error for gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Landing(#[from] LandingError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Registry(err) => match err {
                RegistryError::UnsupportedNetwork { .. } => ErrorKind::NotFound,
                RegistryError::UnknownAlias { .. } => ErrorKind::NotFound,
                RegistryError::InvalidTableAddress { .. } => ErrorKind::Internal,
                RegistryError::Init(inner) => network_kind(inner),
                RegistryError::Config(_) => ErrorKind::Internal,
            },
            GatewayError::Quote(err) => match err {
                QuoteError::TokenNotFound { .. } => ErrorKind::NotFound,
                QuoteError::AmountTooSmall { .. } => ErrorKind::GuardViolation,
                QuoteError::InvalidAmount(_) => ErrorKind::GuardViolation,
                QuoteError::Limit(_) => ErrorKind::GuardViolation,
                QuoteError::Venue(inner) => venue_kind(inner),
                QuoteError::Network(inner) => network_kind(inner),
            },
            GatewayError::Landing(err) => match err {
                LandingError::SimulationRejected { .. } => ErrorKind::SimulationRejected,
                LandingError::FeeCeilingExhausted { .. } => ErrorKind::FeeCeilingExhausted,
                LandingError::FeeEstimate(_) => ErrorKind::Network,
                LandingError::Build(_) => ErrorKind::Internal,
                LandingError::Signing(_) => ErrorKind::Internal,
                LandingError::Network(inner) => network_kind(inner),
            },
            GatewayError::Network(inner) => network_kind(inner),
            GatewayError::Venue(inner) => venue_kind(inner),
            GatewayError::Wallet(_) => ErrorKind::Internal,
            GatewayError::Config(_) => ErrorKind::Internal,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::InvalidRequest(_) => ErrorKind::GuardViolation,
        }
    }
}

fn network_kind(err: &NetworkError) -> ErrorKind {
    match err {
        NetworkError::NotFound { .. } => ErrorKind::NotFound,
        NetworkError::InvalidAddress { .. } => ErrorKind::GuardViolation,
        NetworkError::TransactionFailed(_) => ErrorKind::SimulationRejected,
        NetworkError::Rpc(_) => ErrorKind::Network,
    }
}

fn venue_kind(err: &VenueError) -> ErrorKind {
    match err {
        // The request reached the venue; what came back is the venue's bug,
        // not the transport's
        VenueError::InvalidPayload(_) => ErrorKind::Internal,
        VenueError::Request(_) => ErrorKind::Network,
        VenueError::Network(inner) => network_kind(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_rejection_is_fatal_kind() {
        let err = GatewayError::from(LandingError::SimulationRejected {
            reason: "custom program error: 0x1771".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::SimulationRejected);
    }

    #[test]
    fn test_ceiling_exhaustion_kind() {
        let err = GatewayError::from(LandingError::FeeCeilingExhausted {
            max_fee_attempted: 400,
            ceiling: 750,
            attempts: 3,
        });
        assert_eq!(err.kind(), ErrorKind::FeeCeilingExhausted);
    }

    #[test]
    fn test_limit_guard_kind() {
        let err = GatewayError::from(QuoteError::Limit(
            crate::domain::LimitPriceError::ExceedsLimit {
                expected: rust_decimal_macros::dec!(10),
                limit: rust_decimal_macros::dec!(9),
            },
        ));
        assert_eq!(err.kind(), ErrorKind::GuardViolation);
    }

    #[test]
    fn test_not_found_kind() {
        let err = GatewayError::NotFound("token WIF".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_malformed_venue_payload_is_internal_not_network() {
        let err = GatewayError::from(QuoteError::Venue(VenueError::InvalidPayload(
            "missing outAmount".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = GatewayError::from(VenueError::InvalidPayload(
            "unparseable swap transaction".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_venue_transport_failures_keep_network_kind() {
        let err = GatewayError::from(QuoteError::Venue(VenueError::Request(
            "502 Bad Gateway".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::Network);

        let err = GatewayError::from(VenueError::Network(NetworkError::NotFound(
            "pool".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
