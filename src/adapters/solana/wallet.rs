//! Wallet Management
//!
//! Loads the signing keypair from the standard JSON byte-array format used by
//! the Solana CLI. Keys never leave this module except as a `&Keypair` handed
//! to the signing step.

use std::path::Path;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to read keypair file: {0}")]
    Io(#[from] std::io::Error),
    #[error("keypair file is not a JSON byte array: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid keypair bytes: {0}")]
    InvalidKeypair(String),
}

/// Holds the gateway's signing keypair.
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load a keypair from a Solana CLI id.json file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let content = std::fs::read_to_string(path)?;
        let bytes: Vec<u8> = serde_json::from_str(&content)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair = Keypair::from_bytes(bytes)
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
        Ok(Self { keypair })
    }

    /// Fresh random keypair, for tests and dry runs.
    pub fn new_random() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_json_byte_array() {
        let keypair = Keypair::new();
        let bytes = keypair.to_bytes().to_vec();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&bytes).unwrap()).unwrap();
        file.flush().unwrap();

        let wallet = WalletManager::from_file(file.path()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_truncated_key() {
        assert!(WalletManager::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_rejects_non_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            WalletManager::from_file(file.path()),
            Err(WalletError::Format(_))
        ));
    }
}
