//! Wallet management module

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::config::WalletConfig;

/// Holds the signing keypair handed to the transaction builders
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Load from config: a base58 private key wins over a keypair file
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        if let Some(secret) = &config.private_key {
            return Self::from_base58(secret);
        }
        match &config.keypair_path {
            Some(path) => Self::from_file(path),
            None => anyhow::bail!(
                "No wallet configured: set WALLET_PRIVATE_KEY or wallet.keypair_path"
            ),
        }
    }

    /// Create from a base58-encoded 64-byte secret key
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            bs58::decode(secret.trim())
                .into_vec()
                .context("Private key is not valid base58")?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Create a new wallet manager from a keypair file
    pub fn from_file(path: &str) -> Result<Self> {
        let file_bytes = Zeroizing::new(
            std::fs::read(path).with_context(|| format!("Failed to read keypair file: {}", path))?,
        );

        if file_bytes.len() == 64 {
            // Raw bytes format
            return Self::from_secret_bytes(&file_bytes);
        }

        // JSON format
        let json: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_slice(&file_bytes).context("Failed to parse keypair JSON")?,
        );
        Self::from_secret_bytes(&json)
    }

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            anyhow::bail!(
                "Invalid keypair length: expected 64 bytes, got {}",
                bytes.len()
            );
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_base58_roundtrips_pubkey() {
        let keypair = Keypair::new();
        let encoded = keypair.to_base58_string();

        let wallet = WalletManager::from_base58(&encoded).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_short_key() {
        let encoded = bs58::encode([1u8; 32]).into_string();
        let err = WalletManager::from_base58(&encoded).err().unwrap();
        assert!(err.to_string().contains("expected 64 bytes"));
    }

    #[test]
    fn test_rejects_all_zero_key() {
        let encoded = bs58::encode([0u8; 64]).into_string();
        let err = WalletManager::from_base58(&encoded).err().unwrap();
        assert!(err.to_string().contains("all-zero"));
    }

    #[test]
    fn test_from_json_file() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_private_key_wins_over_path() {
        let keypair = Keypair::new();
        let config = WalletConfig {
            keypair_path: Some("/nonexistent/id.json".to_string()),
            private_key: Some(keypair.to_base58_string()),
        };

        let wallet = WalletManager::from_config(&config).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_missing_wallet_config() {
        assert!(WalletManager::from_config(&WalletConfig::default()).is_err());
    }
}
