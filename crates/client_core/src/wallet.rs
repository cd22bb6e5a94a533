use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use shared::domain::PublicKeyIdentity;
use tracing::{debug, info};

use crate::keys::identity_for_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectOptions {
    /// Succeed only from a previously granted trust, never prompting.
    pub only_if_trusted: bool,
}

impl ConnectOptions {
    pub fn trusted_only() -> Self {
        Self {
            only_if_trusted: true,
        }
    }

    pub fn interactive() -> Self {
        Self {
            only_if_trusted: false,
        }
    }
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn identity(&self) -> PublicKeyIdentity;
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// The wallet extension as seen by the core.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_available(&self) -> bool;
    async fn connect(&self, options: ConnectOptions) -> Result<PublicKeyIdentity>;
    fn signer(&self) -> Option<Arc<dyn TransactionSigner>>;
}

pub struct MissingWallet;

#[async_trait]
impl WalletProvider for MissingWallet {
    fn is_available(&self) -> bool {
        false
    }

    async fn connect(&self, _options: ConnectOptions) -> Result<PublicKeyIdentity> {
        Err(anyhow!("wallet capability is unavailable"))
    }

    fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        None
    }
}

pub struct KeypairSigner {
    key: SigningKey,
}

impl KeypairSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn identity(&self) -> PublicKeyIdentity {
        identity_for_key(&self.key)
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrustGrants {
    #[serde(default)]
    granted: Vec<PublicKeyIdentity>,
}

/// A wallet backed by a local ed25519 key.
///
/// Trust grants are persisted in `trust_store`; without one, trusted-only
/// connects always reject and interactive approvals are not remembered.
pub struct KeypairWallet {
    signer: Arc<KeypairSigner>,
    trust_store: Option<PathBuf>,
}

impl KeypairWallet {
    pub fn new(key: SigningKey, trust_store: Option<PathBuf>) -> Self {
        Self {
            signer: Arc::new(KeypairSigner::new(key)),
            trust_store,
        }
    }

    pub fn identity(&self) -> PublicKeyIdentity {
        self.signer.identity()
    }

    async fn load_grants(&self) -> Result<TrustGrants> {
        let Some(path) = &self.trust_store else {
            return Ok(TrustGrants::default());
        };
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("invalid trust store '{}'", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TrustGrants::default()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read trust store '{}'", path.display())),
        }
    }

    async fn record_grant(&self, identity: &PublicKeyIdentity) -> Result<()> {
        let Some(path) = &self.trust_store else {
            return Ok(());
        };
        let mut grants = self.load_grants().await?;
        if grants.granted.contains(identity) {
            return Ok(());
        }
        grants.granted.push(identity.clone());
        let raw = serde_json::to_string_pretty(&grants)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create trust store directory '{}'", parent.display())
            })?;
        }
        tokio::fs::write(path, raw)
            .await
            .with_context(|| format!("failed to write trust store '{}'", path.display()))
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn is_available(&self) -> bool {
        true
    }

    async fn connect(&self, options: ConnectOptions) -> Result<PublicKeyIdentity> {
        let identity = self.identity();
        if options.only_if_trusted {
            let grants = self.load_grants().await?;
            if !grants.granted.contains(&identity) {
                debug!(identity = %identity, "wallet: no trust grant for identity");
                return Err(anyhow!("connection is not trusted yet; approval required"));
            }
            return Ok(identity);
        }

        self.record_grant(&identity).await?;
        info!(identity = %identity, "wallet: connection approved");
        Ok(identity)
    }

    fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        let signer: Arc<dyn TransactionSigner> = self.signer.clone();
        Some(signer)
    }
}

#[cfg(test)]
#[path = "tests/wallet_tests.rs"]
mod tests;
