use std::sync::Arc;

use shared::domain::PublicKeyIdentity;
use tracing::{debug, info, warn};

use crate::{
    error::SyncError,
    wallet::{ConnectOptions, TransactionSigner, WalletProvider},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected(PublicKeyIdentity),
}

impl IdentityStatus {
    pub fn identity(&self) -> Option<&PublicKeyIdentity> {
        match self {
            IdentityStatus::Connected(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, IdentityStatus::Connected(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            IdentityStatus::Disconnected => "disconnected",
            IdentityStatus::Connecting => "connecting",
            IdentityStatus::Connected(_) => "connected",
        }
    }
}

/// Wallet connection state.
///
/// `epoch` changes whenever a connect attempt starts or the session is torn
/// down, so results of calls issued under an older epoch can be recognised
/// and dropped.
#[derive(Debug, Default)]
pub struct IdentitySession {
    status: IdentityStatus,
    epoch: u64,
}

impl IdentitySession {
    pub fn status(&self) -> &IdentityStatus {
        &self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the epoch of the new attempt, or `None` when a connection is
    /// already established or pending and no wallet call should be made.
    pub fn begin_connect(&mut self) -> Option<u64> {
        if self.status != IdentityStatus::Disconnected {
            return None;
        }
        self.epoch += 1;
        self.status = IdentityStatus::Connecting;
        Some(self.epoch)
    }

    pub fn complete_connect(&mut self, epoch: u64, identity: PublicKeyIdentity) -> bool {
        if self.epoch != epoch || self.status != IdentityStatus::Connecting {
            return false;
        }
        self.status = IdentityStatus::Connected(identity);
        true
    }

    pub fn fail_connect(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch || self.status != IdentityStatus::Connecting {
            return false;
        }
        self.status = IdentityStatus::Disconnected;
        true
    }

    pub fn disconnect(&mut self) -> bool {
        if self.status == IdentityStatus::Disconnected {
            return false;
        }
        self.epoch += 1;
        self.status = IdentityStatus::Disconnected;
        true
    }
}

/// Narrow view of the wallet used by the orchestrator: connect attempts
/// classified into the core's error kinds, plus access to the signer.
pub struct IdentityConnector {
    wallet: Arc<dyn WalletProvider>,
}

impl IdentityConnector {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self { wallet }
    }

    pub fn is_available(&self) -> bool {
        self.wallet.is_available()
    }

    pub async fn connect(&self, options: ConnectOptions) -> Result<PublicKeyIdentity, SyncError> {
        if !self.wallet.is_available() {
            warn!("wallet: capability not found");
            return Err(SyncError::CapabilityMissing);
        }

        match self.wallet.connect(options).await {
            Ok(identity) => {
                info!(
                    identity = %identity,
                    trusted_only = options.only_if_trusted,
                    "wallet: connected with public key"
                );
                Ok(identity)
            }
            Err(err) => {
                debug!(
                    trusted_only = options.only_if_trusted,
                    "wallet: connect rejected: {err}"
                );
                Err(SyncError::ConnectionRejected(err.to_string()))
            }
        }
    }

    /// The wallet signer, checked against the identity the session connected with.
    pub fn signer_for(
        &self,
        action: &'static str,
        identity: &PublicKeyIdentity,
    ) -> Result<Arc<dyn TransactionSigner>, SyncError> {
        let signer = self
            .wallet
            .signer()
            .ok_or_else(|| SyncError::write_failed(action, "wallet cannot sign transactions"))?;
        if &signer.identity() != identity {
            return Err(SyncError::write_failed(
                action,
                format!(
                    "wallet signer {} does not match connected identity {identity}",
                    signer.identity()
                ),
            ));
        }
        Ok(signer)
    }
}
