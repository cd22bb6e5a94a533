use std::sync::Arc;

use shared::domain::{AccountAddress, Commitment, ListEntry, ProgramId, PublicKeyIdentity};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use crate::{
    error::SyncError,
    remote::{HttpRemoteProgram, MissingRemoteProgram, RemoteError, RemoteProgram},
    wallet::TransactionSigner,
};

/// Deployment-fixed location of the shared list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Gateway base url. Without one every remote call fails as unavailable.
    pub endpoint: Option<Url>,
    pub program_id: ProgramId,
    pub list_account: AccountAddress,
    pub commitment: Commitment,
}

impl StoreConfig {
    pub fn remote_program(&self) -> Arc<dyn RemoteProgram> {
        match &self.endpoint {
            Some(endpoint) => Arc::new(
                HttpRemoteProgram::new(endpoint.clone(), self.program_id.clone())
                    .with_commitment(self.commitment),
            ),
            None => {
                warn!("store: no gateway endpoint configured");
                Arc::new(MissingRemoteProgram)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteListView {
    /// The list account does not exist yet.
    Uninitialized,
    Loaded(Vec<ListEntry>),
    /// The last fetch failed; freshness cannot be asserted.
    Unknown,
}

impl RemoteListView {
    pub fn is_loaded(&self) -> bool {
        matches!(self, RemoteListView::Loaded(_))
    }
}

pub fn validate_link(link: &str) -> Result<(), SyncError> {
    if link.is_empty() {
        return Err(SyncError::ValidationFailed(
            "link must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub struct RemoteListStore {
    config: StoreConfig,
    remote: Arc<dyn RemoteProgram>,
    last_view: RwLock<RemoteListView>,
}

impl RemoteListStore {
    pub fn new(config: StoreConfig, remote: Arc<dyn RemoteProgram>) -> Self {
        Self {
            config,
            remote,
            last_view: RwLock::new(RemoteListView::Unknown),
        }
    }

    pub fn from_config(config: StoreConfig) -> Self {
        let remote = config.remote_program();
        Self::new(config, remote)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn last_view(&self) -> RemoteListView {
        self.last_view.read().await.clone()
    }

    /// Reads the list account. Never fails: failures are folded into the view.
    pub async fn fetch_authoritative(&self, identity: &PublicKeyIdentity) -> RemoteListView {
        let account = &self.config.list_account;
        let view = match self.remote.fetch_list(account).await {
            Ok(entries) => {
                info!(
                    identity = %identity,
                    account = %account,
                    entries = entries.len(),
                    "store: fetched list"
                );
                RemoteListView::Loaded(entries)
            }
            Err(RemoteError::AccountNotFound(_)) => {
                info!(account = %account, "store: list account not initialized");
                RemoteListView::Uninitialized
            }
            Err(err) => {
                warn!(account = %account, "store: fetch failed: {err}");
                RemoteListView::Unknown
            }
        };
        *self.last_view.write().await = view.clone();
        view
    }

    /// Creates the list account. Callers re-fetch after success.
    pub async fn initialize_account(
        &self,
        identity: &PublicKeyIdentity,
        signer: &dyn TransactionSigner,
    ) -> Result<(), SyncError> {
        if self.last_view.read().await.is_loaded() {
            return Err(SyncError::InvalidState {
                action: "initialize",
                state: "the list is already loaded",
            });
        }

        let account = &self.config.list_account;
        self.remote
            .initialize_account(signer, account)
            .await
            .map_err(|err| {
                warn!(identity = %identity, account = %account, "store: initialize failed: {err}");
                SyncError::write_failed("initialize", err)
            })?;
        info!(identity = %identity, account = %account, "store: list account created");
        Ok(())
    }

    /// Appends `link`. Success is not authoritative; callers re-fetch.
    pub async fn append_entry(
        &self,
        identity: &PublicKeyIdentity,
        signer: &dyn TransactionSigner,
        link: &str,
    ) -> Result<(), SyncError> {
        validate_link(link)?;

        let account = &self.config.list_account;
        self.remote
            .append_entry(signer, account, link)
            .await
            .map_err(|err| {
                warn!(identity = %identity, link, "store: append failed: {err}");
                SyncError::write_failed("append", err)
            })?;
        info!(identity = %identity, link, "store: link appended");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
