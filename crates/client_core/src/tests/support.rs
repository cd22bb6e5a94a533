//! In-memory wallet and program doubles shared by the unit tests.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use shared::domain::{AccountAddress, Commitment, ListEntry, ProgramId, PublicKeyIdentity};
use tokio::sync::{Mutex, Notify};
use url::Url;

use crate::{
    keys::identity_for_key,
    remote::{RemoteError, RemoteProgram},
    store::StoreConfig,
    wallet::{ConnectOptions, KeypairSigner, TransactionSigner, WalletProvider},
};

pub const LIST_ACCOUNT: &str = "shared-list-account";

pub fn store_config() -> StoreConfig {
    StoreConfig {
        endpoint: Some(Url::parse("http://127.0.0.1:9").expect("url")),
        program_id: ProgramId::new("gif-program"),
        list_account: AccountAddress::new(LIST_ACCOUNT),
        commitment: Commitment::Processed,
    }
}

pub struct FakeWallet {
    available: bool,
    trusted: bool,
    approves: bool,
    can_sign: bool,
    key: SigningKey,
    pub connect_calls: Mutex<Vec<ConnectOptions>>,
}

impl FakeWallet {
    fn build(available: bool, trusted: bool, approves: bool) -> Self {
        Self {
            available,
            trusted,
            approves,
            can_sign: true,
            key: SigningKey::from_bytes(&[11u8; 32]),
            connect_calls: Mutex::new(Vec::new()),
        }
    }

    /// Previously granted: trusted-only connects succeed.
    pub fn trusted() -> Self {
        Self::build(true, true, true)
    }

    /// Present but never granted: trusted-only connects reject, prompts approve.
    pub fn untrusted() -> Self {
        Self::build(true, false, true)
    }

    /// Present, never granted, and the user cancels every prompt.
    pub fn rejecting() -> Self {
        Self::build(true, false, false)
    }

    pub fn absent() -> Self {
        Self::build(false, false, false)
    }

    pub fn without_signer(mut self) -> Self {
        self.can_sign = false;
        self
    }

    pub fn identity(&self) -> PublicKeyIdentity {
        identity_for_key(&self.key)
    }

    pub async fn connect_call_count(&self) -> usize {
        self.connect_calls.lock().await.len()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn connect(&self, options: ConnectOptions) -> Result<PublicKeyIdentity> {
        self.connect_calls.lock().await.push(options);
        if !self.available {
            return Err(anyhow!("wallet missing"));
        }
        if options.only_if_trusted && !self.trusted {
            return Err(anyhow!("connection not trusted"));
        }
        if !options.only_if_trusted && !self.approves {
            return Err(anyhow!("user rejected the request"));
        }
        Ok(self.identity())
    }

    fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        if !self.can_sign {
            return None;
        }
        let signer: Arc<dyn TransactionSigner> = Arc::new(KeypairSigner::new(self.key.clone()));
        Some(signer)
    }
}

/// Program double holding the list in memory.
///
/// `entries == None` means the list account has not been created.
#[derive(Default)]
pub struct FakeProgram {
    pub entries: Mutex<Option<Vec<ListEntry>>>,
    pub fetch_failure: Mutex<Option<String>>,
    pub write_failure: Mutex<Option<String>>,
    /// Entries another writer lands right before each of our appends.
    pub concurrent_appends: Mutex<Vec<ListEntry>>,
    pub fetch_calls: Mutex<usize>,
    pub initialize_calls: Mutex<usize>,
    pub append_calls: Mutex<Vec<String>>,
    pub hold_fetches: Mutex<bool>,
    pub fetch_started: Notify,
    pub release_fetch: Notify,
    pub hold_writes: Mutex<bool>,
    pub write_started: Notify,
    pub release_write: Notify,
}

impl FakeProgram {
    pub fn uninitialized() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_links(links: &[&str]) -> Arc<Self> {
        let program = Self {
            entries: Mutex::new(Some(links.iter().map(|l| ListEntry::new(*l)).collect())),
            ..Self::default()
        };
        Arc::new(program)
    }

    pub async fn fail_fetches(&self, reason: &str) {
        *self.fetch_failure.lock().await = Some(reason.to_string());
    }

    pub async fn fail_writes(&self, reason: &str) {
        *self.write_failure.lock().await = Some(reason.to_string());
    }

    pub async fn fetch_count(&self) -> usize {
        *self.fetch_calls.lock().await
    }

    pub async fn initialize_count(&self) -> usize {
        *self.initialize_calls.lock().await
    }

    pub async fn append_count(&self) -> usize {
        self.append_calls.lock().await.len()
    }

    pub async fn links(&self) -> Option<Vec<String>> {
        self.entries
            .lock()
            .await
            .as_ref()
            .map(|entries| entries.iter().map(|e| e.link.clone()).collect())
    }
}

#[async_trait]
impl RemoteProgram for FakeProgram {
    async fn fetch_list(&self, account: &AccountAddress) -> Result<Vec<ListEntry>, RemoteError> {
        *self.fetch_calls.lock().await += 1;
        if *self.hold_fetches.lock().await {
            self.fetch_started.notify_one();
            self.release_fetch.notified().await;
        }
        if let Some(reason) = self.fetch_failure.lock().await.clone() {
            return Err(RemoteError::Transport(reason));
        }
        match self.entries.lock().await.clone() {
            Some(entries) => Ok(entries),
            None => Err(RemoteError::AccountNotFound(account.clone())),
        }
    }

    async fn initialize_account(
        &self,
        _signer: &dyn TransactionSigner,
        _account: &AccountAddress,
    ) -> Result<(), RemoteError> {
        *self.initialize_calls.lock().await += 1;
        if let Some(reason) = self.write_failure.lock().await.clone() {
            return Err(RemoteError::Rejected {
                instruction: "initialize_account",
                message: reason,
            });
        }
        let mut entries = self.entries.lock().await;
        if entries.is_some() {
            return Err(RemoteError::Rejected {
                instruction: "initialize_account",
                message: "account already initialized".to_string(),
            });
        }
        *entries = Some(Vec::new());
        Ok(())
    }

    async fn append_entry(
        &self,
        signer: &dyn TransactionSigner,
        account: &AccountAddress,
        link: &str,
    ) -> Result<(), RemoteError> {
        self.append_calls.lock().await.push(link.to_string());
        if *self.hold_writes.lock().await {
            self.write_started.notify_one();
            self.release_write.notified().await;
        }
        if let Some(reason) = self.write_failure.lock().await.clone() {
            return Err(RemoteError::Rejected {
                instruction: "append_entry",
                message: reason,
            });
        }
        let concurrent = std::mem::take(&mut *self.concurrent_appends.lock().await);
        let mut entries = self.entries.lock().await;
        let Some(entries) = entries.as_mut() else {
            return Err(RemoteError::AccountNotFound(account.clone()));
        };
        entries.extend(concurrent);
        entries.push(ListEntry {
            link: link.to_string(),
            submitted_by: Some(signer.identity()),
            submitted_at: None,
        });
        Ok(())
    }
}
