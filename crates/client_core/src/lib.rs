pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod remote;
pub mod session;
pub mod store;
pub mod view;
pub mod wallet;

pub use error::SyncError;
pub use orchestrator::{OrchestratorSnapshot, SyncOrchestrator, SyncState};
pub use remote::{HttpRemoteProgram, MissingRemoteProgram, RemoteError, RemoteProgram};
pub use session::{IdentitySession, IdentityStatus};
pub use store::{RemoteListStore, RemoteListView, StoreConfig};
pub use view::{project, ComposerView, ViewState};
pub use wallet::{
    ConnectOptions, KeypairSigner, KeypairWallet, MissingWallet, TransactionSigner,
    WalletProvider,
};

/// Notifications published by the orchestrator for front-ends and logs.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    IdentityChanged(IdentityStatus),
    SyncStateChanged(SyncState),
    WriteInFlightChanged(bool),
    /// Blocking, user-facing notice. Only raised for a missing wallet.
    Advisory(String),
    Error(SyncError),
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
