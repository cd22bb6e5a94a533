mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    keys::load_signing_key, KeypairWallet, MissingWallet, RemoteListStore, SyncError,
    SyncOrchestrator, ViewState, WalletProvider,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, Settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(about = "Shared GIF link board client")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug, Clone)]
enum Action {
    /// Show the list using a previously trusted connection only.
    Show,
    /// Connect the wallet, granting trust if needed, and show the list.
    Connect,
    /// Create the shared list account.
    Init,
    /// Append a link to the shared list.
    Submit { link: String },
    /// Re-read the shared list.
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = load_settings(&args.config);
    let store = RemoteListStore::from_config(settings.store_config()?);
    info!(
        endpoint = store.config().endpoint.as_ref().map_or("-", |url| url.as_str()),
        account = %store.config().list_account,
        "linkboard: using shared list"
    );

    let orchestrator = SyncOrchestrator::new(build_wallet(&settings)?, store);
    if let Err(err) = orchestrator.attempt_trusted_connect().await {
        println!("{err}");
        return Ok(());
    }

    let action = args.action.unwrap_or(Action::Show);
    if let Err(err) = run_action(&orchestrator, action).await {
        warn!("linkboard: {err}");
        println!("error: {err}");
    }

    render(&orchestrator.view().await);
    Ok(())
}

/// Runs one user action. A declined wallet prompt is not an error: the
/// not-connected view is shown and the user can retry.
async fn run_action(orchestrator: &SyncOrchestrator, action: Action) -> Result<(), SyncError> {
    if !matches!(action, Action::Show) {
        // Every other action runs as the user, so the wallet may prompt.
        match orchestrator.connect_explicit().await {
            Ok(()) => {}
            Err(SyncError::ConnectionRejected(reason)) => {
                debug!("linkboard: wallet connection declined: {reason}");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }

    match action {
        Action::Show | Action::Connect => Ok(()),
        Action::Init => orchestrator.initialize_account().await,
        Action::Submit { link } => orchestrator.submit_link(link).await,
        Action::Refresh => orchestrator.refresh().await,
    }
}

fn build_wallet(settings: &Settings) -> Result<Arc<dyn WalletProvider>> {
    let Some(path) = settings.wallet_key_path.as_ref().filter(|p| p.exists()) else {
        return Ok(Arc::new(MissingWallet));
    };
    let key = load_signing_key(path)
        .with_context(|| format!("failed to load wallet key '{}'", path.display()))?;
    Ok(Arc::new(KeypairWallet::new(
        key,
        settings.trust_store_path.clone(),
    )))
}

fn render(view: &ViewState) {
    match view {
        ViewState::NotConnected { connecting: true } => println!("Connecting wallet..."),
        ViewState::NotConnected { connecting: false } => {
            println!("Not connected. Run `linkboard connect` to connect your wallet.")
        }
        ViewState::Loading { identity } => println!("[{identity}] Loading shared list..."),
        ViewState::NeedsInitialization {
            identity,
            initialize_enabled,
        } => {
            println!("[{identity}] The shared list does not exist yet.");
            if *initialize_enabled {
                println!("Run `linkboard init` to create it.");
            }
        }
        ViewState::FetchFailed { identity } => {
            println!("[{identity}] Could not read the shared list. Run `linkboard refresh` to retry.")
        }
        ViewState::Ready {
            identity,
            composer,
            entries,
        } => {
            println!("[{identity}] {} link(s)", entries.len());
            for (index, entry) in entries.iter().enumerate() {
                match &entry.submitted_by {
                    Some(by) => println!("{:>3}. {} (from {by})", index + 1, entry.link),
                    None => println!("{:>3}. {}", index + 1, entry.link),
                }
            }
            if !composer.submit_enabled {
                println!("A submission is still in flight.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use async_trait::async_trait;
    use client_core::{ConnectOptions, StoreConfig, TransactionSigner};
    use shared::domain::{AccountAddress, Commitment, ProgramId, PublicKeyIdentity};

    use super::*;

    struct DecliningWallet;

    #[async_trait]
    impl WalletProvider for DecliningWallet {
        fn is_available(&self) -> bool {
            true
        }

        async fn connect(&self, _options: ConnectOptions) -> Result<PublicKeyIdentity> {
            Err(anyhow!("user rejected the request"))
        }

        fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
            None
        }
    }

    fn offline_store() -> RemoteListStore {
        RemoteListStore::from_config(StoreConfig {
            endpoint: None,
            program_id: ProgramId::new("gif-program"),
            list_account: AccountAddress::new("shared-list"),
            commitment: Commitment::default(),
        })
    }

    #[tokio::test]
    async fn declined_connect_falls_through_to_not_connected_view() {
        let orchestrator = SyncOrchestrator::new(Arc::new(DecliningWallet), offline_store());

        let outcome = run_action(
            &orchestrator,
            Action::Submit {
                link: "https://x/gif1".into(),
            },
        )
        .await;

        assert!(outcome.is_ok());
        assert_eq!(
            orchestrator.view().await,
            ViewState::NotConnected { connecting: false }
        );
    }

    #[tokio::test]
    async fn action_errors_are_returned_for_display() {
        let wallet = KeypairWallet::new(
            client_core::keys::SigningKey::from_bytes(&[9u8; 32]),
            None,
        );
        let orchestrator = SyncOrchestrator::new(Arc::new(wallet), offline_store());

        let err = run_action(&orchestrator, Action::Init)
            .await
            .expect_err("list state unknown without a gateway");

        assert!(matches!(err, SyncError::InvalidState { .. }));
        assert!(matches!(orchestrator.view().await, ViewState::FetchFailed { .. }));
    }
}
