//! Synchronization state machine tying the wallet session to the shared list.
//!
//! ```text
//! Idle ──connected──▶ AwaitingFetch ──Uninitialized──▶ Uninitialized
//!                          │  ▲   └──Unknown──▶ FetchFailed
//!                  Loaded  │  │ write ok / refresh
//!                          ▼  │
//!                        Ready
//! any ──disconnected──▶ Idle
//! ```
//!
//! State is only mutated under `inner`, and the lock is never held across a
//! wallet or program call. Results are applied only if they belong to the
//! latest fetch of the current session.

use std::sync::Arc;

use shared::domain::{ListEntry, PublicKeyIdentity};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::SyncError,
    session::{IdentityConnector, IdentitySession, IdentityStatus},
    store::{validate_link, RemoteListStore, RemoteListView},
    view::{project, ViewState},
    wallet::{ConnectOptions, WalletProvider},
    ClientEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    AwaitingFetch,
    Uninitialized,
    Ready(Vec<ListEntry>),
    FetchFailed,
}

impl SyncState {
    pub fn label(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::AwaitingFetch => "awaiting fetch",
            SyncState::Uninitialized => "uninitialized",
            SyncState::Ready(_) => "ready",
            SyncState::FetchFailed => "fetch failed",
        }
    }
}

impl From<RemoteListView> for SyncState {
    fn from(view: RemoteListView) -> Self {
        match view {
            RemoteListView::Uninitialized => SyncState::Uninitialized,
            RemoteListView::Loaded(entries) => SyncState::Ready(entries),
            RemoteListView::Unknown => SyncState::FetchFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSnapshot {
    pub identity: IdentityStatus,
    pub state: SyncState,
    pub pending_input: String,
    pub write_in_flight: bool,
}

struct FetchTicket {
    identity: PublicKeyIdentity,
    epoch: u64,
    seq: u64,
}

struct OrchestratorState {
    session: IdentitySession,
    sync: SyncState,
    pending_input: String,
    write_in_flight: bool,
    fetch_seq: u64,
}

impl OrchestratorState {
    fn require_connected(&self, action: &'static str) -> Result<PublicKeyIdentity, SyncError> {
        self.session
            .status()
            .identity()
            .cloned()
            .ok_or(SyncError::InvalidState {
                action,
                state: self.sync.label(),
            })
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.session.epoch() == ticket.epoch
            && self.session.status().is_connected()
            && self.fetch_seq == ticket.seq
    }
}

pub struct SyncOrchestrator {
    connector: IdentityConnector,
    store: RemoteListStore,
    inner: Mutex<OrchestratorState>,
    events: broadcast::Sender<ClientEvent>,
}

impl SyncOrchestrator {
    pub fn new(wallet: Arc<dyn WalletProvider>, store: RemoteListStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            connector: IdentityConnector::new(wallet),
            store,
            inner: Mutex::new(OrchestratorState {
                session: IdentitySession::default(),
                sync: SyncState::Idle,
                pending_input: String::new(),
                write_in_flight: false,
                fetch_seq: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &RemoteListStore {
        &self.store
    }

    pub async fn snapshot(&self) -> OrchestratorSnapshot {
        let guard = self.inner.lock().await;
        OrchestratorSnapshot {
            identity: guard.session.status().clone(),
            state: guard.sync.clone(),
            pending_input: guard.pending_input.clone(),
            write_in_flight: guard.write_in_flight,
        }
    }

    pub async fn view(&self) -> ViewState {
        project(&self.snapshot().await)
    }

    /// Startup reconnect: silent unless the wallet capability is missing.
    pub async fn attempt_trusted_connect(&self) -> Result<(), SyncError> {
        match self.connect(ConnectOptions::trusted_only()).await {
            Err(SyncError::ConnectionRejected(reason)) => {
                debug!("session: no trusted connection on startup: {reason}");
                Ok(())
            }
            other => other,
        }
    }

    pub async fn connect_explicit(&self) -> Result<(), SyncError> {
        self.connect(ConnectOptions::interactive()).await
    }

    pub async fn disconnect(&self) {
        let mut guard = self.inner.lock().await;
        if guard.session.disconnect() {
            info!("session: disconnected");
            self.emit(ClientEvent::IdentityChanged(IdentityStatus::Disconnected));
        }
        // A write still running belongs to the old session.
        if guard.write_in_flight {
            self.set_write_in_flight(&mut guard, false);
        }
        self.set_sync(&mut guard, SyncState::Idle);
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.inner.lock().await.pending_input = text.into();
    }

    pub async fn initialize_account(&self) -> Result<(), SyncError> {
        let (identity, epoch) = {
            let mut guard = self.inner.lock().await;
            let identity = guard.require_connected("initialize")?;
            if guard.sync != SyncState::Uninitialized {
                return Err(SyncError::InvalidState {
                    action: "initialize",
                    state: guard.sync.label(),
                });
            }
            if guard.write_in_flight {
                return Err(SyncError::WriteInFlight);
            }
            self.set_write_in_flight(&mut guard, true);
            (identity, guard.session.epoch())
        };

        let result = match self.connector.signer_for("initialize", &identity) {
            Ok(signer) => {
                self.store
                    .initialize_account(&identity, signer.as_ref())
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish_write(epoch, result).await
    }

    /// Submits the pending input. The input is cleared as soon as the attempt
    /// is accepted, before the outcome is known.
    pub async fn submit(&self) -> Result<(), SyncError> {
        let (identity, epoch, link) = {
            let mut guard = self.inner.lock().await;
            let identity = guard.require_connected("submit")?;
            if !matches!(guard.sync, SyncState::Ready(_)) {
                return Err(SyncError::InvalidState {
                    action: "submit",
                    state: guard.sync.label(),
                });
            }
            if guard.write_in_flight {
                return Err(SyncError::WriteInFlight);
            }
            let link = std::mem::take(&mut guard.pending_input);
            if let Err(err) = validate_link(&link) {
                info!("composer: empty input, try again");
                return Err(err);
            }
            info!(link = %link, "composer: submitting link");
            self.set_write_in_flight(&mut guard, true);
            (identity, guard.session.epoch(), link)
        };

        let result = match self.connector.signer_for("append", &identity) {
            Ok(signer) => {
                self.store
                    .append_entry(&identity, signer.as_ref(), &link)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish_write(epoch, result).await
    }

    pub async fn submit_link(&self, link: impl Into<String>) -> Result<(), SyncError> {
        self.set_input(link).await;
        self.submit().await
    }

    /// User-triggered re-read of the list, e.g. after a failed fetch.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.require_connected("refresh")?;
            self.begin_fetch(&mut guard)
        };
        if let Some(ticket) = ticket {
            self.run_fetch(ticket).await;
        }
        Ok(())
    }

    async fn connect(&self, options: ConnectOptions) -> Result<(), SyncError> {
        if !self.connector.is_available() {
            let err = SyncError::CapabilityMissing;
            warn!("session: {err}");
            self.emit(ClientEvent::Advisory(err.to_string()));
            return Err(err);
        }

        let epoch = {
            let mut guard = self.inner.lock().await;
            let Some(epoch) = guard.session.begin_connect() else {
                debug!(
                    status = guard.session.status().label(),
                    "session: connect ignored"
                );
                return Ok(());
            };
            self.emit(ClientEvent::IdentityChanged(IdentityStatus::Connecting));
            epoch
        };

        match self.connector.connect(options).await {
            Ok(identity) => {
                let ticket = {
                    let mut guard = self.inner.lock().await;
                    if !guard.session.complete_connect(epoch, identity) {
                        debug!("session: connect superseded by a newer session change");
                        return Ok(());
                    }
                    self.emit(ClientEvent::IdentityChanged(guard.session.status().clone()));
                    self.begin_fetch(&mut guard)
                };
                if let Some(ticket) = ticket {
                    self.run_fetch(ticket).await;
                }
                Ok(())
            }
            Err(err) => {
                let mut guard = self.inner.lock().await;
                if guard.session.fail_connect(epoch) {
                    self.emit(ClientEvent::IdentityChanged(IdentityStatus::Disconnected));
                }
                if err.is_advisory() {
                    self.emit(ClientEvent::Advisory(err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn finish_write(&self, epoch: u64, result: Result<(), SyncError>) -> Result<(), SyncError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            let same_session = guard.session.epoch() == epoch;
            if same_session {
                self.set_write_in_flight(&mut guard, false);
            }
            if let Err(err) = result {
                warn!("sync: write did not complete: {err}");
                self.emit(ClientEvent::Error(err.clone()));
                return Err(err);
            }
            if !same_session {
                debug!("sync: session changed during write; reconciling current session");
            }
            // No-op unless a session is connected now.
            self.begin_fetch(&mut guard)
        };
        if let Some(ticket) = ticket {
            self.run_fetch(ticket).await;
        }
        Ok(())
    }

    fn begin_fetch(&self, state: &mut OrchestratorState) -> Option<FetchTicket> {
        let identity = state.session.status().identity()?.clone();
        state.fetch_seq += 1;
        let ticket = FetchTicket {
            identity,
            epoch: state.session.epoch(),
            seq: state.fetch_seq,
        };
        self.set_sync(state, SyncState::AwaitingFetch);
        Some(ticket)
    }

    async fn run_fetch(&self, ticket: FetchTicket) {
        let view = self.store.fetch_authoritative(&ticket.identity).await;

        let mut guard = self.inner.lock().await;
        if !guard.is_current(&ticket) {
            debug!(seq = ticket.seq, "sync: dropping stale fetch result");
            return;
        }
        let next = SyncState::from(view);
        if next == SyncState::FetchFailed {
            self.emit(ClientEvent::Error(SyncError::RemoteQueryFailed(
                "shared list could not be read".to_string(),
            )));
        }
        self.set_sync(&mut guard, next);
    }

    fn set_sync(&self, state: &mut OrchestratorState, next: SyncState) {
        if state.sync == next && next != SyncState::AwaitingFetch {
            return;
        }
        debug!(from = state.sync.label(), to = next.label(), "sync: transition");
        state.sync = next.clone();
        self.emit(ClientEvent::SyncStateChanged(next));
    }

    fn set_write_in_flight(&self, state: &mut OrchestratorState, in_flight: bool) {
        state.write_in_flight = in_flight;
        self.emit(ClientEvent::WriteInFlightChanged(in_flight));
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
