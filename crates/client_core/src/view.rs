//! Pure projection from orchestrator state to what a front-end renders.

use shared::domain::{ListEntry, PublicKeyIdentity};

use crate::{
    orchestrator::{OrchestratorSnapshot, SyncState},
    session::IdentityStatus,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerView {
    pub input: String,
    pub submit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    NotConnected {
        connecting: bool,
    },
    Loading {
        identity: PublicKeyIdentity,
    },
    NeedsInitialization {
        identity: PublicKeyIdentity,
        initialize_enabled: bool,
    },
    FetchFailed {
        identity: PublicKeyIdentity,
    },
    Ready {
        identity: PublicKeyIdentity,
        composer: ComposerView,
        entries: Vec<ListEntry>,
    },
}

pub fn project(snapshot: &OrchestratorSnapshot) -> ViewState {
    let identity = match &snapshot.identity {
        IdentityStatus::Connected(identity) => identity.clone(),
        IdentityStatus::Connecting => return ViewState::NotConnected { connecting: true },
        IdentityStatus::Disconnected => return ViewState::NotConnected { connecting: false },
    };

    match &snapshot.state {
        SyncState::Idle | SyncState::AwaitingFetch => ViewState::Loading { identity },
        SyncState::Uninitialized => ViewState::NeedsInitialization {
            identity,
            initialize_enabled: !snapshot.write_in_flight,
        },
        SyncState::FetchFailed => ViewState::FetchFailed { identity },
        SyncState::Ready(entries) => ViewState::Ready {
            identity,
            composer: ComposerView {
                input: snapshot.pending_input.clone(),
                submit_enabled: !snapshot.write_in_flight,
            },
            entries: entries.clone(),
        },
    }
}
