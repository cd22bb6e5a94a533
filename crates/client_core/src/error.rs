use thiserror::Error;

/// Failure kinds surfaced by the synchronization core.
///
/// An account that does not exist yet is a state (`Uninitialized`), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("wallet capability not found; install a wallet to continue")]
    CapabilityMissing,
    #[error("wallet connection rejected: {0}")]
    ConnectionRejected(String),
    #[error("remote query failed: {0}")]
    RemoteQueryFailed(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("{action} failed: {reason}")]
    WriteFailed { action: &'static str, reason: String },
    #[error("{action} is not available while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("another write is still in flight")]
    WriteInFlight,
}

impl SyncError {
    pub fn write_failed(action: &'static str, reason: impl ToString) -> Self {
        Self::WriteFailed {
            action,
            reason: reason.to_string(),
        }
    }

    /// Only a missing wallet is shown to the user as a blocking advisory.
    pub fn is_advisory(&self) -> bool {
        matches!(self, SyncError::CapabilityMissing)
    }
}
