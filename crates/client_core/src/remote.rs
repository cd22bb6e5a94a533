use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use shared::{
    domain::{AccountAddress, Commitment, ListEntry, ProgramId},
    error::{ApiError, ErrorCode},
    protocol::{
        InstructionEnvelope, InstructionReceipt, ListAccountResponse, ProgramInstruction,
        SignedInstruction,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::wallet::TransactionSigner;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("account {0} not found")]
    AccountNotFound(AccountAddress),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode account data: {0}")]
    Decode(String),
    #[error("{instruction} rejected: {message}")]
    Rejected {
        instruction: &'static str,
        message: String,
    },
    #[error("signing failed: {0}")]
    Signing(String),
}

/// The on-chain program holding the shared list.
#[async_trait]
pub trait RemoteProgram: Send + Sync {
    async fn fetch_list(&self, account: &AccountAddress) -> Result<Vec<ListEntry>, RemoteError>;
    async fn initialize_account(
        &self,
        signer: &dyn TransactionSigner,
        account: &AccountAddress,
    ) -> Result<(), RemoteError>;
    async fn append_entry(
        &self,
        signer: &dyn TransactionSigner,
        account: &AccountAddress,
        link: &str,
    ) -> Result<(), RemoteError>;
}

pub struct MissingRemoteProgram;

#[async_trait]
impl RemoteProgram for MissingRemoteProgram {
    async fn fetch_list(&self, _account: &AccountAddress) -> Result<Vec<ListEntry>, RemoteError> {
        Err(RemoteError::Transport(
            "remote program client is unavailable".to_string(),
        ))
    }

    async fn initialize_account(
        &self,
        _signer: &dyn TransactionSigner,
        _account: &AccountAddress,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Transport(
            "remote program client is unavailable".to_string(),
        ))
    }

    async fn append_entry(
        &self,
        _signer: &dyn TransactionSigner,
        _account: &AccountAddress,
        _link: &str,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Transport(
            "remote program client is unavailable".to_string(),
        ))
    }
}

/// JSON-over-HTTP client for a program gateway.
pub struct HttpRemoteProgram {
    http: Client,
    endpoint: Url,
    program_id: ProgramId,
    commitment: Commitment,
}

impl HttpRemoteProgram {
    pub fn new(endpoint: Url, program_id: ProgramId) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            program_id,
            commitment: Commitment::default(),
        }
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    fn base_url(&self) -> String {
        format!(
            "{}/programs/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.program_id
        )
    }

    async fn submit(
        &self,
        signer: &dyn TransactionSigner,
        instruction: ProgramInstruction,
    ) -> Result<(), RemoteError> {
        let instruction_name = instruction.name();
        let request_id = Uuid::new_v4();
        let envelope = InstructionEnvelope {
            program_id: self.program_id.clone(),
            request_id,
            instruction,
        };
        let message = envelope
            .signing_bytes()
            .map_err(|e| RemoteError::Signing(e.to_string()))?;
        let signature = signer
            .sign(&message)
            .await
            .map_err(|e| RemoteError::Signing(e.to_string()))?;

        let payload = SignedInstruction {
            request_id,
            signer: signer.identity(),
            instruction: envelope.instruction,
            signature_b64: STANDARD.encode(signature),
        };

        let response = self
            .http
            .post(format!("{}/instructions", self.base_url()))
            .query(&[("commitment", self.commitment.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiError>().await {
                Ok(body) => body.message,
                Err(_) => format!("unexpected status {status}"),
            };
            return Err(RemoteError::Rejected {
                instruction: instruction_name,
                message,
            });
        }

        match response.json::<InstructionReceipt>().await {
            Ok(receipt) => info!(
                instruction = instruction_name,
                request_id = %receipt.request_id,
                transaction_id = receipt.transaction_id.as_deref().unwrap_or("-"),
                "program: instruction accepted"
            ),
            Err(err) => warn!(
                instruction = instruction_name,
                %request_id,
                "program: instruction accepted without readable receipt: {err}"
            ),
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteProgram for HttpRemoteProgram {
    async fn fetch_list(&self, account: &AccountAddress) -> Result<Vec<ListEntry>, RemoteError> {
        let response = self
            .http
            .get(format!("{}/accounts/{account}", self.base_url()))
            .query(&[("commitment", self.commitment.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Only the gateway's own not-found body means the account is missing;
            // a bare 404 is a wrong route or program id.
            return match response.json::<ApiError>().await {
                Ok(body) if body.code == ErrorCode::NotFound => {
                    Err(RemoteError::AccountNotFound(account.clone()))
                }
                _ => Err(RemoteError::Transport(format!(
                    "no program route for account {account} (status {status})"
                ))),
            };
        }
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "unexpected status {status} fetching account {account}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let decoded: ListAccountResponse =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(decoded.entries)
    }

    async fn initialize_account(
        &self,
        signer: &dyn TransactionSigner,
        account: &AccountAddress,
    ) -> Result<(), RemoteError> {
        self.submit(
            signer,
            ProgramInstruction::InitializeAccount {
                account: account.clone(),
            },
        )
        .await
    }

    async fn append_entry(
        &self,
        signer: &dyn TransactionSigner,
        account: &AccountAddress,
        link: &str,
    ) -> Result<(), RemoteError> {
        self.submit(
            signer,
            ProgramInstruction::AppendEntry {
                account: account.clone(),
                link: link.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
