use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountAddress, ListEntry, ProgramId, PublicKeyIdentity};

/// Decoded state of the shared list account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAccountResponse {
    pub account: Option<AccountAddress>,
    #[serde(default)]
    pub entries: Vec<ListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProgramInstruction {
    InitializeAccount {
        account: AccountAddress,
    },
    AppendEntry {
        account: AccountAddress,
        link: String,
    },
}

impl ProgramInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            ProgramInstruction::InitializeAccount { .. } => "initialize_account",
            ProgramInstruction::AppendEntry { .. } => "append_entry",
        }
    }
}

/// The exact bytes a signer commits to: program, request id and instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionEnvelope {
    pub program_id: ProgramId,
    pub request_id: Uuid,
    pub instruction: ProgramInstruction,
}

impl InstructionEnvelope {
    pub fn signing_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub request_id: Uuid,
    pub signer: PublicKeyIdentity,
    pub instruction: ProgramInstruction,
    pub signature_b64: String,
}

impl SignedInstruction {
    pub fn envelope(&self, program_id: &ProgramId) -> InstructionEnvelope {
        InstructionEnvelope {
            program_id: program_id.clone(),
            request_id: self.request_id,
            instruction: self.instruction.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionReceipt {
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}
