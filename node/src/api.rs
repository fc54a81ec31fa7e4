// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! JSON bodies of the HTTP API, shared by the server and the remote client.
//!
//! Digests travel as 64-character lowercase hex. Decoding on the client side
//! is strict: anything that does not describe exactly the requested entry is
//! a `CorruptedLog`.

use parley_kernel::{BlockHeight, Digest, LedgerEntry, LogIndex, Principal};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::pending::{AppendStatus, TxId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountResponse {
    pub owner: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryDto {
    pub owner: String,
    pub index: u64,
    pub prompt_digest: String,
    pub response_digest: String,
    pub recorded_at: u64,
}

impl From<&LedgerEntry> for EntryDto {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            owner: entry.owner.to_string(),
            index: entry.index.0,
            prompt_digest: entry.prompt_digest.to_hex(),
            response_digest: entry.response_digest.to_hex(),
            recorded_at: entry.recorded_at.0,
        }
    }
}

impl EntryDto {
    /// Decodes the entry the caller asked for, or fails with `CorruptedLog`.
    pub fn decode(&self, expected_owner: &Principal, expected_index: LogIndex) -> Result<LedgerEntry, LedgerError> {
        if self.owner != expected_owner.as_str() {
            return Err(LedgerError::corrupted(
                expected_owner,
                format!("entry {} rendered for owner {:?}", expected_index, self.owner),
            ));
        }
        if self.index != expected_index.0 {
            return Err(LedgerError::corrupted(
                expected_owner,
                format!("requested index {} but got {}", expected_index, self.index),
            ));
        }

        let prompt_digest = Digest::from_hex(&self.prompt_digest).map_err(|_| {
            LedgerError::corrupted(expected_owner, format!("entry {expected_index} has a malformed prompt digest"))
        })?;
        let response_digest = Digest::from_hex(&self.response_digest).map_err(|_| {
            LedgerError::corrupted(expected_owner, format!("entry {expected_index} has a malformed response digest"))
        })?;

        Ok(LedgerEntry {
            owner: expected_owner.clone(),
            index: expected_index,
            prompt_digest,
            response_digest,
            recorded_at: BlockHeight(self.recorded_at),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryResponse {
    pub entry: Option<EntryDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub owner: String,
    pub entries: Vec<EntryDto>,
}

/// Body of `POST /v1/logs/:owner/append`. The sender travels in `x-ledger-sender`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendBody {
    pub prompt_digest: String,
    pub response_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendAccepted {
    pub tx_id: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatusResponse {
    pub tx_id: TxId,
    #[serde(flatten)]
    pub status: AppendStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Missing owner means no identity to check against.
    pub owner: Option<String>,
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub recorded: bool,
    pub entry: Option<EntryDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightResponse {
    pub height: u64,
}

/// Caller identity of an append. Taken on trust by the local host.
pub const SENDER_HEADER: &str = "x-ledger-sender";
