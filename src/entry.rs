// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger entries and their fixed binary wire form.
//!
//! # Wire Format (72 bytes)
//! ```text
//! [prompt_digest: 32][response_digest: 32][recorded_at: u64 LE]
//! ```
//! Decoding is strict: any other length is `MalformedEntry`. There is no
//! partial decode and no defaulting of missing fields.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, DIGEST_LEN};
use crate::error::{KernelError, KernelResult};
use crate::types::id::{BlockHeight, LogIndex};
use crate::types::principal::Principal;

pub const WIRE_ENTRY_LEN: usize = DIGEST_LEN * 2 + 8;

/// What the ledger stores at `(owner, index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub prompt_digest: Digest,
    pub response_digest: Digest,
    pub recorded_at: BlockHeight,
}

impl EntryRecord {
    pub fn to_wire(&self) -> [u8; WIRE_ENTRY_LEN] {
        let mut buf = [0u8; WIRE_ENTRY_LEN];
        buf[0..DIGEST_LEN].copy_from_slice(self.prompt_digest.as_bytes());
        buf[DIGEST_LEN..DIGEST_LEN * 2].copy_from_slice(self.response_digest.as_bytes());
        LittleEndian::write_u64(&mut buf[DIGEST_LEN * 2..], self.recorded_at.0);
        buf
    }

    pub fn from_wire(bytes: &[u8]) -> KernelResult<Self> {
        if bytes.len() != WIRE_ENTRY_LEN {
            return Err(KernelError::MalformedEntry);
        }
        let prompt_digest = Digest::from_slice(&bytes[0..DIGEST_LEN])?;
        let response_digest = Digest::from_slice(&bytes[DIGEST_LEN..DIGEST_LEN * 2])?;
        let recorded_at = BlockHeight(LittleEndian::read_u64(&bytes[DIGEST_LEN * 2..]));
        Ok(Self {
            prompt_digest,
            response_digest,
            recorded_at,
        })
    }

    /// Exact match on both digests. A prompt-only or response-only match is not a match.
    pub fn matches(&self, prompt: &Digest, response: &Digest) -> bool {
        self.prompt_digest == *prompt && self.response_digest == *response
    }
}

/// A record together with the address it lives at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub owner: Principal,
    pub index: LogIndex,
    pub prompt_digest: Digest,
    pub response_digest: Digest,
    pub recorded_at: BlockHeight,
}

impl LedgerEntry {
    pub fn from_record(owner: Principal, index: LogIndex, record: EntryRecord) -> Self {
        Self {
            owner,
            index,
            prompt_digest: record.prompt_digest,
            response_digest: record.response_digest,
            recorded_at: record.recorded_at,
        }
    }

    pub fn record(&self) -> EntryRecord {
        EntryRecord {
            prompt_digest: self.prompt_digest,
            response_digest: self.response_digest,
            recorded_at: self.recorded_at,
        }
    }

    pub fn matches(&self, prompt: &Digest, response: &Digest) -> bool {
        self.record().matches(prompt, response)
    }
}
