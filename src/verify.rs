//! Deterministic Hashing and Verification.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::entry::EntryRecord;
use crate::ledger::LedgerState;
use crate::types::principal::Principal;

/// Version byte mixed into every commitment.
pub const COMMITMENT_VERSION: u32 = 1;

/// BLAKE3 commitment to one owner's full log.
///
/// # Hash Input Structure
/// ```text
/// version (u32 LE)
/// owner length (u32 LE) | owner bytes
/// entry count (u64 LE)
/// For each entry (index order):
///   index (u64 LE)
///   wire record (72 bytes)
/// ```
pub fn owner_log_hash(owner: &Principal, records: &[EntryRecord]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&COMMITMENT_VERSION.to_le_bytes());
    hasher.update(&(owner.as_bytes().len() as u32).to_le_bytes());
    hasher.update(owner.as_bytes());
    hasher.update(&(records.len() as u64).to_le_bytes());

    for (i, record) in records.iter().enumerate() {
        hasher.update(&(i as u64).to_le_bytes());
        hasher.update(&record.to_wire());
    }

    *hasher.finalize().as_bytes()
}

/// BLAKE3 root over every owner's log hash, owners in sorted order, plus the
/// current block height.
pub fn state_root(state: &LedgerState) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&COMMITMENT_VERSION.to_le_bytes());
    hasher.update(&state.height().0.to_le_bytes());

    for owner in state.owners() {
        hasher.update(&owner_log_hash(owner, state.records(owner)));
    }

    *hasher.finalize().as_bytes()
}
