//! Ledger Proof Structures.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerState;
use crate::types::id::BlockHeight;
use crate::types::principal::Principal;
use crate::verify::{owner_log_hash, state_root, COMMITMENT_VERSION};

/// Commitment to one owner's log at a given height.
///
/// Two hosts that agree on `log_hash` agree on every entry of the log,
/// including order and block heights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerLogProof {
    pub version: u32,
    pub owner: Principal,
    pub entry_count: u64,
    pub height: BlockHeight,
    pub log_hash: [u8; 32],
}

impl OwnerLogProof {
    pub fn generate(state: &LedgerState, owner: &Principal) -> Self {
        let records = state.records(owner);
        Self {
            version: COMMITMENT_VERSION,
            owner: owner.clone(),
            entry_count: records.len() as u64,
            height: state.height(),
            log_hash: owner_log_hash(owner, records),
        }
    }

    /// Same owner, same log. Height may differ: a later block that did not
    /// touch this owner leaves the log unchanged.
    pub fn matches(&self, other: &OwnerLogProof) -> bool {
        self.owner == other.owner
            && self.entry_count == other.entry_count
            && self.log_hash == other.log_hash
    }
}

/// Commitment to the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerProof {
    pub version: u32,
    pub height: BlockHeight,
    pub owner_count: u64,
    pub total_entries: u64,
    pub state_root: [u8; 32],
}

impl LedgerProof {
    pub fn generate(state: &LedgerState) -> Self {
        Self {
            version: COMMITMENT_VERSION,
            height: state.height(),
            owner_count: state.owners().count() as u64,
            total_entries: state.total_entries(),
            state_root: state_root(state),
        }
    }
}
