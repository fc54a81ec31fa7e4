// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Proof - Audit Trail Generation
//!
//! Binds the kernel's state root to the event log it was replayed from.
//!
//! # Guarantee
//! Same events → Same proof (across any architecture)

use parley_kernel::proof::LedgerProof;
use parley_kernel::{BlockHeight, LedgerState};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Event-sourced proof of ledger state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventProof {
    /// Whole-ledger commitment (height, owners, entries, state root).
    pub ledger: LedgerProof,

    /// BLAKE3 hash of the entire event log file (header + frames).
    /// All zeroes for an in-memory host.
    pub event_log_hash: [u8; 32],

    /// Number of events in the log
    pub event_count: u64,
}

impl EventProof {
    pub fn new(ledger: LedgerProof, event_log_hash: [u8; 32], event_count: u64) -> Self {
        Self {
            ledger,
            event_log_hash,
            event_count,
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.ledger.height
    }

    /// Verify two proofs match (for cross-host validation)
    pub fn matches(&self, other: &EventProof) -> bool {
        self.event_log_hash == other.event_log_hash
            && self.ledger.state_root == other.ledger.state_root
            && self.event_count == other.event_count
            && self.ledger.height == other.ledger.height
    }
}

/// Compute hash of event log file using BLAKE3
pub fn compute_event_log_hash(path: impl AsRef<Path>) -> std::io::Result<[u8; 32]> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Generate an event proof from the current ledger state.
pub fn generate_proof(
    state: &LedgerState,
    event_log_path: Option<&Path>,
    event_count: u64,
) -> std::io::Result<EventProof> {
    let event_log_hash = match event_log_path {
        Some(path) => compute_event_log_hash(path)?,
        None => [0u8; 32],
    };

    Ok(EventProof::new(LedgerProof::generate(state), event_log_hash, event_count))
}
