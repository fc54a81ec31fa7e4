// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Replay - Authoritative Recovery
//!
//! **The event log ALWAYS wins.** On startup a local host rebuilds its ledger
//! by replaying every committed event through the kernel state machine.
//!
//! # Invariants
//! - If the event log is corrupt → fail closed
//! - If an event does not apply (block out of order) → fail closed
//! - Crash-symmetric: replay(events) = state before the crash

use parley_kernel::replay::replay_events;
use parley_kernel::verify::state_root;
use parley_kernel::LedgerState;
use std::path::Path;

use crate::errors::LedgerError;
use crate::events::event_log::read_events;

/// State rebuilt from an event log.
#[derive(Debug)]
pub struct Recovered {
    pub state: LedgerState,
    pub event_count: u64,
    pub state_root: [u8; 32],
}

/// Replays the event log at `path` into a fresh ledger state.
pub fn recover_from_event_log(path: impl AsRef<Path>) -> Result<Recovered, LedgerError> {
    let path = path.as_ref();
    let events = read_events(path)?;

    let state = replay_events(&events).map_err(|e| {
        tracing::error!("Replay of {:?} failed: {}", path, e);
        LedgerError::Kernel(e)
    })?;
    let root = state_root(&state);

    tracing::info!(
        "Recovered {} events from {:?}: height={}, entries={}, root={}",
        events.len(),
        path,
        state.height(),
        state.total_entries(),
        hex_prefix(&root)
    );

    Ok(Recovered {
        state,
        event_count: events.len() as u64,
        state_root: root,
    })
}

fn hex_prefix(hash: &[u8; 32]) -> String {
    hash[..8].iter().map(|b| format!("{b:02x}")).collect()
}
