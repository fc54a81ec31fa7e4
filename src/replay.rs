//! Deterministic Replay Logic.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

use crate::error::KernelResult;
use crate::event::LedgerEvent;
use crate::ledger::LedgerState;
use crate::verify::state_root;

/// Rebuilds ledger state from an event sequence.
///
/// Fails on the first event that does not apply (out-of-order block,
/// unauthorized append). A valid log never contains either.
pub fn replay_events<'a, I>(events: I) -> KernelResult<LedgerState>
where
    I: IntoIterator<Item = &'a LedgerEvent>,
{
    let mut state = LedgerState::new();
    for event in events {
        state.apply_event(event)?;
    }
    Ok(state)
}

/// Replays `events` and returns the resulting state root.
pub fn replay_and_hash<'a, I>(events: I) -> KernelResult<[u8; 32]>
where
    I: IntoIterator<Item = &'a LedgerEvent>,
{
    let state = replay_events(events)?;
    Ok(state_root(&state))
}
