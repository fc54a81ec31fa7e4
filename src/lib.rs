// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! parley-kernel: the deterministic, no_std core of the Parley provenance ledger.
//!
//! Owns the digest codec, the per-owner append-only log state machine, the
//! event language used to persist it, and the blake3 commitments that prove it.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod error;
pub mod digest;
pub mod types;
pub mod entry;
pub mod event;
pub mod ledger;
pub mod replay;
pub mod verify;
pub mod proof;

pub use digest::{digest, Digest, DIGEST_LEN};
pub use entry::{EntryRecord, LedgerEntry, WIRE_ENTRY_LEN};
pub use error::{KernelError, KernelResult};
pub use event::LedgerEvent;
pub use ledger::LedgerState;
pub use types::id::{BlockHeight, LogIndex};
pub use types::principal::Principal;

#[cfg(test)]
pub mod tests;
