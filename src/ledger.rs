// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-owner append-only log state.
//!
//! # Invariants
//! - `index` of a new entry == number of entries the owner already has
//! - Indices per owner are 0, 1, 2, ... with no gaps and no reuse
//! - Nothing is ever updated, reordered or removed
//! - `recorded_at` is the height of the enclosing block, never caller input
//! - Appending for one owner never changes another owner's log

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::digest::Digest;
use crate::entry::{EntryRecord, LedgerEntry};
use crate::error::{KernelError, KernelResult};
use crate::event::LedgerEvent;
use crate::types::id::{BlockHeight, LogIndex};
use crate::types::principal::Principal;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    logs: BTreeMap<Principal, Vec<EntryRecord>>,
    height: BlockHeight,
    total_entries: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the currently open block.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Opens block `height`; it must be exactly one above the current height.
    pub fn begin_block(&mut self, height: BlockHeight) -> KernelResult<()> {
        let expected = self.height.next();
        if height != expected {
            return Err(KernelError::BlockOutOfOrder {
                expected: expected.0,
                found: height.0,
            });
        }
        self.height = height;
        Ok(())
    }

    /// Appends a pair to `owner`'s log and returns the assigned index.
    ///
    /// Only the owner may append to its own log. Duplicate digests are legal.
    pub fn append(
        &mut self,
        caller: &Principal,
        owner: &Principal,
        prompt_digest: Digest,
        response_digest: Digest,
    ) -> KernelResult<LogIndex> {
        if caller != owner {
            return Err(KernelError::Unauthorized);
        }

        let record = EntryRecord {
            prompt_digest,
            response_digest,
            recorded_at: self.height,
        };

        let log = self.logs.entry(owner.clone()).or_default();
        let index = LogIndex(log.len() as u64);
        log.push(record);
        self.total_entries += 1;

        Ok(index)
    }

    /// Entry at `index`, or `None` past the end of the log or for an unknown owner.
    pub fn get(&self, owner: &Principal, index: LogIndex) -> Option<LedgerEntry> {
        let log = self.logs.get(owner)?;
        let pos = usize::try_from(index.0).ok()?;
        log.get(pos)
            .map(|record| LedgerEntry::from_record(owner.clone(), index, *record))
    }

    pub fn count(&self, owner: &Principal) -> u64 {
        self.logs.get(owner).map_or(0, |log| log.len() as u64)
    }

    /// The owner's records in index order.
    pub fn records(&self, owner: &Principal) -> &[EntryRecord] {
        self.logs.get(owner).map(|log| log.as_slice()).unwrap_or(&[])
    }

    /// Owners with at least one entry, in canonical (sorted) order.
    pub fn owners(&self) -> impl Iterator<Item = &Principal> {
        self.logs.keys()
    }

    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Applies one event. Returns the assigned index for `LogInteraction`.
    pub fn apply_event(&mut self, event: &LedgerEvent) -> KernelResult<Option<LogIndex>> {
        match event {
            LedgerEvent::BeginBlock { height } => {
                self.begin_block(*height)?;
                Ok(None)
            }
            LedgerEvent::LogInteraction {
                sender,
                prompt_digest,
                response_digest,
            } => self
                .append(sender, sender, *prompt_digest, *response_digest)
                .map(Some),
        }
    }
}
