// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Full-history projection of one owner's log.

use futures::stream::{self, StreamExt};
use parley_kernel::{BlockHeight, Digest, LedgerEntry, LogIndex, Principal};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerError;
use crate::store::{fetch_expected, LedgerStore};

/// Upper bound on the up-front allocation for a projection; `count` comes
/// from the ledger and is not trusted to size memory.
const MAX_PREALLOC: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEntry {
    pub index: LogIndex,
    pub prompt_digest: Digest,
    pub response_digest: Digest,
    pub prompt_hex: String,
    pub response_hex: String,
    pub recorded_at: BlockHeight,
}

impl From<LedgerEntry> for ProjectedEntry {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            index: entry.index,
            prompt_hex: entry.prompt_digest.to_hex(),
            response_hex: entry.response_digest.to_hex(),
            prompt_digest: entry.prompt_digest,
            response_digest: entry.response_digest,
            recorded_at: entry.recorded_at,
        }
    }
}

pub struct LogProjector<S> {
    store: S,
    concurrency: usize,
}

impl<S: LedgerStore> LogProjector<S> {
    pub fn new(store: S, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every entry of `owner`'s log in ascending index order.
    ///
    /// `count` is read once and bounds the scan; appends that land while the
    /// scan runs are not included. Empty history is `Ok(vec![])`.
    pub async fn project_all(
        &self,
        owner: &Principal,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProjectedEntry>, LedgerError> {
        let count = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
            count = self.store.count(owner) => count?,
        };

        let mut reads = stream::iter(0..count)
            .map(|i| fetch_expected(&self.store, owner, LogIndex(i)))
            .buffered(self.concurrency);

        let mut entries = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
                next = reads.next() => match next {
                    Some(entry) => entries.push(ProjectedEntry::from(entry?)),
                    None => break,
                },
            }
        }

        tracing::debug!("Projected {} entries for {}", entries.len(), owner);
        Ok(entries)
    }
}
