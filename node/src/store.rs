// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The ledger as seen by readers and submitters.
//!
//! [`LedgerStore`] is the seam between the projector/verifier and whatever
//! hosts the ledger: the in-process [`LocalLedger`](crate::chain::LocalLedger)
//! or a [`RemoteLedger`](crate::network::RemoteLedger) across HTTP.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use parley_kernel::{Digest, LedgerEntry, LogIndex, Principal};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::pending::PendingAppend;

/// A signed request to append one pair to `owner`'s log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendRequest {
    /// Identity that signed the submission.
    pub caller: Principal,
    pub owner: Principal,
    pub prompt_digest: Digest,
    pub response_digest: Digest,
}

impl AppendRequest {
    /// An append to the caller's own log, the only kind the ledger accepts.
    pub fn own(owner: Principal, prompt_digest: Digest, response_digest: Digest) -> Self {
        Self {
            caller: owner.clone(),
            owner,
            prompt_digest,
            response_digest,
        }
    }

    pub fn authorize(&self) -> Result<(), LedgerError> {
        if self.caller != self.owner {
            return Err(LedgerError::Unauthorized {
                caller: self.caller.clone(),
                owner: self.owner.clone(),
            });
        }
        Ok(())
    }
}

/// Per-owner append-only log storage.
///
/// `count` never decreases and `get(owner, i)` is `Some` exactly for
/// `i < count(owner)`. Reads are repeatable and safe to run concurrently.
pub trait LedgerStore: Send + Sync {
    fn count(&self, owner: &Principal) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    fn get(
        &self,
        owner: &Principal,
        index: LogIndex,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, LedgerError>> + Send;

    /// Fails immediately with `Unauthorized` when `caller != owner`. Once
    /// accepted the append resolves through the returned [`PendingAppend`].
    fn submit_append(
        &self,
        request: AppendRequest,
    ) -> impl Future<Output = Result<PendingAppend, LedgerError>> + Send;
}

impl<T: LedgerStore> LedgerStore for Arc<T> {
    fn count(&self, owner: &Principal) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).count(owner)
    }

    fn get(
        &self,
        owner: &Principal,
        index: LogIndex,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, LedgerError>> + Send {
        (**self).get(owner, index)
    }

    fn submit_append(
        &self,
        request: AppendRequest,
    ) -> impl Future<Output = Result<PendingAppend, LedgerError>> + Send {
        (**self).submit_append(request)
    }
}

impl<T: LedgerStore> LedgerStore for &T {
    fn count(&self, owner: &Principal) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).count(owner)
    }

    fn get(
        &self,
        owner: &Principal,
        index: LogIndex,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, LedgerError>> + Send {
        (**self).get(owner, index)
    }

    fn submit_append(
        &self,
        request: AppendRequest,
    ) -> impl Future<Output = Result<PendingAppend, LedgerError>> + Send {
        (**self).submit_append(request)
    }
}

/// Reads an entry that must exist because `index` is below a count already read.
///
/// A missing entry, or one addressed to another owner or index, is a
/// `CorruptedLog`. Corruption is logged and counted here so every scanner
/// reports it the same way.
pub async fn fetch_expected<S: LedgerStore>(
    store: &S,
    owner: &Principal,
    index: LogIndex,
) -> Result<LedgerEntry, LedgerError> {
    let result = match store.get(owner, index).await {
        Ok(Some(entry)) if entry.owner == *owner && entry.index == index => Ok(entry),
        Ok(Some(entry)) => Err(LedgerError::corrupted(
            owner,
            format!("read of index {} returned {}/{}", index, entry.owner, entry.index),
        )),
        Ok(None) => Err(LedgerError::corrupted(
            owner,
            format!("entry {index} missing below the reported count"),
        )),
        Err(e) => Err(e),
    };

    if let Err(LedgerError::CorruptedLog { owner, detail }) = &result {
        tracing::error!("Corrupted log for {}: {}", owner, detail);
        metrics::counter!("parley_corrupted_log_total", 1);
    }
    result
}

/// Read-through cache of immutable entries.
///
/// Entries never change once written, so only `get` hits are cached; `count`
/// always goes to the inner store. Appends routed through the cache drop the
/// owner's cached entries.
pub struct CachedStore<S> {
    inner: S,
    entries: RwLock<HashMap<(Principal, LogIndex), LedgerEntry>>,
}

impl<S> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate(&self, owner: &Principal) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(cached_owner, _), _| cached_owner != owner);
    }

    pub fn cached_len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<S: LedgerStore> LedgerStore for CachedStore<S> {
    async fn count(&self, owner: &Principal) -> Result<u64, LedgerError> {
        self.inner.count(owner).await
    }

    async fn get(&self, owner: &Principal, index: LogIndex) -> Result<Option<LedgerEntry>, LedgerError> {
        let key = (owner.clone(), index);
        let hit = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entry) = hit {
            return Ok(Some(entry));
        }

        let fetched = self.inner.get(owner, index).await?;
        if let Some(entry) = &fetched {
            self.entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, entry.clone());
        }
        Ok(fetched)
    }

    async fn submit_append(&self, request: AppendRequest) -> Result<PendingAppend, LedgerError> {
        self.invalidate(&request.owner);
        self.inner.submit_append(request).await
    }
}
