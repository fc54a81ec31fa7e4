// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Was this exact prompt/response pair recorded in the owner's log?
//!
//! # Guarantees
//! - `false` only after every entry below `count` was read and none matched
//! - An unreadable or inconsistent log is an error, never `false` or `true`
//! - The lowest matching index wins and no reads are issued after it

use std::time::Instant;

use futures::stream::{self, StreamExt};
use parley_kernel::{digest, Digest, LedgerEntry, LogIndex, Principal};
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerError;
use crate::store::{fetch_expected, LedgerStore};

pub struct VerificationEngine<S> {
    store: S,
    concurrency: usize,
}

impl<S: LedgerStore> VerificationEngine<S> {
    pub fn new(store: S, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn verify(
        &self,
        owner: Option<&Principal>,
        prompt: &str,
        response: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, LedgerError> {
        Ok(self.verify_detailed(owner, prompt, response, cancel).await?.is_some())
    }

    /// Like [`verify`](Self::verify) but returns the matching entry.
    pub async fn verify_detailed(
        &self,
        owner: Option<&Principal>,
        prompt: &str,
        response: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let owner = owner.ok_or(LedgerError::Unauthenticated)?;
        self.verify_digests(owner, &digest(prompt), &digest(response), cancel)
            .await
    }

    /// Scan for a pair given as digests.
    pub async fn verify_digests(
        &self,
        owner: &Principal,
        prompt: &Digest,
        response: &Digest,
        cancel: &CancellationToken,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let started = Instant::now();
        let result = self.scan(owner, prompt, response, cancel).await;

        let outcome = match &result {
            Ok(Some(_)) => "recorded",
            Ok(None) => "not_recorded",
            Err(LedgerError::Cancelled) => "cancelled",
            Err(_) => "error",
        };
        metrics::counter!("parley_verifications_total", 1, "outcome" => outcome);
        metrics::histogram!("parley_verification_duration_seconds", started.elapsed().as_secs_f64());

        match &result {
            Ok(Some(entry)) => tracing::debug!("Pair recorded for {} at index {}", owner, entry.index),
            Ok(None) => tracing::debug!("Pair not recorded for {}", owner),
            Err(e) => tracing::warn!("Verification for {} failed: {}", owner, e),
        }
        result
    }

    async fn scan(
        &self,
        owner: &Principal,
        prompt: &Digest,
        response: &Digest,
        cancel: &CancellationToken,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let count = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
            count = self.store.count(owner) => count?,
        };
        if count == 0 {
            return Ok(None);
        }

        let mut reads = stream::iter(0..count)
            .map(|i| fetch_expected(&self.store, owner, LogIndex(i)))
            .buffered(self.concurrency);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
                next = reads.next() => match next {
                    Some(entry) => {
                        let entry = entry?;
                        if entry.record().matches(prompt, response) {
                            return Ok(Some(entry));
                        }
                    }
                    None => return Ok(None),
                },
            }
        }
    }
}
