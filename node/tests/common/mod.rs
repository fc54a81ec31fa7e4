// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parley_kernel::{digest, BlockHeight, LedgerEntry, LogIndex, Principal};
use parley_node::chain::LocalLedger;
use parley_node::pending::PendingAppend;
use parley_node::{AppendRequest, LedgerError, LedgerStore};

pub fn principal(name: &str) -> Principal {
    Principal::parse(name).unwrap()
}

pub fn entry(owner: &Principal, index: u64, prompt: &str, response: &str) -> LedgerEntry {
    LedgerEntry {
        owner: owner.clone(),
        index: LogIndex(index),
        prompt_digest: digest(prompt),
        response_digest: digest(response),
        recorded_at: BlockHeight(1),
    }
}

/// Appends one pair and seals it into its own block.
pub async fn record(ledger: &LocalLedger, owner: &str, prompt: &str, response: &str) -> LogIndex {
    let request = AppendRequest::own(principal(owner), digest(prompt), digest(response));
    let mut pending = ledger.submit_append(request).await.unwrap();
    ledger.produce_block().await.unwrap();
    pending.wait().await.unwrap()
}

/// A store whose answers are fixed up front, for exercising inconsistent
/// ledgers and counting reads.
pub struct ScriptedStore {
    pub count: u64,
    /// What `count` reports after its first read, as if an append landed.
    pub count_after_first: Option<u64>,
    pub entries: HashMap<u64, LedgerEntry>,
    pub read_delay: Option<Duration>,
    pub reads: AtomicUsize,
    pub count_reads: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(count: u64, entries: Vec<LedgerEntry>) -> Self {
        Self {
            count,
            count_after_first: None,
            entries: entries.into_iter().map(|e| (e.index.0, e)).collect(),
            read_delay: None,
            reads: AtomicUsize::new(0),
            count_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn with_growing_count(mut self, later: u64) -> Self {
        self.count_after_first = Some(later);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn count_reads(&self) -> usize {
        self.count_reads.load(Ordering::SeqCst)
    }
}

impl LedgerStore for ScriptedStore {
    async fn count(&self, _owner: &Principal) -> Result<u64, LedgerError> {
        let previous = self.count_reads.fetch_add(1, Ordering::SeqCst);
        match self.count_after_first {
            Some(later) if previous > 0 => Ok(later),
            _ => Ok(self.count),
        }
    }

    async fn get(&self, _owner: &Principal, index: LogIndex) -> Result<Option<LedgerEntry>, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.entries.get(&index.0).cloned())
    }

    async fn submit_append(&self, _request: AppendRequest) -> Result<PendingAppend, LedgerError> {
        Err(LedgerError::Rejected("read-only store".to_string()))
    }
}

/// A store whose every call fails in transport.
pub struct UnreachableStore;

impl LedgerStore for UnreachableStore {
    async fn count(&self, _owner: &Principal) -> Result<u64, LedgerError> {
        Err(LedgerError::TransportFailure("connection refused".to_string()))
    }

    async fn get(&self, _owner: &Principal, _index: LogIndex) -> Result<Option<LedgerEntry>, LedgerError> {
        Err(LedgerError::TransportFailure("connection refused".to_string()))
    }

    async fn submit_append(&self, _request: AppendRequest) -> Result<PendingAppend, LedgerError> {
        Err(LedgerError::TransportFailure("connection refused".to_string()))
    }
}
