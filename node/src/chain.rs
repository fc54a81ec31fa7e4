// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process ledger host.
//!
//! Behaves like a single-validator chain: appends wait in a mempool and
//! become visible only when a block containing them is sealed.
//!
//! # Block production
//! 1. Drain the mempool
//! 2. Persist `BeginBlock` + one `LogInteraction` per append (fsync)
//! 3. Apply the whole block under one write lock
//! 4. Resolve every pending append with its assigned index
//!
//! Readers never observe a partially applied block.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parley_kernel::proof::{LedgerProof, OwnerLogProof};
use parley_kernel::verify::state_root;
use parley_kernel::{BlockHeight, LedgerEntry, LedgerEvent, LedgerState, LogIndex, Principal};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerError;
use crate::events::event_proof::{generate_proof, EventProof};
use crate::events::{recover_from_event_log, EventLogWriter};
use crate::pending::{pending_append, AppendResolver, AppendStatus, PendingAppend, TxId};
use crate::store::{AppendRequest, LedgerStore};

/// Receipts kept for resolved appends beyond those still in the mempool.
const RECEIPT_RETENTION: usize = 4096;

struct Queued {
    tx_id: TxId,
    request: AppendRequest,
    resolver: AppendResolver,
}

/// Transaction receipts, oldest evicted first once `capacity` is reached.
///
/// Receipts are not persisted: after a restart, or once evicted, a
/// transaction is unknown even if its entry exists.
struct Receipts {
    statuses: HashMap<TxId, AppendStatus>,
    order: VecDeque<TxId>,
    capacity: usize,
}

impl Receipts {
    fn new(capacity: usize) -> Self {
        Self {
            statuses: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, tx_id: TxId, status: AppendStatus) {
        if self.statuses.insert(tx_id, status).is_some() {
            return;
        }
        self.order.push_back(tx_id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.statuses.remove(&oldest);
            }
        }
    }

    fn get(&self, tx_id: &TxId) -> Option<&AppendStatus> {
        self.statuses.get(tx_id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

struct Mempool {
    queue: VecDeque<Queued>,
    receipts: Receipts,
    writer: Option<EventLogWriter>,
    nonce: u64,
}

pub struct LocalLedger {
    state: RwLock<LedgerState>,
    mempool: Mutex<Mempool>,
    max_pending: usize,
}

impl LocalLedger {
    /// A ledger that lives only in memory.
    pub fn new(max_pending: usize) -> Self {
        Self::from_parts(LedgerState::new(), None, max_pending)
    }

    /// Opens (or creates) an event-sourced ledger and replays its history.
    pub fn open(path: impl AsRef<Path>, max_pending: usize) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        // Opening the writer first drops any torn tail before replay reads the log.
        let writer = EventLogWriter::open(path)?;
        let recovered = recover_from_event_log(path)?;

        metrics::gauge!("parley_chain_height", recovered.state.height().0 as f64);
        Ok(Self::from_parts(recovered.state, Some(writer), max_pending))
    }

    fn from_parts(state: LedgerState, writer: Option<EventLogWriter>, max_pending: usize) -> Self {
        Self {
            state: RwLock::new(state),
            mempool: Mutex::new(Mempool {
                queue: VecDeque::new(),
                receipts: Receipts::new(max_pending.saturating_add(RECEIPT_RETENTION)),
                writer,
                nonce: 0,
            }),
            max_pending,
        }
    }

    pub async fn height(&self) -> BlockHeight {
        self.state.read().await.height()
    }

    pub async fn pending_count(&self) -> usize {
        self.mempool.lock().await.queue.len()
    }

    pub async fn event_log_path(&self) -> Option<PathBuf> {
        self.mempool
            .lock()
            .await
            .writer
            .as_ref()
            .map(|w| w.path().to_path_buf())
    }

    /// Seals one block from everything in the mempool.
    ///
    /// Returns the new height, or `None` when there was nothing to include.
    pub async fn produce_block(&self) -> Result<Option<BlockHeight>, LedgerError> {
        let mut guard = self.mempool.lock().await;
        let mempool = &mut *guard;
        if mempool.queue.is_empty() {
            return Ok(None);
        }
        let batch: Vec<Queued> = mempool.queue.drain(..).collect();

        let mut state = self.state.write().await;
        let height = state.height().next();

        let mut events = Vec::with_capacity(batch.len() + 1);
        events.push(LedgerEvent::BeginBlock { height });
        events.extend(batch.iter().map(|q| LedgerEvent::LogInteraction {
            sender: q.request.owner.clone(),
            prompt_digest: q.request.prompt_digest,
            response_digest: q.request.response_digest,
        }));

        // A failed write leaves the log as it was, so this height is reused.
        if let Some(writer) = mempool.writer.as_mut() {
            if let Err(e) = writer.append_batch(&events) {
                tracing::error!("Failed to persist block {}: {}", height, e);
                for q in batch {
                    mempool.receipts.insert(
                        q.tx_id,
                        AppendStatus::Failed {
                            reason: "block persistence failed".to_string(),
                        },
                    );
                    q.resolver.fail("block persistence failed");
                    metrics::counter!("parley_appends_failed_total", 1);
                }
                return Err(e.into());
            }
        }

        let mut assigned = Vec::with_capacity(batch.len());
        for event in &events {
            if let Some(index) = state.apply_event(event)? {
                assigned.push(index);
            }
        }
        drop(state);

        let included = batch.len();
        for (q, index) in batch.into_iter().zip(assigned) {
            mempool
                .receipts
                .insert(q.tx_id, AppendStatus::Included { index, height });
            q.resolver.include(index, height);
        }

        metrics::counter!("parley_blocks_produced_total", 1);
        metrics::counter!("parley_appends_included_total", included as u64);
        metrics::gauge!("parley_chain_height", height.0 as f64);
        tracing::debug!("Sealed block {} with {} appends", height, included);

        Ok(Some(height))
    }

    /// Drops a queued append before inclusion, as a chain does when a
    /// transaction is evicted from its mempool. `count` is unaffected.
    pub async fn evict_pending(&self, tx_id: &TxId, reason: &str) -> bool {
        let mut mempool = self.mempool.lock().await;
        let Some(pos) = mempool.queue.iter().position(|q| q.tx_id == *tx_id) else {
            return false;
        };
        let Some(queued) = mempool.queue.remove(pos) else {
            return false;
        };

        tracing::warn!("Evicting pending append {}: {}", tx_id, reason);
        mempool.receipts.insert(
            queued.tx_id,
            AppendStatus::Failed {
                reason: reason.to_string(),
            },
        );
        queued.resolver.fail(reason);
        metrics::counter!("parley_appends_failed_total", 1);
        true
    }

    /// Status of a submission, while its receipt is retained.
    pub async fn tx_status(&self, tx_id: &TxId) -> Option<AppendStatus> {
        self.mempool.lock().await.receipts.get(tx_id).cloned()
    }

    /// Runs `produce_block` every `interval` until `cancel` fires.
    pub fn spawn_block_producer(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Block producer stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = ledger.produce_block().await {
                            tracing::error!("Block production failed: {}", e);
                        }
                    }
                }
            }
        })
    }

    pub async fn owner_proof(&self, owner: &Principal) -> OwnerLogProof {
        OwnerLogProof::generate(&*self.state.read().await, owner)
    }

    pub async fn ledger_proof(&self) -> LedgerProof {
        LedgerProof::generate(&*self.state.read().await)
    }

    pub async fn state_root(&self) -> [u8; 32] {
        state_root(&*self.state.read().await)
    }

    /// Whole-ledger proof bound to the event log file (zero hash in memory).
    pub async fn event_proof(&self) -> Result<EventProof, LedgerError> {
        let mempool = self.mempool.lock().await;
        let state = self.state.read().await;
        let (path, count) = match mempool.writer.as_ref() {
            Some(w) => (Some(w.path()), w.event_count()),
            None => (None, 0),
        };
        generate_proof(&state, path, count).map_err(|e| LedgerError::EventLog(e.into()))
    }
}

impl LedgerStore for LocalLedger {
    async fn count(&self, owner: &Principal) -> Result<u64, LedgerError> {
        Ok(self.state.read().await.count(owner))
    }

    async fn get(&self, owner: &Principal, index: LogIndex) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.state.read().await.get(owner, index))
    }

    async fn submit_append(&self, request: AppendRequest) -> Result<PendingAppend, LedgerError> {
        request.authorize()?;

        let mut mempool = self.mempool.lock().await;
        if mempool.queue.len() >= self.max_pending {
            return Err(LedgerError::Rejected(format!(
                "mempool full ({} pending)",
                self.max_pending
            )));
        }

        mempool.nonce += 1;
        let tx_id = TxId::derive(
            &request.owner,
            &request.prompt_digest,
            &request.response_digest,
            mempool.nonce,
        );
        let (resolver, pending) = pending_append(tx_id);

        tracing::debug!("Accepted append {} for {}", tx_id, request.owner);
        mempool.receipts.insert(tx_id, AppendStatus::Pending);
        mempool.queue.push_back(Queued {
            tx_id,
            request,
            resolver,
        });
        metrics::counter!("parley_appends_submitted_total", 1);

        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_kernel::digest;

    fn request(owner: &str, q: &str, a: &str) -> AppendRequest {
        AppendRequest::own(Principal::parse(owner).unwrap(), digest(q), digest(a))
    }

    #[tokio::test]
    async fn test_entries_visible_only_after_block() {
        let ledger = LocalLedger::new(16);
        let alice = Principal::parse("alice").unwrap();

        let mut pending = ledger.submit_append(request("alice", "q", "a")).await.unwrap();
        assert_eq!(ledger.count(&alice).await.unwrap(), 0);
        assert_eq!(pending.status(), AppendStatus::Pending);

        assert_eq!(ledger.produce_block().await.unwrap(), Some(BlockHeight(1)));
        assert_eq!(pending.wait().await.unwrap(), LogIndex(0));
        assert_eq!(ledger.count(&alice).await.unwrap(), 1);

        let entry = ledger.get(&alice, LogIndex(0)).await.unwrap().unwrap();
        assert_eq!(entry.recorded_at, BlockHeight(1));
        assert_eq!(
            ledger.tx_status(&pending.tx_id()).await,
            Some(AppendStatus::Included {
                index: LogIndex(0),
                height: BlockHeight(1)
            })
        );
    }

    #[tokio::test]
    async fn test_empty_mempool_produces_nothing() {
        let ledger = LocalLedger::new(16);
        assert_eq!(ledger.produce_block().await.unwrap(), None);
        assert_eq!(ledger.height().await, BlockHeight(0));
    }

    #[tokio::test]
    async fn test_foreign_append_is_unauthorized() {
        let ledger = LocalLedger::new(16);
        let mut req = request("alice", "q", "a");
        req.caller = Principal::parse("mallory").unwrap();

        let err = ledger.submit_append(req).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert_eq!(ledger.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_eviction_leaves_count_unchanged() {
        let ledger = LocalLedger::new(16);
        let alice = Principal::parse("alice").unwrap();

        let mut pending = ledger.submit_append(request("alice", "q", "a")).await.unwrap();
        assert!(ledger.evict_pending(&pending.tx_id(), "fee too low").await);
        assert!(matches!(pending.wait().await, Err(LedgerError::Rejected(_))));

        assert_eq!(ledger.produce_block().await.unwrap(), None);
        assert_eq!(ledger.count(&alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mempool_bound() {
        let ledger = LocalLedger::new(1);
        ledger.submit_append(request("alice", "q1", "a1")).await.unwrap();
        let err = ledger.submit_append(request("alice", "q2", "a2")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_reopen_replays_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let bob = Principal::parse("bob").unwrap();

        let root = {
            let ledger = LocalLedger::open(&path, 16).unwrap();
            for i in 0..3 {
                ledger
                    .submit_append(request("bob", &format!("q{i}"), &format!("a{i}")))
                    .await
                    .unwrap();
                ledger.produce_block().await.unwrap();
            }
            ledger.state_root().await
        };

        let reopened = LocalLedger::open(&path, 16).unwrap();
        assert_eq!(reopened.height().await, BlockHeight(3));
        assert_eq!(reopened.count(&bob).await.unwrap(), 3);
        assert_eq!(reopened.state_root().await, root);

        let proof = reopened.event_proof().await.unwrap();
        assert_eq!(proof.event_count, 6);
        assert_ne!(proof.event_log_hash, [0u8; 32]);
    }

    #[tokio::test]
    async fn test_failed_block_write_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let alice = Principal::parse("alice").unwrap();

        let ledger = LocalLedger::open(&path, 16).unwrap();
        let mut lost = ledger.submit_append(request("alice", "lost", "a")).await.unwrap();
        ledger
            .mempool
            .lock()
            .await
            .writer
            .as_mut()
            .unwrap()
            .fail_next_write_after(12);

        assert!(ledger.produce_block().await.is_err());
        assert!(matches!(lost.wait().await, Err(LedgerError::Rejected(_))));
        assert!(matches!(
            ledger.tx_status(&lost.tx_id()).await,
            Some(AppendStatus::Failed { .. })
        ));
        assert_eq!(ledger.height().await, BlockHeight(0));

        // The next block takes the height the failed one would have had.
        let mut kept = ledger.submit_append(request("alice", "kept", "a")).await.unwrap();
        assert_eq!(ledger.produce_block().await.unwrap(), Some(BlockHeight(1)));
        assert_eq!(kept.wait().await.unwrap(), LogIndex(0));
        drop(ledger);

        let reopened = LocalLedger::open(&path, 16).unwrap();
        assert_eq!(reopened.height().await, BlockHeight(1));
        assert_eq!(reopened.count(&alice).await.unwrap(), 1);
        let entry = reopened.get(&alice, LogIndex(0)).await.unwrap().unwrap();
        assert_eq!(entry.prompt_digest, digest("kept"));
    }

    #[tokio::test]
    async fn test_receipts_are_bounded() {
        let ledger = LocalLedger::new(2);
        let cap = 2 + RECEIPT_RETENTION;

        let first = ledger.submit_append(request("alice", "q0", "a")).await.unwrap();
        ledger.produce_block().await.unwrap();
        for i in 1..=cap {
            ledger
                .submit_append(request("alice", &format!("q{i}"), "a"))
                .await
                .unwrap();
            ledger.produce_block().await.unwrap();
        }

        assert_eq!(ledger.mempool.lock().await.receipts.len(), cap);
        assert_eq!(ledger.tx_status(&first.tx_id()).await, None);
        assert_eq!(ledger.count(&Principal::parse("alice").unwrap()).await.unwrap(), cap as u64 + 1);
    }

    #[tokio::test]
    async fn test_receipts_do_not_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        let tx_id = {
            let ledger = LocalLedger::open(&path, 16).unwrap();
            let mut pending = ledger.submit_append(request("alice", "q", "a")).await.unwrap();
            ledger.produce_block().await.unwrap();
            pending.wait().await.unwrap();
            pending.tx_id()
        };

        let reopened = LocalLedger::open(&path, 16).unwrap();
        assert_eq!(reopened.count(&Principal::parse("alice").unwrap()).await.unwrap(), 1);
        assert_eq!(reopened.tx_status(&tx_id).await, None);
    }
}
