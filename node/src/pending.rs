// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Submitted-but-unconfirmed appends.
//!
//! A submission is accepted into a mempool long before its entry exists. The
//! host keeps an [`AppendResolver`] and the submitter keeps the matching
//! [`PendingAppend`], which observes one of three states over a watch channel.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parley_kernel::{BlockHeight, Digest, LogIndex, Principal};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerError;

/// Transaction id of a submitted append (BLAKE3 over owner, digests and a host nonce).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn derive(owner: &Principal, prompt: &Digest, response: &Digest, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(owner.as_bytes().len() as u32).to_le_bytes());
        hasher.update(owner.as_bytes());
        hasher.update(prompt.as_bytes());
        hasher.update(response.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({self})")
    }
}

impl FromStr for TxId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Same strict form as digests: 64 lowercase hex digits.
        Digest::from_hex(s)
            .map(|d| TxId(*d.as_bytes()))
            .map_err(|_| LedgerError::InvalidInput(format!("malformed transaction id: {s}")))
    }
}

impl TryFrom<String> for TxId {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> String {
        id.to_string()
    }
}

/// Observable state of a submitted append.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendStatus {
    Pending,
    Included { index: LogIndex, height: BlockHeight },
    /// Dropped before inclusion. No entry exists and `count` is unchanged.
    Failed { reason: String },
    /// The host no longer knows the submission (receipt evicted or host
    /// restarted). The entry may or may not exist.
    Unknown { reason: String },
}

/// Host side of a pending append.
#[derive(Debug)]
pub struct AppendResolver {
    tx: watch::Sender<AppendStatus>,
}

impl AppendResolver {
    pub fn include(self, index: LogIndex, height: BlockHeight) {
        // A submitter that stopped listening is not an error.
        let _ = self.tx.send(AppendStatus::Included { index, height });
    }

    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(AppendStatus::Failed { reason: reason.into() });
    }

    pub fn lose(self, reason: impl Into<String>) {
        let _ = self.tx.send(AppendStatus::Unknown { reason: reason.into() });
    }

    /// True once every `PendingAppend` for this submission is gone.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Submitter side of an append that has been accepted but not yet included.
#[derive(Debug, Clone)]
pub struct PendingAppend {
    tx_id: TxId,
    rx: watch::Receiver<AppendStatus>,
}

/// Creates a linked resolver/pending pair in the `Pending` state.
pub fn pending_append(tx_id: TxId) -> (AppendResolver, PendingAppend) {
    let (tx, rx) = watch::channel(AppendStatus::Pending);
    (AppendResolver { tx }, PendingAppend { tx_id, rx })
}

impl PendingAppend {
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn status(&self) -> AppendStatus {
        self.rx.borrow().clone()
    }

    /// Waits for inclusion and returns the assigned index.
    ///
    /// `Failed` and a resolver dropped while still pending both surface as
    /// `Rejected`: the append did not happen. `Unknown` surfaces as
    /// `OutcomeUnknown`; resubmitting then risks a duplicate entry.
    pub async fn wait(&mut self) -> Result<LogIndex, LedgerError> {
        loop {
            if let Some(resolved) = resolution(&self.rx.borrow_and_update()) {
                return resolved;
            }
            if self.rx.changed().await.is_err() {
                // Sender gone; the final value may still be a resolution.
                return resolution(&self.rx.borrow()).unwrap_or_else(|| {
                    Err(LedgerError::Rejected(
                        "submission dropped before inclusion".to_string(),
                    ))
                });
            }
        }
    }

    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<LogIndex, LedgerError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| LedgerError::ConfirmationTimeout(timeout))?
    }

    /// As [`wait_timeout`](Self::wait_timeout), returning `Cancelled` as soon as `cancel` fires.
    ///
    /// Cancelling stops the wait only. The submission itself may still be included.
    pub async fn wait_cancellable(
        &mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<LogIndex, LedgerError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LedgerError::Cancelled),
            res = self.wait_timeout(timeout) => res,
        }
    }
}

fn resolution(status: &AppendStatus) -> Option<Result<LogIndex, LedgerError>> {
    match status {
        AppendStatus::Pending => None,
        AppendStatus::Included { index, .. } => Some(Ok(*index)),
        AppendStatus::Failed { reason } => Some(Err(LedgerError::Rejected(reason.clone()))),
        AppendStatus::Unknown { reason } => Some(Err(LedgerError::OutcomeUnknown(reason.clone()))),
    }
}
