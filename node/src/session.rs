// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client session: who is acting, and the operations they act with.
//!
//! The session resolves the owner through a [`Wallet`], keeps it in an
//! explicit [`AddressCache`], and drives appends, history and verification
//! against a [`LedgerStore`].
//!
//! # Owner resolution
//! 1. A cached owner is used as-is
//! 2. Otherwise the wallet's live identity is fetched and cached
//! 3. If the live lookup fails, the wallet's stored hint is used for reads
//!    only. The hint is never cached and never signs an append.

use std::future::Future;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use parley_kernel::{digest, LedgerEntry, LogIndex, Principal};
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerError;
use crate::projector::{LogProjector, ProjectedEntry};
use crate::store::{AppendRequest, LedgerStore};
use crate::verifier::VerificationEngine;

/// Source of the acting identity.
pub trait Wallet: Send + Sync {
    /// Live identity. Fails with `Unauthenticated` when nothing is connected.
    fn current_owner(&self) -> impl Future<Output = Result<Principal, LedgerError>> + Send;

    /// Last identity persisted by the wallet, if any.
    fn stored_owner(&self) -> Option<Principal>;
}

/// A wallet held in process memory.
#[derive(Debug, Default)]
pub struct LocalWallet {
    connected: RwLock<Option<Principal>>,
    stored: RwLock<Option<Principal>>,
}

impl LocalWallet {
    pub fn connected(owner: Principal) -> Self {
        Self {
            connected: RwLock::new(Some(owner.clone())),
            stored: RwLock::new(Some(owner)),
        }
    }

    /// Connect as `owner`, which also becomes the stored hint.
    pub fn connect(&self, owner: Principal) {
        *self.stored.write().unwrap_or_else(PoisonError::into_inner) = Some(owner.clone());
        *self.connected.write().unwrap_or_else(PoisonError::into_inner) = Some(owner);
    }

    /// Drops the live identity; the stored hint survives.
    pub fn disconnect(&self) {
        *self.connected.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn set_stored(&self, owner: Option<Principal>) {
        *self.stored.write().unwrap_or_else(PoisonError::into_inner) = owner;
    }
}

impl Wallet for LocalWallet {
    async fn current_owner(&self) -> Result<Principal, LedgerError> {
        self.connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LedgerError::Unauthenticated)
    }

    fn stored_owner(&self) -> Option<Principal> {
        self.stored.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Debug, Default)]
pub struct AddressCache {
    owner: Option<Principal>,
}

impl AddressCache {
    pub fn get(&self) -> Option<&Principal> {
        self.owner.as_ref()
    }

    pub fn set(&mut self, owner: Principal) {
        self.owner = Some(owner);
    }

    pub fn invalidate(&mut self) {
        self.owner = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSource {
    Cache,
    Live,
    StoredHint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub owner: Principal,
    pub source: OwnerSource,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub scan_concurrency: usize,
    pub confirmation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_concurrency: 8,
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

pub struct Session<W, S> {
    wallet: W,
    store: S,
    cache: Mutex<AddressCache>,
    config: SessionConfig,
}

impl<W: Wallet, S: LedgerStore> Session<W, S> {
    pub fn new(wallet: W, store: S, config: SessionConfig) -> Self {
        Self {
            wallet,
            store,
            cache: Mutex::new(AddressCache::default()),
            config,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn cached_owner(&self) -> Option<Principal> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).get().cloned()
    }

    fn invalidate_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).invalidate();
    }

    pub async fn resolve_owner(&self) -> Result<ResolvedOwner, LedgerError> {
        if let Some(owner) = self.cached_owner() {
            return Ok(ResolvedOwner {
                owner,
                source: OwnerSource::Cache,
            });
        }

        match self.wallet.current_owner().await {
            Ok(owner) => {
                if let Some(hint) = self.wallet.stored_owner() {
                    if hint != owner {
                        tracing::warn!("Stored owner {} disagrees with live owner {}", hint, owner);
                        metrics::counter!("parley_owner_hint_mismatch_total", 1);
                    }
                }
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set(owner.clone());
                Ok(ResolvedOwner {
                    owner,
                    source: OwnerSource::Live,
                })
            }
            Err(e) => match self.wallet.stored_owner() {
                Some(hint) => {
                    tracing::warn!("Live owner lookup failed ({}); using stored owner {}", e, hint);
                    Ok(ResolvedOwner {
                        owner: hint,
                        source: OwnerSource::StoredHint,
                    })
                }
                None => Err(e),
            },
        }
    }

    /// Drops the cached owner and resolves again.
    pub async fn reconnect(&self) -> Result<ResolvedOwner, LedgerError> {
        self.invalidate_cache();
        self.resolve_owner().await
    }

    /// Records one exchange in the acting owner's log and waits for inclusion.
    pub async fn record_exchange(
        &self,
        prompt: &str,
        response: &str,
        cancel: &CancellationToken,
    ) -> Result<LogIndex, LedgerError> {
        let resolved = self.resolve_owner().await?;
        if resolved.source == OwnerSource::StoredHint {
            // A remembered address cannot sign.
            return Err(LedgerError::Unauthenticated);
        }

        let request = AppendRequest::own(resolved.owner, digest(prompt), digest(response));
        let result = self.store.submit_append(request).await;
        self.invalidate_cache();

        let mut pending = result?;
        tracing::info!("Submitted exchange as {}", pending.tx_id());
        pending
            .wait_cancellable(self.config.confirmation_timeout, cancel)
            .await
    }

    pub async fn verify_exchange(
        &self,
        prompt: &str,
        response: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, LedgerError> {
        Ok(self.find_exchange(prompt, response, cancel).await?.is_some())
    }

    /// The entry that recorded this exchange, if any.
    pub async fn find_exchange(
        &self,
        prompt: &str,
        response: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let resolved = self.resolve_owner().await?;
        VerificationEngine::new(&self.store, self.config.scan_concurrency)
            .verify_detailed(Some(&resolved.owner), prompt, response, cancel)
            .await
    }

    pub async fn history(&self, cancel: &CancellationToken) -> Result<Vec<ProjectedEntry>, LedgerError> {
        let resolved = self.resolve_owner().await?;
        LogProjector::new(&self.store, self.config.scan_concurrency)
            .project_all(&resolved.owner, cancel)
            .await
    }
}
