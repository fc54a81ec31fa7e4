// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! `LedgerStore` over a node's HTTP API.
//!
//! Error bodies are mapped back onto `LedgerError` by their machine code, so
//! "check failed" never degrades into "not recorded" across the wire.

use std::time::Duration;

use parley_kernel::{LedgerEntry, LogIndex, Principal};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::{
    AppendAccepted, AppendBody, ApiErrorBody, CountResponse, EntryResponse, HeightResponse, TxStatusResponse,
    SENDER_HEADER,
};
use crate::errors::LedgerError;
use crate::pending::{pending_append, AppendResolver, AppendStatus, PendingAppend, TxId};
use crate::store::{AppendRequest, LedgerStore};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RemoteLedger {
    base_url: String,
    client: Client,
    auth_token: Option<String>,
    poll_interval: Duration,
}

impl RemoteLedger {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            auth_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, LedgerError> {
        self.authorized(req)
            .send()
            .await
            .map_err(|e| LedgerError::TransportFailure(e.to_string()))
    }

    pub async fn height(&self) -> Result<u64, LedgerError> {
        let url = format!("{}/v1/chain/height", self.base_url);
        let resp = self.send(self.client.get(&url)).await?;
        let body: HeightResponse = read_body(resp, None)
            .await?
            .map_err(|e| LedgerError::TransportFailure(format!("malformed height response: {e}")))?;
        Ok(body.height)
    }

    pub async fn tx_status(&self, tx_id: &TxId) -> Result<Option<AppendStatus>, LedgerError> {
        let url = format!("{}/v1/tx/{}", self.base_url, tx_id);
        let resp = self.send(self.client.get(&url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: TxStatusResponse = read_body(resp, None)
            .await?
            .map_err(|e| LedgerError::TransportFailure(format!("malformed status response: {e}")))?;
        Ok(Some(body.status))
    }
}

/// Context for turning an error body back into a typed error.
struct ErrorContext<'a> {
    owner: &'a Principal,
    caller: Option<&'a Principal>,
}

/// Reads a success body as `T`. The outer error is a transport-level failure
/// (including error statuses); the inner one is a body that does not decode.
async fn read_body<T: DeserializeOwned>(
    resp: Response,
    ctx: Option<ErrorContext<'_>>,
) -> Result<Result<T, serde_json::Error>, LedgerError> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| LedgerError::TransportFailure(e.to_string()))?;

    if !status.is_success() {
        return Err(map_error(status, &bytes, ctx));
    }
    Ok(serde_json::from_slice(&bytes))
}

fn map_error(status: StatusCode, bytes: &[u8], ctx: Option<ErrorContext<'_>>) -> LedgerError {
    let Ok(body) = serde_json::from_slice::<ApiErrorBody>(bytes) else {
        return LedgerError::TransportFailure(format!("ledger returned {status}"));
    };

    match (body.error.as_str(), ctx) {
        ("unauthenticated", _) => LedgerError::Unauthenticated,
        ("unauthorized", Some(ErrorContext { owner, caller: Some(caller) })) => LedgerError::Unauthorized {
            caller: caller.clone(),
            owner: owner.clone(),
        },
        ("corrupted_log", Some(ErrorContext { owner, .. })) => LedgerError::corrupted(owner, body.message),
        ("cancelled", _) => LedgerError::Cancelled,
        ("rejected", _) => LedgerError::Rejected(body.message),
        ("outcome_unknown", _) => LedgerError::OutcomeUnknown(body.message),
        ("invalid_input", _) | ("kernel", _) if status == StatusCode::BAD_REQUEST => {
            LedgerError::InvalidInput(body.message)
        }
        _ => LedgerError::TransportFailure(format!("ledger returned {status}: {}", body.message)),
    }
}

fn spawn_poller(ledger: RemoteLedger, tx_id: TxId, resolver: AppendResolver) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ledger.poll_interval).await;
            if resolver.is_abandoned() {
                return;
            }
            match ledger.tx_status(&tx_id).await {
                Ok(Some(AppendStatus::Included { index, height })) => return resolver.include(index, height),
                Ok(Some(AppendStatus::Failed { reason })) => return resolver.fail(reason),
                Ok(Some(AppendStatus::Unknown { reason })) => return resolver.lose(reason),
                Ok(Some(AppendStatus::Pending)) => {}
                // Receipts are evicted and do not survive a restart; absence
                // says nothing about inclusion.
                Ok(None) => return resolver.lose(format!("transaction {tx_id} unknown to the ledger")),
                // Status reads are idempotent; keep polling through transient failures.
                Err(e) => tracing::warn!("Polling {} failed: {}", tx_id, e),
            }
        }
    });
}

impl LedgerStore for RemoteLedger {
    async fn count(&self, owner: &Principal) -> Result<u64, LedgerError> {
        let url = format!("{}/v1/logs/{}/count", self.base_url, owner);
        let resp = self.send(self.client.get(&url)).await?;
        let body: CountResponse = read_body(resp, Some(ErrorContext { owner, caller: None }))
            .await?
            .map_err(|e| LedgerError::corrupted(owner, format!("malformed count response: {e}")))?;

        if body.owner != owner.as_str() {
            return Err(LedgerError::corrupted(
                owner,
                format!("count returned for owner {:?}", body.owner),
            ));
        }
        Ok(body.count)
    }

    async fn get(&self, owner: &Principal, index: LogIndex) -> Result<Option<LedgerEntry>, LedgerError> {
        let url = format!("{}/v1/logs/{}/entries/{}", self.base_url, owner, index);
        let resp = self.send(self.client.get(&url)).await?;
        let body: EntryResponse = read_body(resp, Some(ErrorContext { owner, caller: None }))
            .await?
            .map_err(|e| LedgerError::corrupted(owner, format!("malformed entry {index}: {e}")))?;

        body.entry.map(|dto| dto.decode(owner, index)).transpose()
    }

    async fn submit_append(&self, request: AppendRequest) -> Result<PendingAppend, LedgerError> {
        request.authorize()?;

        let url = format!("{}/v1/logs/{}/append", self.base_url, request.owner);
        let body = AppendBody {
            prompt_digest: request.prompt_digest.to_hex(),
            response_digest: request.response_digest.to_hex(),
        };
        let req = self
            .client
            .post(&url)
            .header(SENDER_HEADER, request.caller.as_str())
            .json(&body);
        let resp = self.send(req).await?;

        let ctx = ErrorContext {
            owner: &request.owner,
            caller: Some(&request.caller),
        };
        let accepted: AppendAccepted = read_body(resp, Some(ctx))
            .await?
            .map_err(|e| LedgerError::TransportFailure(format!("malformed append response: {e}")))?;

        let (resolver, pending) = pending_append(accepted.tx_id);
        spawn_poller(self.clone(), accepted.tx_id, resolver);
        Ok(pending)
    }
}
