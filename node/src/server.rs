// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! HTTP surface of the local ledger host.
//!
//! # Trust model
//! The host has no wallet signatures. An append's caller is whatever the
//! `x-ledger-sender` header claims, so the `caller == owner` rule only holds
//! between honest clients. The optional bearer token gates who may reach the
//! API at all; it is shared and does not bind a caller identity. Expose this
//! host to trusted clients only (development, tests, a private network).

use std::sync::Arc;

use axum::extract::{Path, Request as AxumRequest, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_kernel::proof::OwnerLogProof;
use parley_kernel::{Digest, LogIndex, Principal};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::chain::LocalLedger;
use crate::errors::LedgerError;
use crate::events::EventProof;
use crate::pending::TxId;
use crate::projector::LogProjector;
use crate::store::{AppendRequest, LedgerStore};
use crate::verifier::VerificationEngine;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LocalLedger>,
    pub scan_concurrency: usize,
}

impl AppState {
    pub fn new(ledger: Arc<LocalLedger>, scan_concurrency: usize) -> Self {
        Self {
            ledger,
            scan_concurrency,
        }
    }
}

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    if provided == Some(token.as_str()) {
        return Ok(next.run(req).await);
    }
    Err(StatusCode::UNAUTHORIZED)
}

pub fn build_router(state: AppState, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        // Ledger store v1
        .route("/v1/logs/:owner", get(history))
        .route("/v1/logs/:owner/count", get(count))
        .route("/v1/logs/:owner/entries/:index", get(entry))
        .route("/v1/logs/:owner/append", post(append))
        .route("/v1/tx/:tx_id", get(tx_status))
        .route("/v1/verify", post(verify))
        // Proofs v1
        .route("/v1/proof/state", get(state_proof))
        .route("/v1/proof/:owner", get(owner_proof))
        .route("/v1/chain/height", get(height))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn parse_owner(text: &str) -> Result<Principal, LedgerError> {
    Principal::parse(text).map_err(|_| LedgerError::InvalidInput(format!("invalid owner: {text:?}")))
}

fn parse_digest(field: &str, text: &str) -> Result<Digest, LedgerError> {
    Digest::from_hex(text).map_err(|_| LedgerError::InvalidInput(format!("{field} is not a 64-digit lowercase hex digest")))
}

async fn count(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<CountResponse>, LedgerError> {
    let owner = parse_owner(&owner)?;
    let count = state.ledger.count(&owner).await?;
    Ok(Json(CountResponse {
        owner: owner.to_string(),
        count,
    }))
}

async fn entry(
    State(state): State<AppState>,
    Path((owner, index)): Path<(String, u64)>,
) -> Result<Json<EntryResponse>, LedgerError> {
    let owner = parse_owner(&owner)?;
    let entry = state.ledger.get(&owner, LogIndex(index)).await?;
    Ok(Json(EntryResponse {
        entry: entry.as_ref().map(EntryDto::from),
    }))
}

async fn history(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<HistoryResponse>, LedgerError> {
    let owner = parse_owner(&owner)?;
    let projector = LogProjector::new(state.ledger.clone(), state.scan_concurrency);
    let projected = projector.project_all(&owner, &CancellationToken::new()).await?;

    let entries = projected
        .into_iter()
        .map(|p| EntryDto {
            owner: owner.to_string(),
            index: p.index.0,
            prompt_digest: p.prompt_hex,
            response_digest: p.response_hex,
            recorded_at: p.recorded_at.0,
        })
        .collect();

    Ok(Json(HistoryResponse {
        owner: owner.to_string(),
        entries,
    }))
}

async fn append(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AppendBody>,
) -> Result<(StatusCode, Json<AppendAccepted>), LedgerError> {
    let owner = parse_owner(&owner)?;
    let caller = headers
        .get(SENDER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(LedgerError::Unauthenticated)?;
    let caller = parse_owner(caller)?;

    let request = AppendRequest {
        caller,
        owner,
        prompt_digest: parse_digest("prompt_digest", &body.prompt_digest)?,
        response_digest: parse_digest("response_digest", &body.response_digest)?,
    };
    let pending = state.ledger.submit_append(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AppendAccepted {
            tx_id: pending.tx_id(),
        }),
    ))
}

async fn tx_status(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
) -> Result<Response, LedgerError> {
    let tx_id: TxId = tx_id.parse()?;
    match state.ledger.tx_status(&tx_id).await {
        Some(status) => Ok(Json(TxStatusResponse { tx_id, status }).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ApiErrorBody {
                error: "unknown_tx".to_string(),
                message: format!("no transaction {tx_id}"),
            }),
        )
            .into_response()),
    }
}

async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, LedgerError> {
    let owner = req.owner.as_deref().map(parse_owner).transpose()?;
    let engine = VerificationEngine::new(state.ledger.clone(), state.scan_concurrency);
    let found = engine
        .verify_detailed(owner.as_ref(), &req.prompt, &req.response, &CancellationToken::new())
        .await?;

    Ok(Json(VerifyResponse {
        recorded: found.is_some(),
        entry: found.as_ref().map(EntryDto::from),
    }))
}

async fn owner_proof(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<OwnerLogProof>, LedgerError> {
    let owner = parse_owner(&owner)?;
    Ok(Json(state.ledger.owner_proof(&owner).await))
}

async fn state_proof(State(state): State<AppState>) -> Result<Json<EventProof>, LedgerError> {
    Ok(Json(state.ledger.event_proof().await?))
}

async fn height(State(state): State<AppState>) -> Json<HeightResponse> {
    Json(HeightResponse {
        height: state.ledger.height().await.0,
    })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
