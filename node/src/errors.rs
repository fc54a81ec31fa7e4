// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_kernel::{KernelError, Principal};
use thiserror::Error;

use crate::api::ApiErrorBody;
use crate::events::event_log::EventLogError;

/// Every failure a ledger operation can surface.
///
/// "No match" and "empty history" are never errors; anything here means the
/// check or submission could not be completed.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No owner identity is available to act as or scan against.
    #[error("no owner identity available")]
    Unauthenticated,

    #[error("{caller} may not append to the log of {owner}")]
    Unauthorized { caller: Principal, owner: Principal },

    /// The ledger could not be reached. Reads may be retried by the caller.
    #[error("ledger transport failure: {0}")]
    TransportFailure(String),

    /// Count and point reads disagree, or an entry does not decode.
    #[error("corrupted log for {owner}: {detail}")]
    CorruptedLog { owner: Principal, detail: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("append not confirmed within {0:?}")]
    ConfirmationTimeout(Duration),

    /// The submission was dropped before inclusion; no entry was created.
    #[error("append rejected: {0}")]
    Rejected(String),

    /// The host lost track of a submission. It may have been included, so
    /// check with `verify` before resubmitting.
    #[error("append outcome unknown: {0}")]
    OutcomeUnknown(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("kernel error: {0}")]
    Kernel(KernelError),
}

impl LedgerError {
    pub fn corrupted(owner: &Principal, detail: impl Into<String>) -> Self {
        LedgerError::CorruptedLog {
            owner: owner.clone(),
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code carried in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Unauthenticated => "unauthenticated",
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::TransportFailure(_) => "transport_failure",
            LedgerError::CorruptedLog { .. } => "corrupted_log",
            LedgerError::Cancelled => "cancelled",
            LedgerError::ConfirmationTimeout(_) => "confirmation_timeout",
            LedgerError::Rejected(_) => "rejected",
            LedgerError::OutcomeUnknown(_) => "outcome_unknown",
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::EventLog(_) => "event_log",
            LedgerError::Kernel(_) => "kernel",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LedgerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            LedgerError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            LedgerError::CorruptedLog { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::ConfirmationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LedgerError::Rejected(_) => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::OutcomeUnknown(_) => StatusCode::BAD_GATEWAY,
            LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LedgerError::EventLog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Kernel(k) => match k {
                KernelError::InvalidPrincipal | KernelError::InvalidDigest | KernelError::MalformedEntry => {
                    StatusCode::BAD_REQUEST
                }
                KernelError::Unauthorized => StatusCode::FORBIDDEN,
                KernelError::BlockOutOfOrder { .. } | KernelError::Codec => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(ApiErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<KernelError> for LedgerError {
    fn from(e: KernelError) -> Self {
        LedgerError::Kernel(e)
    }
}
