// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod api;
pub mod pending;
pub mod store;
pub mod chain;
pub mod events;
pub mod network;
pub mod projector;
pub mod verifier;
pub mod session;
pub mod server;

pub use errors::LedgerError;
pub use pending::{AppendStatus, PendingAppend, TxId};
pub use store::{AppendRequest, CachedStore, LedgerStore};
