// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event-Sourced Persistence Layer
//!
//! The local ledger host keeps its blocks in an append-only event log.
//!
//! # Guarantees
//! - A block's events are fsync'd before the block is applied
//! - Recovery replays the log through the kernel state machine
//! - A block is one frame: recovered whole or not at all
//! - A torn trailing block is dropped; corruption inside the log fails closed

pub mod event_log;
pub mod event_replay;
pub mod event_proof;

pub use event_log::{read_events, EventLogError, EventLogWriter};
pub use event_replay::{recover_from_event_log, Recovered};
pub use event_proof::EventProof;
