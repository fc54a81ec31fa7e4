// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use parley_node::chain::LocalLedger;
use parley_node::config::NodeConfig;
use parley_node::server::{build_router, AppState};
use parley_node::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    init_telemetry();

    let cfg = match NodeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    tracing::info!(
        "Initializing Parley Node: block_interval={:?}, scan_concurrency={}, max_pending={}, auth={}",
        cfg.block_interval(),
        cfg.scan_concurrency,
        cfg.max_pending,
        cfg.auth_token.is_some()
    );

    let ledger = match &cfg.event_log_path {
        Some(path) => {
            tracing::info!("Opening event log at {:?}", path);
            match LocalLedger::open(path, cfg.max_pending) {
                Ok(ledger) => ledger,
                Err(e) => {
                    // Fail closed: never serve from a ledger that did not replay cleanly.
                    tracing::error!("Failed to recover ledger: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!("No event log configured; ledger is in-memory only");
            LocalLedger::new(cfg.max_pending)
        }
    };
    let ledger = Arc::new(ledger);

    let shutdown = CancellationToken::new();
    let producer = ledger.spawn_block_producer(cfg.block_interval(), shutdown.clone());

    let app = build_router(AppState::new(ledger.clone(), cfg.scan_concurrency), cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", addr);

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    let _ = producer.await;

    // Seal whatever is still pending so accepted appends are not lost.
    if let Err(e) = ledger.produce_block().await {
        tracing::error!("Final block failed: {}", e);
    }

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
