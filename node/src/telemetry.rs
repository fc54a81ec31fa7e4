// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Initialize Tracing (Logs)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "parley_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Initialize Metrics (Prometheus)
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("Metrics disabled: failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!("parley_appends_submitted_total", "Appends accepted into the mempool");
    metrics::describe_counter!("parley_appends_included_total", "Appends included in a block");
    metrics::describe_counter!("parley_appends_failed_total", "Appends that failed after submission");
    metrics::describe_counter!("parley_blocks_produced_total", "Blocks sealed by the local ledger");
    metrics::describe_gauge!("parley_chain_height", "Current block height");
    metrics::describe_counter!("parley_verifications_total", "Completed verification scans");
    metrics::describe_histogram!("parley_verification_duration_seconds", "Time taken by a verification scan");
    metrics::describe_counter!("parley_corrupted_log_total", "Scans aborted on a count/read mismatch");
    metrics::describe_counter!("parley_owner_hint_mismatch_total", "Stored owner hints that disagreed with the live owner");

    metrics::gauge!("parley_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
