// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Durable event log. `None` keeps the ledger in memory only.
    pub event_log_path: Option<PathBuf>,
    pub block_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
    /// Max in-flight point reads per projection or verification scan.
    pub scan_concurrency: usize,
    /// Max submissions waiting for inclusion.
    pub max_pending: usize,
    pub auth_token: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            event_log_path: None,
            block_interval_ms: 1000,
            confirmation_timeout_secs: 60,
            scan_concurrency: 8,
            max_pending: 1024,
            auth_token: None,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `PARLEY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("PARLEY_BIND_ADDR") {
            cfg.bind_addr = parse_var("PARLEY_BIND_ADDR", v)?;
        }
        if let Some(v) = lookup("PARLEY_EVENT_LOG") {
            if !v.is_empty() {
                cfg.event_log_path = Some(PathBuf::from(v));
            }
        }
        if let Some(v) = lookup("PARLEY_BLOCK_INTERVAL_MS") {
            cfg.block_interval_ms = parse_nonzero("PARLEY_BLOCK_INTERVAL_MS", v)?;
        }
        if let Some(v) = lookup("PARLEY_CONFIRMATION_TIMEOUT_SECS") {
            cfg.confirmation_timeout_secs = parse_nonzero("PARLEY_CONFIRMATION_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("PARLEY_SCAN_CONCURRENCY") {
            cfg.scan_concurrency = parse_nonzero("PARLEY_SCAN_CONCURRENCY", v)? as usize;
        }
        if let Some(v) = lookup("PARLEY_MAX_PENDING") {
            cfg.max_pending = parse_nonzero("PARLEY_MAX_PENDING", v)? as usize;
        }
        if let Some(v) = lookup("PARLEY_AUTH_TOKEN") {
            if !v.is_empty() {
                cfg.auth_token = Some(v);
            }
        }

        Ok(cfg)
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}

fn parse_nonzero(var: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}
