// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod digest;
pub mod history;
pub mod proof;
pub mod record;
pub mod verify;

use std::time::Duration;

use parley_kernel::Principal;
use parley_node::network::RemoteLedger;
use parley_node::session::{LocalWallet, Session, SessionConfig};

/// Where to reach the ledger and who to act as.
#[derive(Debug, Clone)]
pub struct NodeTarget {
    pub url: String,
    pub token: Option<String>,
    pub owner: String,
}

impl NodeTarget {
    pub fn session(&self, timeout: Duration) -> anyhow::Result<Session<LocalWallet, RemoteLedger>> {
        let owner = Principal::parse(&self.owner)
            .map_err(|e| anyhow::anyhow!("invalid owner {:?}: {}", self.owner, e))?;
        let ledger = RemoteLedger::new(self.url.clone()).with_auth_token(self.token.clone());
        let config = SessionConfig {
            confirmation_timeout: timeout,
            ..SessionConfig::default()
        };
        Ok(Session::new(LocalWallet::connected(owner), ledger, config))
    }
}
