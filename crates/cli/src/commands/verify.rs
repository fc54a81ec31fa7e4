// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use parley_kernel::LedgerEntry;
use tokio_util::sync::CancellationToken;

use super::NodeTarget;

/// `Ok(None)` means the check completed and found nothing.
pub async fn check(target: &NodeTarget, prompt: &str, response: &str) -> anyhow::Result<Option<LedgerEntry>> {
    let session = target.session(Duration::from_secs(60))?;
    Ok(session
        .find_exchange(prompt, response, &CancellationToken::new())
        .await?)
}

/// Returns whether the exchange was recorded.
pub async fn run(target: &NodeTarget, prompt: &str, response: &str) -> anyhow::Result<bool> {
    match check(target, prompt, response).await? {
        Some(entry) => {
            println!("\n✅ VERIFIED\n");
            println!("Owner: {}", entry.owner);
            println!("Index: {}", entry.index);
            println!("Block: {}\n", entry.recorded_at);
            Ok(true)
        }
        None => {
            println!("\n❌ NOT RECORDED\n");
            println!("No entry in the log of {} matches this exchange.\n", target.owner);
            Ok(false)
        }
    }
}
