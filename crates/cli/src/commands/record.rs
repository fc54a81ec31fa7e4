// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use parley_kernel::LogIndex;
use tokio_util::sync::CancellationToken;

use super::NodeTarget;

/// Submits the exchange and waits for it to be included in a block.
pub async fn submit(target: &NodeTarget, prompt: &str, response: &str, timeout: Duration) -> anyhow::Result<LogIndex> {
    let session = target.session(timeout)?;
    let index = session
        .record_exchange(prompt, response, &CancellationToken::new())
        .await?;
    Ok(index)
}

pub async fn run(target: &NodeTarget, prompt: &str, response: &str, timeout: Duration) -> anyhow::Result<()> {
    let index = submit(target, prompt, response, timeout).await?;
    println!("\n✅ RECORDED\n");
    println!("Owner: {}", target.owner);
    println!("Index: {}\n", index);
    Ok(())
}
