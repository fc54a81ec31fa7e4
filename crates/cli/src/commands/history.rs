// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use parley_node::projector::ProjectedEntry;
use tokio_util::sync::CancellationToken;

use super::NodeTarget;

pub async fn fetch(target: &NodeTarget) -> anyhow::Result<Vec<ProjectedEntry>> {
    let session = target.session(Duration::from_secs(60))?;
    Ok(session.history(&CancellationToken::new()).await?)
}

pub fn render(entries: &[ProjectedEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Index", "Block", "Prompt Digest", "Response Digest"]);

    for entry in entries {
        table.add_row(vec![
            entry.index.to_string(),
            entry.recorded_at.to_string(),
            entry.prompt_hex.clone(),
            entry.response_hex.clone(),
        ]);
    }
    table
}

pub async fn run(target: &NodeTarget) -> anyhow::Result<()> {
    let entries = fetch(target).await?;
    if entries.is_empty() {
        println!("\nNo exchanges recorded for {}\n", target.owner);
        return Ok(());
    }

    println!("\nConversation History: {}\n", target.owner);
    println!("{}\n", render(&entries));
    Ok(())
}
