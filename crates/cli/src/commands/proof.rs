// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use parley_kernel::proof::LedgerProof;
use parley_kernel::replay::replay_events;
use parley_node::events::event_proof::compute_event_log_hash;
use parley_node::events::read_events;
use parley_node::events::EventProof;

/// Recomputes the ledger proof of an event log offline.
pub fn compute(path: &Path) -> anyhow::Result<EventProof> {
    let events = read_events(path)?;
    let state = replay_events(&events).map_err(|e| anyhow::anyhow!("replay failed: {}", e))?;
    let log_hash = compute_event_log_hash(path)?;
    Ok(EventProof::new(LedgerProof::generate(&state), log_hash, events.len() as u64))
}

pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let proof = compute(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&proof)?);
        return Ok(());
    }

    println!("\nLedger Proof\n");
    println!("Events:         {}", proof.event_count);
    println!("Height:         {}", proof.ledger.height);
    println!("Owners:         {}", proof.ledger.owner_count);
    println!("Entries:        {}", proof.ledger.total_entries);
    println!("State Root:     {}", hex::encode(proof.ledger.state_root));
    println!("Event Log Hash: {}\n", hex::encode(proof.event_log_hash));
    Ok(())
}
