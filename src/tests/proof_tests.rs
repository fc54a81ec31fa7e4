// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::digest::digest;
use crate::ledger::LedgerState;
use crate::proof::{LedgerProof, OwnerLogProof};
use crate::types::id::BlockHeight;
use crate::types::principal::Principal;
use crate::verify::owner_log_hash;

fn seeded() -> (LedgerState, Principal, Principal) {
    let a = Principal::parse("wallet_1").unwrap();
    let b = Principal::parse("wallet_2").unwrap();
    let mut state = LedgerState::new();
    state.begin_block(BlockHeight(1)).unwrap();
    state.append(&a, &a, digest("hi"), digest("hello")).unwrap();
    state.append(&b, &b, digest("yo"), digest("hey")).unwrap();
    (state, a, b)
}

#[test]
fn test_owner_proof_unaffected_by_other_owner() {
    let (mut state, a, b) = seeded();
    let proof_a = OwnerLogProof::generate(&state, &a);

    state.begin_block(BlockHeight(2)).unwrap();
    state.append(&b, &b, digest("more"), digest("stuff")).unwrap();
    let proof_a_later = OwnerLogProof::generate(&state, &a);

    assert!(proof_a.matches(&proof_a_later));
    assert_ne!(proof_a.height, proof_a_later.height);
}

#[test]
fn test_owner_proof_detects_extra_entry() {
    let (mut state, a, _) = seeded();
    let before = OwnerLogProof::generate(&state, &a);

    state.append(&a, &a, digest("hi"), digest("hello")).unwrap();
    let after = OwnerLogProof::generate(&state, &a);

    assert!(!before.matches(&after));
    assert_eq!(after.entry_count, 2);
}

#[test]
fn test_log_hash_binds_owner() {
    let (state, a, b) = seeded();
    let records = state.records(&a);

    assert_ne!(owner_log_hash(&a, records), owner_log_hash(&b, records));
}

#[test]
fn test_ledger_proof_counts() {
    let (state, _, _) = seeded();
    let proof = LedgerProof::generate(&state);

    assert_eq!(proof.owner_count, 2);
    assert_eq!(proof.total_entries, 2);
    assert_eq!(proof.height, BlockHeight(1));
}
