// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::digest::{digest, Digest, DIGEST_HEX_LEN};
use crate::error::KernelError;

#[test]
fn test_known_sha256_vectors() {
    assert_eq!(
        digest("").to_hex(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        digest("abc").to_hex(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_digest_is_deterministic() {
    let samples = ["hi", "hello", "What's the weather?", "I can't check weather", "héllo wörld", ""];
    for s in samples {
        assert_eq!(digest(s), digest(s));
    }
}

#[test]
fn test_distinct_samples_distinct_digests() {
    let samples = [
        "hi",
        "hello",
        "different",
        "hi ",
        "Hi",
        "Help me code",
        "Sure! What language?",
    ];
    for (i, a) in samples.iter().enumerate() {
        for b in samples.iter().skip(i + 1) {
            assert_ne!(digest(a), digest(b), "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn test_hex_form_is_canonical() {
    let d = digest("hi");
    let hex = d.to_hex();

    assert_eq!(hex.len(), DIGEST_HEX_LEN);
    assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    assert_eq!(Digest::from_hex(&hex).unwrap(), d);
    assert_eq!(Digest::from_wire(d.to_wire()), d);
}

#[test]
fn test_from_hex_accepts_ledger_prefix() {
    let d = digest("hello");
    let prefixed = format!("0x{}", d.to_hex());

    assert_eq!(Digest::from_hex(&prefixed).unwrap(), d);
}

#[test]
fn test_from_hex_rejects_non_canonical() {
    let hex = digest("hello").to_hex();

    assert_eq!(Digest::from_hex(&hex.to_uppercase()), Err(KernelError::InvalidDigest));
    assert_eq!(Digest::from_hex(&hex[..62]), Err(KernelError::InvalidDigest));
    assert_eq!(Digest::from_hex(&format!("{hex}00")), Err(KernelError::InvalidDigest));
    assert_eq!(Digest::from_hex(&hex.replace('a', "g")), Err(KernelError::InvalidDigest));
    assert_eq!(Digest::from_hex(""), Err(KernelError::InvalidDigest));
}

#[test]
fn test_from_slice_length_checked() {
    assert!(Digest::from_slice(&[0u8; 32]).is_ok());
    assert_eq!(Digest::from_slice(&[0u8; 31]), Err(KernelError::InvalidDigest));
    assert_eq!(Digest::from_slice(&[0u8; 33]), Err(KernelError::InvalidDigest));
}
