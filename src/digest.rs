// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Digest Codec
//!
//! Canonicalizes message text into a fixed 32-byte content digest and moves
//! digests between their binary and textual wire forms.
//!
//! # Guarantees
//! - SHA-256 over the UTF-8 bytes, nothing else (no trimming, no normalization)
//! - Same message => same digest, on every architecture
//! - Hex form is lowercase, unseparated, exactly 64 characters

use alloc::string::String;
use core::fmt;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{KernelError, KernelResult};

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of the canonical hex rendering.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Content digest of a single message.
///
/// Opaque and comparable. It is never decoded back into text.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Digest of `message`'s UTF-8 bytes.
    pub fn of(message: &str) -> Self {
        Self::of_bytes(message.as_bytes())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Digest(hasher.finalize().into())
    }

    pub const fn from_wire(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    /// Length-checked construction from an arbitrary buffer.
    pub fn from_slice(bytes: &[u8]) -> KernelResult<Self> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| KernelError::InvalidDigest)?;
        Ok(Digest(arr))
    }

    pub const fn to_wire(&self) -> [u8; DIGEST_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Strict inverse of [`Digest::to_hex`].
    ///
    /// An optional `0x` prefix is tolerated because the host ledger renders
    /// buffers that way. Uppercase digits, separators and any other length
    /// are rejected.
    pub fn from_hex(text: &str) -> KernelResult<Self> {
        let body = text.strip_prefix("0x").unwrap_or(text);
        if body.len() != DIGEST_HEX_LEN {
            return Err(KernelError::InvalidDigest);
        }
        if !body.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(KernelError::InvalidDigest);
        }
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(body, &mut out).map_err(|_| KernelError::InvalidDigest)?;
        Ok(Digest(out))
    }
}

/// Digest of a message. Shorthand for [`Digest::of`].
pub fn digest(message: &str) -> Digest {
    Digest::of(message)
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }
}

impl From<Digest> for [u8; DIGEST_LEN] {
    fn from(d: Digest) -> Self {
        d.0
    }
}
