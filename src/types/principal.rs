// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Owner identity.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

pub const MAX_PRINCIPAL_LEN: usize = 128;

/// The identity under which log entries are indexed.
///
/// Validated on construction and on deserialization, so a `Principal` in hand
/// is always a usable log key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn parse(text: &str) -> KernelResult<Self> {
        if text.is_empty() || text.len() > MAX_PRINCIPAL_LEN {
            return Err(KernelError::InvalidPrincipal);
        }
        let valid = text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));
        if !valid {
            return Err(KernelError::InvalidPrincipal);
        }
        Ok(Principal(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for Principal {
    type Error = KernelError;

    fn try_from(value: String) -> KernelResult<Self> {
        Principal::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl FromStr for Principal {
    type Err = KernelError;

    fn from_str(s: &str) -> KernelResult<Self> {
        Principal::parse(s)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
