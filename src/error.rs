//! Error types.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Principal is empty, too long, or contains characters outside `[A-Za-z0-9._-]`.
    InvalidPrincipal,
    /// Digest has the wrong length or is not canonical lowercase hex.
    InvalidDigest,
    /// Wire record does not have the fixed entry layout.
    MalformedEntry,
    /// Caller tried to append to a log it does not own.
    Unauthorized,
    /// A block was opened with a height that does not follow the current one.
    BlockOutOfOrder { expected: u64, found: u64 },
    /// Event (de)serialization failed.
    Codec,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidPrincipal => f.write_str("invalid principal"),
            KernelError::InvalidDigest => f.write_str("invalid digest"),
            KernelError::MalformedEntry => f.write_str("malformed ledger entry"),
            KernelError::Unauthorized => f.write_str("caller is not the log owner"),
            KernelError::BlockOutOfOrder { expected, found } => {
                write!(f, "block out of order: expected height {expected}, found {found}")
            }
            KernelError::Codec => f.write_str("event codec failure"),
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
