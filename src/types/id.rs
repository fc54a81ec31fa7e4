//! Identity types.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Position of an entry inside one owner's log.
///
/// Only meaningful together with the owner: index 0 of two owners are
/// unrelated entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LogIndex(pub u64);

impl LogIndex {
    pub fn next(&self) -> Self {
        LogIndex(self.0 + 1)
    }
}

impl fmt::Display for LogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Height of the block an append was included in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub fn next(&self) -> Self {
        BlockHeight(self.0 + 1)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
