// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Log as Primary Truth
//!
//! Every ledger state transition is expressed as a `LedgerEvent`. A ledger
//! host persists events before applying them, and any replica can rebuild
//! the exact same state by replaying them in order.
//!
//! # Determinism Guarantees
//! - No wall-clock timestamps (heights come from `BeginBlock`)
//! - No randomness
//! - Index assignment is derived, never carried in the event
//!
//! # Invariants
//! - Same event sequence => same ledger state and same state root
//! - Events are immutable once committed

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::{KernelError, KernelResult};
use crate::types::id::BlockHeight;
use crate::types::principal::Principal;

/// The canonical event language of the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Open a new block. Appends that follow are recorded at `height`.
    BeginBlock { height: BlockHeight },

    /// Append one prompt/response pair to the sender's own log.
    LogInteraction {
        sender: Principal,
        prompt_digest: Digest,
        response_digest: Digest,
    },
}

pub fn encode_event(event: &LedgerEvent) -> KernelResult<Vec<u8>> {
    bincode::serde::encode_to_vec(event, bincode::config::standard()).map_err(|_| KernelError::Codec)
}

/// Decodes exactly one event; trailing bytes are an error.
pub fn decode_event(bytes: &[u8]) -> KernelResult<LedgerEvent> {
    let (event, read): (LedgerEvent, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(|_| KernelError::Codec)?;
    if read != bytes.len() {
        return Err(KernelError::Codec);
    }
    Ok(event)
}

/// Encodes one whole block: a `BeginBlock` followed by its appends.
///
/// A block is the unit of durability; hosts persist it as a single record so
/// it is either recovered whole or not at all.
pub fn encode_block(events: &[LedgerEvent]) -> KernelResult<Vec<u8>> {
    check_block_shape(events)?;
    bincode::serde::encode_to_vec(events, bincode::config::standard()).map_err(|_| KernelError::Codec)
}

/// Decodes exactly one block; trailing bytes or a malformed block are an error.
pub fn decode_block(bytes: &[u8]) -> KernelResult<Vec<LedgerEvent>> {
    let (events, read): (Vec<LedgerEvent>, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(|_| KernelError::Codec)?;
    if read != bytes.len() {
        return Err(KernelError::Codec);
    }
    check_block_shape(&events)?;
    Ok(events)
}

fn check_block_shape(events: &[LedgerEvent]) -> KernelResult<()> {
    match events.split_first() {
        Some((LedgerEvent::BeginBlock { .. }, rest))
            if rest.iter().all(|e| matches!(e, LedgerEvent::LogInteraction { .. })) =>
        {
            Ok(())
        }
        _ => Err(KernelError::Codec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_determinism() {
        let event = LedgerEvent::LogInteraction {
            sender: Principal::parse("ST1WALLET").unwrap(),
            prompt_digest: Digest::of("hi"),
            response_digest: Digest::of("hello"),
        };

        let bytes1 = encode_event(&event).unwrap();
        let bytes2 = encode_event(&event).unwrap();

        assert_eq!(bytes1, bytes2, "Event serialization must be deterministic");
        assert_eq!(decode_event(&bytes1).unwrap(), event);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_event(&LedgerEvent::BeginBlock { height: BlockHeight(4) }).unwrap();
        bytes.push(0);

        assert_eq!(decode_event(&bytes), Err(KernelError::Codec));
    }

    #[test]
    fn test_block_codec_requires_leading_begin_block() {
        let interaction = LedgerEvent::LogInteraction {
            sender: Principal::parse("ST1WALLET").unwrap(),
            prompt_digest: Digest::of("hi"),
            response_digest: Digest::of("hello"),
        };
        let block = vec![LedgerEvent::BeginBlock { height: BlockHeight(2) }, interaction.clone()];

        let bytes = encode_block(&block).unwrap();
        assert_eq!(decode_block(&bytes).unwrap(), block);

        assert_eq!(encode_block(&[]), Err(KernelError::Codec));
        assert_eq!(encode_block(&[interaction.clone()]), Err(KernelError::Codec));
        assert_eq!(
            encode_block(&[block[0].clone(), block[0].clone()]),
            Err(KernelError::Codec)
        );

        // A block body that is not a block: a lone interaction encoded as a list.
        let headless = bincode::serde::encode_to_vec(vec![interaction], bincode::config::standard()).unwrap();
        assert_eq!(decode_block(&headless), Err(KernelError::Codec));
    }
}
