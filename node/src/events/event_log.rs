// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log Writer
//!
//! This is the CANONICAL durability layer for a local ledger host.
//! - Blocks are written to disk BEFORE memory application
//! - Every block is fsync'd for crash safety
//! - Committed frames are never rewritten
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: b"PRLY"
//! - version: u32 (2)
//! - reserved: u64 (0)
//!
//! Frame (one per block):
//! - len: u32 LE (payload length)
//! - crc32: u32 LE (of payload)
//! - payload: bincode `Vec<LedgerEvent>`, a `BeginBlock` then its appends
//!
//! A block is recovered whole or not at all.

use parley_kernel::event::{decode_block, encode_block};
use parley_kernel::LedgerEvent;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HEADER_LEN: usize = 16;
pub const FRAME_HEADER_LEN: usize = 8;
const MAGIC: [u8; 4] = *b"PRLY";
const VERSION: u32 = 2;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid header")]
    InvalidHeader,

    #[error("Checksum mismatch in frame at offset {offset}")]
    ChecksumMismatch { offset: usize },

    /// A failed write could not be rolled back; the file tail is unknown.
    #[error("Event log is poisoned after a failed rollback")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, EventLogError>;

struct EventLogHeader {
    version: u32,
    reserved: u64,
}

impl EventLogHeader {
    fn new() -> Self {
        Self {
            version: VERSION,
            reserved: 0,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || bytes[0..4] != MAGIC {
            return Err(EventLogError::InvalidHeader);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[8..16]);

        let header = Self {
            version: u32::from_le_bytes(version),
            reserved: u64::from_le_bytes(reserved),
        };
        if header.version != VERSION {
            return Err(EventLogError::InvalidHeader);
        }
        Ok(header)
    }
}

/// Result of scanning a log image.
struct Scan {
    events: Vec<LedgerEvent>,
    /// Bytes covered by the header and every complete block frame.
    valid_len: usize,
}

/// Walks the block frames after the header. An incomplete trailing frame ends
/// the scan; a complete frame that fails its checksum or does not decode is an error.
fn scan(bytes: &[u8]) -> Result<Scan> {
    EventLogHeader::parse(bytes)?;

    let mut events = Vec::new();
    let mut offset = HEADER_LEN;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < FRAME_HEADER_LEN {
            break;
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&rest[0..4]);
        let len = u32::from_le_bytes(word) as usize;
        word.copy_from_slice(&rest[4..8]);
        let crc = u32::from_le_bytes(word);

        let Some(payload) = rest.get(FRAME_HEADER_LEN..FRAME_HEADER_LEN + len) else {
            break;
        };
        if crc32fast::hash(payload) != crc {
            return Err(EventLogError::ChecksumMismatch { offset });
        }
        let block = decode_block(payload).map_err(|e| EventLogError::Serialization(e.to_string()))?;
        events.extend(block);
        offset += FRAME_HEADER_LEN + len;
    }

    Ok(Scan {
        events,
        valid_len: offset,
    })
}

fn encode_frame(block: &[LedgerEvent]) -> Result<Vec<u8>> {
    let payload = encode_block(block).map_err(|e| EventLogError::Serialization(e.to_string()))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Reads every committed event from `path`, in commit order.
///
/// A torn trailing block is ignored here; the writer truncates it on open.
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<LedgerEvent>> {
    let mut bytes = Vec::new();
    File::open(path.as_ref())?.read_to_end(&mut bytes)?;
    Ok(scan(&bytes)?.events)
}

fn truncate_to(file: &mut File, len: u64) -> std::io::Result<()> {
    file.set_len(len)?;
    file.seek(SeekFrom::Start(len))?;
    file.sync_all()
}

/// Append-Only Event Log Writer
///
/// # Safety Guarantees
/// - Write + fsync before returning
/// - A block is a single frame; a crash mid-write leaves at most a torn tail
/// - A failed write is truncated away before the error is returned
pub struct EventLogWriter {
    path: PathBuf,
    file: File,
    /// Length of the file up to the last durable block.
    committed_len: u64,
    event_count: u64,
    poisoned: bool,
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl EventLogWriter {
    /// Open or create an event log file.
    ///
    /// An existing file has its header validated and its events counted.
    /// A torn trailing block (crash during the last write) is truncated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let mut existing = Vec::new();
        file.read_to_end(&mut existing)?;

        let (committed_len, event_count) = if existing.is_empty() {
            file.write_all(&EventLogHeader::new().to_bytes())?;
            file.sync_all()?; // fsync header
            (HEADER_LEN as u64, 0)
        } else {
            let scan = scan(&existing)?;
            if scan.valid_len < existing.len() {
                tracing::warn!(
                    "Event log {:?} has a torn tail: dropping {} trailing bytes",
                    path,
                    existing.len() - scan.valid_len
                );
                truncate_to(&mut file, scan.valid_len as u64)?;
            }
            (scan.valid_len as u64, scan.events.len() as u64)
        };

        file.seek(SeekFrom::Start(committed_len))?;

        Ok(Self {
            path,
            file,
            committed_len,
            event_count,
            poisoned: false,
            #[cfg(test)]
            fail_after: None,
        })
    }

    /// Append one block (`BeginBlock` plus its appends) to the log.
    ///
    /// Only returns Ok() after a durable write. On error the file is restored
    /// to its previous length, or the writer is poisoned if that fails too.
    pub fn append_batch(&mut self, events: &[LedgerEvent]) -> Result<()> {
        if self.poisoned {
            return Err(EventLogError::Poisoned);
        }
        let frame = encode_frame(events)?;

        if let Err(e) = self.write_durable(&frame) {
            if let Err(rollback) = truncate_to(&mut self.file, self.committed_len) {
                tracing::error!(
                    "Event log {:?}: rollback to {} bytes failed: {}",
                    self.path,
                    self.committed_len,
                    rollback
                );
                self.poisoned = true;
            }
            return Err(e);
        }

        self.committed_len += frame.len() as u64;
        self.event_count += events.len() as u64;
        Ok(())
    }

    fn write_durable(&mut self, frame: &[u8]) -> Result<()> {
        #[cfg(test)]
        if let Some(limit) = self.fail_after.take() {
            self.file.write_all(&frame[..limit.min(frame.len())])?;
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "injected write failure").into());
        }

        self.file.write_all(frame)?;
        // Force fsync (critical for crash safety)
        self.file.sync_all()?;
        Ok(())
    }

    /// Makes the next write stop after `bytes` bytes and fail.
    #[cfg(test)]
    pub(crate) fn fail_next_write_after(&mut self, bytes: usize) {
        self.fail_after = Some(bytes);
    }

    /// Get the number of events written
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_kernel::{digest, BlockHeight, Principal};
    use tempfile::tempdir;

    fn block(height: u64, sender: &str, n: usize) -> Vec<LedgerEvent> {
        let sender = Principal::parse(sender).unwrap();
        let mut events = vec![LedgerEvent::BeginBlock {
            height: BlockHeight(height),
        }];
        for i in 0..n {
            events.push(LedgerEvent::LogInteraction {
                sender: sender.clone(),
                prompt_digest: digest(&format!("prompt {i}")),
                response_digest: digest(&format!("response {i}")),
            });
        }
        events
    }

    #[test]
    fn test_event_log_create_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut writer = EventLogWriter::open(&path).unwrap();
        writer.append_batch(&block(1, "alice", 2)).unwrap();

        assert_eq!(writer.event_count(), 3);
        assert_eq!(read_events(&path).unwrap(), block(1, "alice", 2));
    }

    #[test]
    fn test_event_log_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let mut writer = EventLogWriter::open(&path).unwrap();
            for h in 1..=5 {
                writer.append_batch(&block(h, "alice", 1)).unwrap();
            }
        }

        let mut writer = EventLogWriter::open(&path).unwrap();
        assert_eq!(writer.event_count(), 10);

        writer.append_batch(&block(6, "bob", 1)).unwrap();
        assert_eq!(read_events(&path).unwrap().len(), 12);
    }

    #[test]
    fn test_torn_tail_is_truncated_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let mut writer = EventLogWriter::open(&path).unwrap();
            writer.append_batch(&block(1, "alice", 1)).unwrap();
        }
        let clean_len = std::fs::metadata(&path).unwrap().len();

        // Half-written frame header plus a few payload bytes.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[40, 0, 0, 0, 1, 2, 3, 4, 9, 9]).unwrap();
        drop(file);

        assert_eq!(read_events(&path).unwrap().len(), 2);

        let writer = EventLogWriter::open(&path).unwrap();
        assert_eq!(writer.event_count(), 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);
    }

    #[test]
    fn test_partially_written_block_is_dropped_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let mut writer = EventLogWriter::open(&path).unwrap();
            writer.append_batch(&block(1, "alice", 1)).unwrap();
        }
        let clean_len = std::fs::metadata(&path).unwrap().len();

        // Crash part way through block 2: its BeginBlock and first appends
        // reached the disk, the rest did not.
        let frame = encode_frame(&block(2, "alice", 3)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&frame[..frame.len() - 5]).unwrap();
        drop(file);

        assert_eq!(read_events(&path).unwrap(), block(1, "alice", 1));

        let writer = EventLogWriter::open(&path).unwrap();
        assert_eq!(writer.event_count(), 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);
    }

    #[test]
    fn test_failed_write_is_rolled_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut writer = EventLogWriter::open(&path).unwrap();
        writer.append_batch(&block(1, "alice", 1)).unwrap();
        let clean_len = std::fs::metadata(&path).unwrap().len();

        // The device gives out after one complete frame header plus some payload.
        writer.fail_next_write_after(FRAME_HEADER_LEN + 4);
        assert!(writer.append_batch(&block(2, "alice", 2)).is_err());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);
        assert_eq!(writer.event_count(), 2);

        // The same height is written again once the disk recovers.
        writer.append_batch(&block(2, "bob", 1)).unwrap();
        drop(writer);

        let mut expected = block(1, "alice", 1);
        expected.extend(block(2, "bob", 1));
        assert_eq!(read_events(&path).unwrap(), expected);
        assert_eq!(EventLogWriter::open(&path).unwrap().event_count(), 4);
    }

    #[test]
    fn test_malformed_block_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut writer = EventLogWriter::open(&path).unwrap();
        let headless = block(1, "alice", 2).split_off(1);
        assert!(matches!(
            writer.append_batch(&headless),
            Err(EventLogError::Serialization(_))
        ));
        assert_eq!(writer.event_count(), 0);
    }

    #[test]
    fn test_checksum_mismatch_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let mut writer = EventLogWriter::open(&path).unwrap();
            writer.append_batch(&block(1, "alice", 2)).unwrap();
        }

        let mut bytes = std::fs::read(&path).unwrap();
        // Flip a byte inside the first frame's payload.
        bytes[HEADER_LEN + FRAME_HEADER_LEN] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            read_events(&path),
            Err(EventLogError::ChecksumMismatch { offset: HEADER_LEN })
        ));
        assert!(EventLogWriter::open(&path).is_err());
    }

    #[test]
    fn test_foreign_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        std::fs::write(&path, b"definitely not an event log").unwrap();

        assert!(matches!(EventLogWriter::open(&path), Err(EventLogError::InvalidHeader)));
    }
}
