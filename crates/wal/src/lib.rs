//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the SiltKV storage engine.
//!
//! Every mutation (`PUT` or `DELETE`) is serialized into a binary record and
//! appended to the WAL **before** the corresponding in-memory update. On
//! restart the WAL is replayed to reconstruct the memtable, guaranteeing that
//! no acknowledged write is lost.
//!
//! ## Binary Record Format
//!
//! ```text
//! [payload_len: u32 LE][crc32: u32 LE][payload ...]
//! ```
//!
//! Payload: `[op: u8][key_len: u32][key][val_len: u32][value]` where `op` is
//! `1` (put) or `2` (delete, empty value). The CRC32 (IEEE) covers the
//! payload only; `payload_len` does not include the 8-byte header.
//!
//! ## Replay contract
//!
//! A record that passes its CRC is a complete record. Anything else at the
//! tail — a short header, a short payload, a CRC mismatch, an absurd length
//! claim, a payload that does not decode — marks the end of the log: those
//! bytes belong to a write that was never acknowledged, so replay stops
//! there and keeps the valid prefix. Stopping is not an error.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader, WalRecord};
//!
//! let mut w = WalWriter::create("wal", true).unwrap();
//! w.append(&WalRecord::Put {
//!     key: b"hello".to_vec(),
//!     value: b"world".to_vec(),
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("wal").unwrap();
//! r.replay(|rec| println!("{:?}", rec)).unwrap();
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use thiserror::Error;

/// Op byte for a put record.
const OP_PUT: u8 = 1;
/// Op byte for a delete record.
const OP_DELETE: u8 = 2;

/// Sanity bound on a single record's payload during replay. A length claim
/// beyond this is treated as a corrupt tail.
const MAX_PAYLOAD_BYTES: u32 = 64 * 1024 * 1024;

/// A single WAL record representing either a key-value insertion or a
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// A key-value insertion.
    Put {
        /// The lookup key.
        key: Vec<u8>,
        /// The payload value.
        value: Vec<u8>,
    },
    /// A key deletion (tombstone). Serialized with an empty value.
    Del {
        /// The key to delete.
        key: Vec<u8>,
    },
}

/// Errors that can occur during WAL operations.
///
/// Corruption during replay is deliberately not represented here: a corrupt
/// tail terminates replay with `Ok`, because it stands for a write that was
/// never acknowledged.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Append-only WAL writer.
///
/// Records are serialized into an in-memory buffer, CRC-checksummed, and then
/// written to the underlying file in a single `write_all` call. When `sync` is
/// `true`, every append is followed by `sync_all()` (fsync) to guarantee the
/// record is durable on disk before the call returns.
pub struct WalWriter {
    file: File,
    sync: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    ///
    /// # Arguments
    ///
    /// * `path` - file system path for the WAL (created if it does not exist).
    /// * `sync` - if true, every `append` call is followed by `fsync`.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends it to the WAL file.
    ///
    /// Layout: `[payload_len: u32 LE][crc32: u32 LE][payload bytes...]`.
    /// Returns only after the bytes are durable when sync mode is on.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        // Reuse the internal buffer — clear but keep the allocation.
        self.buf.clear();

        // Reserve 8 bytes for the frame header (payload_len + crc), filled
        // in once the payload is known.
        self.buf.extend_from_slice(&[0u8; 8]);

        match record {
            WalRecord::Put { key, value } => {
                self.buf.write_u8(OP_PUT)?;
                self.buf.write_u32::<LittleEndian>(key.len() as u32)?;
                self.buf.extend_from_slice(key);
                self.buf.write_u32::<LittleEndian>(value.len() as u32)?;
                self.buf.extend_from_slice(value);
            }
            WalRecord::Del { key } => {
                self.buf.write_u8(OP_DELETE)?;
                self.buf.write_u32::<LittleEndian>(key.len() as u32)?;
                self.buf.extend_from_slice(key);
                self.buf.write_u32::<LittleEndian>(0)?;
            }
        }

        let payload = &self.buf[8..];

        let mut hasher = Crc32::new();
        hasher.update(payload);
        let crc = hasher.finalize();

        let payload_len = payload.len() as u64;
        if payload_len > u32::MAX as u64 {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAL record too large (exceeds u32::MAX bytes)",
            )));
        }

        let header = (payload_len as u32).to_le_bytes();
        let crc_bytes = crc.to_le_bytes();
        self.buf[0..4].copy_from_slice(&header);
        self.buf[4..8].copy_from_slice(&crc_bytes);

        // Single write call for the entire frame.
        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Forces all buffered data to be written to disk via `sync_all()`.
    ///
    /// Useful when `sync` is `false` (batched mode) and the caller wants to
    /// ensure durability at a specific point.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Current size of the WAL file in bytes. Best-effort: 0 on stat failure.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }
}

/// Sequential WAL reader that yields valid records.
///
/// The reader is generic over any `Read` implementor, allowing it to be used
/// with real files (`WalReader<File>`) or in-memory buffers for testing.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    ///
    /// Returns `WalError::Io` if the file cannot be opened; a missing file
    /// is the caller's cue to start from an empty log.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    /// Constructs a reader from any `Read` implementor.
    ///
    /// Useful for unit tests that supply an in-memory buffer (e.g.,
    /// `Cursor<Vec<u8>>`).
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every valid record in the WAL, calling `apply` for each one.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** -> `Ok(())`.
    /// - **Corrupt or truncated tail** (short header/payload, CRC mismatch,
    ///   oversized length claim, undecodable payload) -> `Ok(())` after
    ///   yielding the complete records before it.
    /// - **I/O error** other than EOF -> `Err(WalError::Io(...))`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(WalRecord),
    {
        // Reusable buffer to avoid allocation per record.
        let mut payload = Vec::with_capacity(256);

        loop {
            let payload_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            if payload_len > MAX_PAYLOAD_BYTES {
                return Ok(());
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            payload.clear();
            payload.resize(payload_len as usize, 0);
            match self.rdr.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            }

            // Verify the checksum only after the full payload is in hand.
            let mut hasher = Crc32::new();
            hasher.update(&payload);
            if hasher.finalize() != crc {
                return Ok(());
            }

            match decode_payload(&payload) {
                Some(record) => apply(record),
                None => return Ok(()),
            }
        }
    }
}

/// Parses `[op][key_len][key][val_len][value]` out of a checksummed payload.
///
/// Returns `None` on any structural violation; the caller treats that as the
/// end of the log.
fn decode_payload(payload: &[u8]) -> Option<WalRecord> {
    // 1 op + 4 key_len + 4 val_len is the minimum possible record.
    if payload.len() < 9 {
        return None;
    }
    let op = payload[0];
    let key_len = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]) as usize;

    let val_len_off = 5usize.checked_add(key_len)?;
    if payload.len() < val_len_off + 4 {
        return None;
    }
    let key = payload[5..val_len_off].to_vec();

    let val_len = u32::from_le_bytes([
        payload[val_len_off],
        payload[val_len_off + 1],
        payload[val_len_off + 2],
        payload[val_len_off + 3],
    ]) as usize;
    let val_off = val_len_off + 4;
    if payload.len() < val_off + val_len {
        return None;
    }

    match op {
        OP_PUT => Some(WalRecord::Put {
            key,
            value: payload[val_off..val_off + val_len].to_vec(),
        }),
        OP_DELETE => Some(WalRecord::Del { key }),
        _ => None,
    }
}
