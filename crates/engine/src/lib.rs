//! # Engine - SiltKV Storage Engine
//!
//! The central orchestrator that ties together the [`memtable`], [`wal`], and
//! [`sstable`] crates into a complete LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → Memtable insert       │
//! │              |                                │
//! │              |  (memtable full?)              │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → new level-0 SSTable       │
//! │              |                                │
//! │              |  (level-0 count >= trigger?)   │
//! │              |            yes                 │
//! │              v                                │
//! │      maybe_compact() → single level-1 SST     │
//! │                                               │
//! │ read.rs → Memtable → SSTables newest-first    │
//! │            (first match wins)                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                              |
//! |----------------|------------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, open, accessors, stats, close, Drop |
//! | [`recovery`]   | WAL replay, SSTable directory scan, tmp file cleanup |
//! | [`write`]      | `put()`, `delete()`, `force_flush()`, internal flush |
//! | [`read`]       | `get()`                                              |
//! | [`compaction`] | `compact()` and the level-0 trigger                  |
//!
//! ## On-disk layout
//!
//! ```text
//! {dir}/wal               current write-ahead log
//! {dir}/0-000007.sst      level-0 table, sequence 7 (from a flush)
//! {dir}/1-000012.sst      level-1 table, sequence 12 (from compaction)
//! ```
//!
//! Sequence numbers are shared across both levels and only ever grow, so
//! sorting files by descending sequence gives newest-first read order.
//!
//! ## Crash Safety
//!
//! Every write is appended to the WAL (and fsynced) **before** the memtable
//! update. SSTables are written to a temp file, fsynced, and renamed into
//! place; the WAL is truncated only **after** the flushed table is open and
//! registered. A crash at any point either replays the intact WAL or finds
//! the completed table under its final name.

mod compaction;
mod read;
mod recovery;
mod write;

use anyhow::Result;
use log::error;
use memtable::Memtable;
use sstable::TableReader;
use std::path::{Path, PathBuf};
use wal::WalWriter;

/// Maximum allowed key size in bytes (64 KiB).
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// Maximum allowed value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// Default memtable flush threshold (approximate bytes).
pub const DEFAULT_FLUSH_THRESHOLD: usize = memtable::DEFAULT_FLUSH_THRESHOLD;

/// Default number of level-0 SSTables that triggers compaction.
///
/// When the level-0 count reaches this threshold after a flush, the engine
/// merges **all** tables (both levels) into a single level-1 table. Set to
/// `0` to disable auto-compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 4;

/// WAL filename inside the storage directory.
const WAL_FILENAME: &str = "wal";

/// Diagnostic counters, cheap to gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Open SSTables across both levels.
    pub num_sstables: usize,
    /// Approximate memtable size in bytes.
    pub memtable_size_bytes: usize,
    /// Memtable entry count, tombstones included.
    pub memtable_count: usize,
    /// Current WAL file size in bytes.
    pub wal_size_bytes: u64,
}

/// The central storage engine orchestrating memtable, WAL, and SSTables.
///
/// # Write Path
///
/// 1. Append the record to the WAL (crash-safe durability).
/// 2. Apply the mutation to the in-memory memtable.
/// 3. If the memtable is full, flush it to a new level-0 SSTable, truncate
///    the WAL, and possibly compact.
///
/// # Read Path
///
/// 1. Check the memtable (freshest data, includes tombstones).
/// 2. Check SSTables from newest to oldest.
/// 3. First match wins; tombstones shadow older values.
///
/// # Concurrency
///
/// None. The engine is single-threaded and not safe for concurrent use;
/// callers that need concurrency must serialize externally.
pub struct Engine {
    /// Storage directory holding the WAL and all SSTables.
    pub(crate) dir: PathBuf,
    pub(crate) mem: Memtable,
    /// Open SSTables ordered newest first. The flush path prepends, the
    /// compaction path rebuilds from disk.
    pub(crate) sstables: Vec<TableReader>,
    pub(crate) wal: WalWriter,
    /// Next SSTable sequence number: one past the largest ever observed.
    pub(crate) next_seq: u64,
    pub(crate) flush_threshold: usize,
    /// Level-0 count that triggers compaction; 0 disables it.
    pub(crate) compaction_threshold: usize,
    /// If `true`, every WAL append is followed by `fsync`.
    pub(crate) wal_sync: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("next_seq", &self.next_seq)
            .field("flush_threshold", &self.flush_threshold)
            .field("compaction_threshold", &self.compaction_threshold)
            .field("wal_sync", &self.wal_sync)
            .field("memtable_size", &self.mem.approx_size())
            .field("memtable_entries", &self.mem.len())
            .field("sstable_count", &self.sstables.len())
            .finish()
    }
}

impl Engine {
    /// Opens or creates a database at `dir` with default tuning: 4 MiB flush
    /// threshold, fsync on every WAL append.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, DEFAULT_FLUSH_THRESHOLD, true)
    }

    /// Opens or creates a database at `dir` with explicit tuning.
    ///
    /// # Recovery Steps
    ///
    /// 1. Create the directory if missing.
    /// 2. Delete leftover `.sst.tmp` files from interrupted flushes.
    /// 3. Scan for `{level}-{seq}.sst` files, open them newest first, and
    ///    advance the sequence counter past the maximum.
    /// 4. Replay the WAL into a fresh memtable.
    /// 5. Open the WAL for appends.
    pub fn open_with<P: AsRef<Path>>(
        dir: P,
        flush_threshold: usize,
        wal_sync: bool,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        recovery::cleanup_tmp_files(&dir);

        let (sstables, next_seq) = recovery::load_sstables(&dir)?;

        // Replay before opening the writer so the two never hold the file
        // at the same time.
        let mut mem = Memtable::new(flush_threshold);
        let wal_path = dir.join(WAL_FILENAME);
        recovery::replay_wal(&wal_path, &mut mem)?;

        let wal = WalWriter::create(&wal_path, wal_sync)?;

        Ok(Self {
            dir,
            mem,
            sstables,
            wal,
            next_seq,
            flush_threshold,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            wal_sync,
        })
    }

    /// Flushes any buffered writes and closes the database.
    ///
    /// Dropping the engine performs the same best-effort flush; `close`
    /// exists to surface the error.
    pub fn close(mut self) -> Result<()> {
        if !self.mem.is_empty() {
            self.flush()?;
        }
        Ok(())
    }

    /// Returns diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            num_sstables: self.sstables.len(),
            memtable_size_bytes: self.mem.approx_size(),
            memtable_count: self.mem.len(),
            wal_size_bytes: self.wal.size(),
        }
    }

    /// Total number of open SSTables across both levels.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.sstables.len()
    }

    /// Number of level-0 SSTables (from memtable flushes).
    #[must_use]
    pub fn level0_count(&self) -> usize {
        self.sstables
            .iter()
            .filter(|r| recovery::table_level(r.path()) == Some(0))
            .count()
    }

    /// Number of level-1 SSTables (from compaction).
    #[must_use]
    pub fn level1_count(&self) -> usize {
        self.sstables
            .iter()
            .filter(|r| recovery::table_level(r.path()) == Some(1))
            .count()
    }

    /// The next SSTable sequence number the engine will assign.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Current level-0 compaction trigger. 0 means disabled.
    #[must_use]
    pub fn compaction_threshold(&self) -> usize {
        self.compaction_threshold
    }

    /// Updates the compaction trigger. Set to `0` to disable auto-compaction.
    pub fn set_compaction_threshold(&mut self, threshold: usize) {
        self.compaction_threshold = threshold;
    }

    /// Path of an SSTable file for the given level and sequence number.
    pub(crate) fn sst_path(&self, level: u8, seq: u64) -> PathBuf {
        self.dir.join(format!("{}-{:06}.sst", level, seq))
    }

    /// Path of the WAL file.
    pub(crate) fn wal_path(&self) -> PathBuf {
        self.dir.join(WAL_FILENAME)
    }
}

/// Best-effort flush on drop.
///
/// Errors cannot propagate out of `Drop`; the data is still safe in the WAL
/// and will be recovered on the next open.
impl Drop for Engine {
    fn drop(&mut self) {
        if !self.mem.is_empty() {
            if let Err(e) = self.flush() {
                error!("flush on drop failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests;
