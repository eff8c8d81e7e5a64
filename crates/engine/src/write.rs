//! Write path: `put()`, `delete()`, `force_flush()`, and the internal
//! `flush()`.
//!
//! All mutations flow through this module. Each write is first appended to
//! the WAL for durability, then applied to the in-memory memtable. When the
//! memtable reports full, it is persisted to a new level-0 SSTable.

use anyhow::Result;
use log::debug;
use memtable::Slot;
use sstable::{TableEntry, TableReader, TableWriter};
use std::fs::OpenOptions;
use wal::{WalRecord, WalWriter};

use crate::{Engine, MAX_KEY_SIZE, MAX_VALUE_SIZE};

impl Engine {
    /// Inserts a key-value pair. Durable on return.
    ///
    /// The operation is appended to the WAL first; the memtable is only
    /// touched once the append has succeeded. If the memtable crosses its
    /// threshold the write also triggers a flush.
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        anyhow::ensure!(!key.is_empty(), "key must not be empty");
        anyhow::ensure!(
            key.len() <= MAX_KEY_SIZE,
            "key too large: {} bytes (max {})",
            key.len(),
            MAX_KEY_SIZE
        );
        anyhow::ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );

        self.wal.append(&WalRecord::Put {
            key: key.as_bytes().to_vec(),
            value: value.to_vec(),
        })?;

        self.mem.put(key.as_bytes().to_vec(), value.to_vec());

        if self.mem.is_full() {
            self.flush()?;
        }

        Ok(())
    }

    /// Deletes a key by writing a tombstone. Idempotent: deleting a key that
    /// was never written still succeeds (and still shadows any future
    /// appearance of the key in older tables).
    pub fn delete(&mut self, key: &str) -> Result<()> {
        anyhow::ensure!(!key.is_empty(), "key must not be empty");
        anyhow::ensure!(
            key.len() <= MAX_KEY_SIZE,
            "key too large: {} bytes (max {})",
            key.len(),
            MAX_KEY_SIZE
        );

        self.wal.append(&WalRecord::Del {
            key: key.as_bytes().to_vec(),
        })?;

        self.mem.delete(key.as_bytes().to_vec());

        if self.mem.is_full() {
            self.flush()?;
        }

        Ok(())
    }

    /// Forces a flush of the current memtable to a new SSTable.
    ///
    /// No-op when the memtable is empty.
    pub fn force_flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    /// Internal flush implementation.
    ///
    /// # Steps
    ///
    /// 1. Snapshot the memtable as sorted table entries.
    /// 2. Write a level-0 SSTable at `next_seq` (synced and renamed into
    ///    place by the writer).
    /// 3. Open the new table and prepend its reader (newest first).
    /// 4. Truncate the WAL — only now that the table is durable.
    /// 5. Reset the memtable and run the compaction check.
    ///
    /// A failure before step 4 leaves the memtable and WAL intact, so a
    /// retry or a restart loses nothing.
    pub(crate) fn flush(&mut self) -> Result<()> {
        let entries: Vec<TableEntry> = self
            .mem
            .iter()
            .map(|(key, slot)| match slot {
                Slot::Value(v) => TableEntry {
                    key: key.clone(),
                    value: v.clone(),
                    tombstone: false,
                },
                Slot::Tombstone => TableEntry {
                    key: key.clone(),
                    value: Vec::new(),
                    tombstone: true,
                },
            })
            .collect();

        let sst_path = self.sst_path(0, self.next_seq);
        TableWriter::write(&sst_path, &entries)?;

        let reader = TableReader::open(&sst_path)?;
        self.sstables.insert(0, reader);
        self.next_seq += 1;

        debug!(
            "flushed {} entries to {}",
            entries.len(),
            sst_path.display()
        );

        // The flushed table is durable; the WAL contents are now redundant.
        self.reset_wal()?;
        self.mem.clear();

        self.maybe_compact()
    }

    /// Truncates the WAL and reopens it for appends.
    fn reset_wal(&mut self) -> Result<()> {
        let wal_path = self.wal_path();
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&wal_path)?;
        self.wal = WalWriter::create(&wal_path, self.wal_sync)?;
        Ok(())
    }
}
