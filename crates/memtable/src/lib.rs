//! In-memory sorted buffer of the most recent writes.
//!
//! The memtable holds at most one entry per key. A write overwrites in
//! place; a delete leaves a [`Slot::Tombstone`] so the deletion shadows any
//! older value living in an SSTable. When the tracked byte size crosses the
//! flush threshold the engine drains the memtable into a new level-0 table.

use std::collections::BTreeMap;

/// Default flush threshold: 4 MiB of tracked entry bytes.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 4 * 1024 * 1024;

/// Value state for a key.
///
/// A tombstone is a first-class state, not an absent value: it stops the
/// read path where a missing key would let it continue into older tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A live value. The empty value is live too.
    Value(Vec<u8>),
    /// The key has been deleted.
    Tombstone,
}

/// Bounded, sorted in-memory buffer of recent writes.
///
/// The tracked size is an approximation used only to trigger flushes:
/// `key_len + value_len + 1` per live entry, `key_len + 1` per tombstone.
#[derive(Debug)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, Slot>,
    approx_size: usize,
    threshold: usize,
}

impl Memtable {
    /// Creates an empty memtable that reports full at `threshold` bytes.
    pub fn new(threshold: usize) -> Self {
        Self {
            map: BTreeMap::new(),
            approx_size: 0,
            threshold,
        }
    }

    /// Inserts or overwrites a key.
    ///
    /// Overwriting clears any tombstone and adjusts the tracked size by the
    /// value-length delta; a fresh insert adds `key_len + value_len + 1`.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        match self.map.get_mut(&key) {
            Some(slot) => {
                if let Slot::Value(old) = slot {
                    self.approx_size = self.approx_size.saturating_sub(old.len());
                }
                self.approx_size += value.len();
                *slot = Slot::Value(value);
            }
            None => {
                self.approx_size += key.len() + value.len() + 1;
                self.map.insert(key, Slot::Value(value));
            }
        }
    }

    /// Marks a key as deleted.
    ///
    /// An existing entry collapses to a tombstone (dropping its value bytes
    /// from the tracked size); a missing key gets a fresh tombstone entry of
    /// `key_len + 1` bytes.
    pub fn delete(&mut self, key: Vec<u8>) {
        match self.map.get_mut(&key) {
            Some(slot) => {
                if let Slot::Value(old) = slot {
                    self.approx_size = self.approx_size.saturating_sub(old.len());
                }
                *slot = Slot::Tombstone;
            }
            None => {
                self.approx_size += key.len() + 1;
                self.map.insert(key, Slot::Tombstone);
            }
        }
    }

    /// Looks up a key.
    ///
    /// `None` means the key was never written here and the read path should
    /// continue into the SSTables; `Some(Slot::Tombstone)` means the key is
    /// deleted and the read path must stop.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Slot> {
        self.map.get(key)
    }

    /// True once the tracked size has reached the flush threshold.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.approx_size >= self.threshold
    }

    /// Ordered iterator over entries, tombstones included. Used for flushing.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Slot)> {
        self.map.iter()
    }

    /// Number of entries, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Approximate memory usage in bytes.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    /// Empties the memtable after a flush, keeping the threshold.
    pub fn clear(&mut self) {
        self.map.clear();
        self.approx_size = 0;
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_THRESHOLD)
    }
}
