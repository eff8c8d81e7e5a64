//! Read path: `get()`.
//!
//! Point lookups check the memtable first (freshest data), then SSTables
//! newest to oldest. The first definitive answer wins: a live value is
//! returned, a tombstone means not-found, and only a true miss continues
//! into the next tier.

use anyhow::Result;
use memtable::Slot;
use sstable::Lookup;

use crate::Engine;

impl Engine {
    /// Looks up a key, returning `Ok(Some(value))` if found and live.
    ///
    /// `Ok(None)` covers both "never written" and "deleted" — the engine
    /// does not distinguish them.
    ///
    /// # Errors
    ///
    /// Returns an error if an SSTable read fails (I/O or corruption).
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.mem.get(key.as_bytes()) {
            Some(Slot::Value(v)) => return Ok(Some(v.clone())),
            Some(Slot::Tombstone) => return Ok(None),
            None => {}
        }

        for sst in &self.sstables {
            match sst.get(key.as_bytes())? {
                Lookup::Live(v) => return Ok(Some(v)),
                Lookup::Tombstone => return Ok(None),
                Lookup::Absent => continue,
            }
        }

        Ok(None)
    }
}
