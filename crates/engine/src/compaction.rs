//! Compaction: merges every SSTable (both levels) into a single level-1
//! table.
//!
//! Merging everything at once is what makes tombstone removal safe: after
//! the merge there is no older file left that could still hold a deleted
//! key. The result replaces all inputs; old files are deleted only after
//! the new table exists.

use anyhow::Result;
use log::debug;

use crate::{recovery, Engine};

impl Engine {
    /// Runs compaction if the level-0 table count has reached the trigger.
    ///
    /// Called after every flush. A threshold of 0 disables the check.
    pub(crate) fn maybe_compact(&mut self) -> Result<()> {
        if self.compaction_threshold == 0 || self.level0_count() < self.compaction_threshold {
            return Ok(());
        }
        self.compact()
    }

    /// Compacts all SSTables into a single level-1 table.
    ///
    /// The in-memory reader list is already ordered newest first, which is
    /// exactly the order the merge needs for newest-wins resolution. After
    /// the merged table is written, the inputs are closed and deleted and
    /// the reader list is rebuilt from disk.
    ///
    /// # Errors
    ///
    /// On failure the input readers and their files are left in place; the
    /// engine remains fully usable.
    pub fn compact(&mut self) -> Result<()> {
        if self.sstables.len() <= 1 {
            return Ok(());
        }

        let inputs = std::mem::take(&mut self.sstables);
        let old_paths: Vec<std::path::PathBuf> =
            inputs.iter().map(|r| r.path().to_path_buf()).collect();

        let output = self.sst_path(1, self.next_seq);
        if let Err(e) = sstable::compact(&inputs, &output) {
            // Nothing was destroyed; put the readers back.
            self.sstables = inputs;
            return Err(e);
        }

        debug!(
            "compacted {} tables into {}",
            old_paths.len(),
            output.display()
        );

        // Drop the readers (releases file handles) before deleting files.
        drop(inputs);
        for p in &old_paths {
            let _ = std::fs::remove_file(p);
        }
        self.next_seq += 1;

        // Reload from disk — just the one new file.
        let (sstables, next_seq) = recovery::load_sstables(&self.dir)?;
        self.sstables = sstables;
        self.next_seq = self.next_seq.max(next_seq);

        Ok(())
    }
}
