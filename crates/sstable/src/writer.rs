use anyhow::Result;
use bloom::BloomFilter;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::format::{write_footer, Footer};
use crate::TableEntry;

/// Target false-positive rate for the per-table bloom filter.
const BLOOM_FPR: f64 = 0.01;

pub struct TableWriter {}

impl TableWriter {
    /// Writes an SSTable at `path` from the given entries.
    ///
    /// The input must be sorted by key with unique keys; the writer does not
    /// validate ordering — callers (memtable flush, compaction merge)
    /// guarantee it by construction. Zero entries produce a valid empty
    /// table so compaction can always replace its inputs with one file.
    ///
    /// Implementation notes:
    /// - Streams DATA, INDEX, and BLOOM sections without a seek, tracking
    ///   each data entry's starting offset for the index.
    /// - Writes to a temp file in the same directory, fsyncs, then
    ///   atomically renames into place. A crash mid-write leaves only a
    ///   `.sst.tmp` orphan, which recovery deletes.
    pub fn write(path: &Path, entries: &[TableEntry]) -> Result<()> {
        let tmp_path = path.with_extension("sst.tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut w = BufWriter::new(file);

        let mut bloom = BloomFilter::new(entries.len(), BLOOM_FPR);
        for e in entries {
            bloom.insert(&e.key);
        }

        // DATA section, collecting each entry's starting offset.
        let mut offsets: Vec<u64> = Vec::with_capacity(entries.len());
        let mut offset: u64 = 0;
        for e in entries {
            offsets.push(offset);

            w.write_u32::<LittleEndian>(e.key.len() as u32)?;
            w.write_all(&e.key)?;
            w.write_u32::<LittleEndian>(e.value.len() as u32)?;
            w.write_all(&e.value)?;
            w.write_u8(e.tombstone as u8)?;

            offset += 4 + e.key.len() as u64 + 4 + e.value.len() as u64 + 1;
        }

        // INDEX section.
        let index_offset = offset;
        for (e, data_offset) in entries.iter().zip(&offsets) {
            w.write_u32::<LittleEndian>(e.key.len() as u32)?;
            w.write_all(&e.key)?;
            w.write_u64::<LittleEndian>(*data_offset)?;
            offset += 4 + e.key.len() as u64 + 8;
        }

        // BLOOM section.
        let bloom_offset = offset;
        let bloom_bytes = bloom.to_bytes();
        w.write_all(&bloom_bytes)?;

        write_footer(
            &mut w,
            &Footer {
                index_offset,
                index_count: entries.len() as u32,
                bloom_offset,
                bloom_size: bloom_bytes.len() as u32,
            },
        )?;

        // Durability before visibility: sync the temp file, then rename.
        w.flush()?;
        w.get_ref().sync_all()?;
        rename(&tmp_path, path)?;

        Ok(())
    }
}
