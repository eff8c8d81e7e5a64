use anyhow::{bail, Context, Result};
use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format::{read_footer, FOOTER_BYTES};
use crate::TableEntry;

/// Maximum key size we'll allocate during reads (64 KiB). Prevents OOM on
/// corrupt files.
const MAX_KEY_BYTES: usize = 64 * 1024;
/// Maximum value size we'll allocate during reads (10 MiB). Prevents OOM on
/// corrupt files.
const MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Outcome of a point lookup against a single table.
///
/// `Tombstone` and `Absent` are distinct on purpose: a tombstone stops the
/// engine's read path, while an absent key sends it on to the next (older)
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key is present with this value (possibly empty).
    Live(Vec<u8>),
    /// The key is present as a deletion marker.
    Tombstone,
    /// The key is not in this table.
    Absent,
}

/// Reads an SSTable file for point lookups.
///
/// On [`open`](TableReader::open) the index and bloom filter are loaded into
/// memory; the file handle stays open for the reader's lifetime so a lookup
/// costs one binary search plus one seek + read against the data section.
///
/// The engine is single-threaded, so data reads go through `&File` (std
/// implements `Read`/`Seek` for it) — no interior locking.
#[derive(Debug)]
pub struct TableReader {
    /// Path to the `.sst` file on disk; the engine uses it to delete the
    /// file after compaction.
    path: PathBuf,
    /// In-memory index: `(key, data offset)`, sorted by key.
    index: Vec<(Vec<u8>, u64)>,
    bloom: BloomFilter,
    file: File,
}

impl TableReader {
    /// Opens an SSTable file and loads its index and bloom filter.
    ///
    /// # Validation
    ///
    /// - The file must be at least [`FOOTER_BYTES`] long.
    /// - The footer magic must match and its section offsets must lie inside
    ///   the file.
    /// - The index must decode to exactly `index_count` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if any check fails or any I/O operation fails; the
    /// file handle is closed on the way out.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)
            .with_context(|| format!("sstable open {}", path_buf.display()))?;
        let filesize = f.metadata()?.len();

        if filesize < FOOTER_BYTES {
            bail!("sstable file too small: {}", path_buf.display());
        }

        let footer = read_footer(&mut f, filesize)
            .with_context(|| format!("sstable footer {}", path_buf.display()))?;

        // Bloom section.
        f.seek(SeekFrom::Start(footer.bloom_offset))?;
        let mut bloom_bytes = vec![0u8; footer.bloom_size as usize];
        f.read_exact(&mut bloom_bytes)?;
        let bloom = BloomFilter::from_bytes(&bloom_bytes);

        // Index section spans [index_offset, bloom_offset).
        f.seek(SeekFrom::Start(footer.index_offset))?;
        let mut index_bytes = vec![0u8; (footer.bloom_offset - footer.index_offset) as usize];
        f.read_exact(&mut index_bytes)?;

        let mut index = Vec::with_capacity(footer.index_count as usize);
        let mut cursor = &index_bytes[..];
        for _ in 0..footer.index_count {
            let key_len = cursor
                .read_u32::<LittleEndian>()
                .context("corrupt sstable index")? as usize;
            if key_len > MAX_KEY_BYTES {
                bail!(
                    "corrupt sstable index: key_len {} exceeds maximum {}",
                    key_len,
                    MAX_KEY_BYTES
                );
            }
            let mut key = vec![0u8; key_len];
            cursor
                .read_exact(&mut key)
                .context("corrupt sstable index")?;
            let offset = cursor
                .read_u64::<LittleEndian>()
                .context("corrupt sstable index")?;
            index.push((key, offset));
        }

        Ok(Self {
            path: path_buf,
            index,
            bloom,
            file: f,
        })
    }

    /// Point lookup for a single key.
    ///
    /// The bloom filter is checked first: a negative means the key is
    /// **definitely not** here, skipping the index and the disk entirely.
    /// A bloom false positive falls through the index search to `Absent`.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a corrupt data record.
    pub fn get(&self, key: &[u8]) -> Result<Lookup> {
        if !self.bloom.may_contain(key) {
            return Ok(Lookup::Absent);
        }

        let slot = match self.index.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(i) => i,
            Err(_) => return Ok(Lookup::Absent),
        };

        let (value, tombstone) = self.read_entry_at(self.index[slot].1)?;
        Ok(if tombstone {
            Lookup::Tombstone
        } else {
            Lookup::Live(value)
        })
    }

    /// Reads the data entry starting at `offset`, returning its value and
    /// tombstone flag. The key bytes are skipped — the index already matched
    /// them.
    fn read_entry_at(&self, offset: u64) -> Result<(Vec<u8>, bool)> {
        let mut f = &self.file;
        f.seek(SeekFrom::Start(offset))?;

        let key_len = f.read_u32::<LittleEndian>()? as usize;
        if key_len > MAX_KEY_BYTES {
            bail!(
                "corrupt sstable data: key_len {} exceeds maximum {}",
                key_len,
                MAX_KEY_BYTES
            );
        }
        f.seek(SeekFrom::Current(key_len as i64))?;

        let val_len = f.read_u32::<LittleEndian>()? as usize;
        if val_len > MAX_VALUE_BYTES {
            bail!(
                "corrupt sstable data: val_len {} exceeds maximum {}",
                val_len,
                MAX_VALUE_BYTES
            );
        }

        // Value and tombstone byte in one read.
        let mut buf = vec![0u8; val_len + 1];
        f.read_exact(&mut buf)?;
        let tombstone = buf[val_len] == 1;
        buf.truncate(val_len);

        Ok((buf, tombstone))
    }

    /// Reads every entry in key order. Used by compaction.
    ///
    /// A read failure aborts with an error rather than dropping the entry —
    /// a compaction built from a partial read would silently destroy data
    /// when the inputs are deleted.
    pub fn read_all(&self) -> Result<Vec<TableEntry>> {
        let mut entries = Vec::with_capacity(self.index.len());
        for (key, offset) in &self.index {
            let (value, tombstone) = self.read_entry_at(*offset).with_context(|| {
                format!("sstable read_all at offset {} in {}", offset, self.path.display())
            })?;
            entries.push(TableEntry {
                key: key.clone(),
                value,
                tombstone,
            });
        }
        Ok(entries)
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True for a table with zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Path of the underlying `.sst` file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
