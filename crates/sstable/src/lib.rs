//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the SiltKV storage engine.
//!
//! When the in-memory memtable exceeds its size threshold the engine flushes
//! it to disk as an SSTable. SSTables are *write-once, read-many* — once
//! created they are never modified (only replaced during compaction).
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA SECTION (sorted key/value records)                       │
//! │                                                               │
//! │ key_len (u32) | key | val_len (u32) | val | tombstone (u8)    │
//! │                                                               │
//! │ ... repeated for each entry ...                               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ INDEX SECTION (key -> data offset mapping)                    │
//! │                                                               │
//! │ key_len (u32) | key | offset (u64)                            │
//! │                                                               │
//! │ ... one per data entry, same order ...                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOOM SECTION (serialized BloomFilter)                        │
//! │                                                               │
//! │ num_bits (u32) | num_hashes (u32) | bits (bytes)              │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 28 bytes)                                 │
//! │                                                               │
//! │ index_offset (u64) | index_count (u32)                        │
//! │ bloom_offset (u64) | bloom_size (u32) | magic (u32) "LSMT"    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Offsets are absolute file offsets (the
//! data section starts at offset 0). The footer-at-end design lets the
//! writer stream the whole file without a single seek; a reader recovers
//! every section boundary from the footer alone.

mod compact;
mod format;
mod reader;
mod writer;

pub use compact::{compact, MergeIterator};
pub use format::{FOOTER_BYTES, SSTABLE_MAGIC};
pub use reader::{Lookup, TableReader};
pub use writer::TableWriter;

/// A single key entry as stored in a table's data section.
///
/// `value` is empty for tombstones; an empty value with `tombstone == false`
/// is a legal live value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub tombstone: bool,
}

#[cfg(test)]
mod tests;
