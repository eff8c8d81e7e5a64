//! K-way merge and compaction over multiple [`TableReader`]s.
//!
//! Inputs are ordered **newest first**: when the same key appears in several
//! tables, the entry from the lowest-indexed source wins and the shadowed
//! duplicates are discarded. This is the core primitive for compaction: walk
//! N input tables in sorted order, deduplicate, drop tombstones, and write
//! the result to a single replacement table.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;

use crate::{TableEntry, TableReader, TableWriter};

/// A pending entry from one source table, used for heap-based merge
/// ordering.
struct HeapEntry {
    entry: TableEntry,
    /// Index into the sources array; lower = newer table.
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.entry.key == other.entry.key && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the *smallest* key first, so
        // reverse the key comparison. On equal keys the lower source index
        // (the newer table) must pop first — that entry wins the merge.
        other
            .entry
            .key
            .cmp(&self.entry.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges the entries of multiple tables into one sorted, deduplicated
/// stream.
///
/// Every source's entries are read up front; the heap then holds one cursor
/// per non-exhausted source. Duplicate keys resolve to the newest source
/// (lowest index), and every cursor positioned on the duplicate key is
/// advanced so older entries never resurface.
pub struct MergeIterator {
    sources: Vec<std::vec::IntoIter<TableEntry>>,
    heap: BinaryHeap<HeapEntry>,
}

impl MergeIterator {
    /// Creates a merge iterator over `readers`, ordered newest first.
    ///
    /// # Errors
    ///
    /// Fails if reading any input table fails; no partial merge is exposed.
    pub fn new(readers: &[TableReader]) -> Result<Self> {
        let mut sources = Vec::with_capacity(readers.len());
        let mut heap = BinaryHeap::new();

        for (i, reader) in readers.iter().enumerate() {
            let mut iter = reader.read_all()?.into_iter();
            if let Some(first) = iter.next() {
                heap.push(HeapEntry {
                    entry: first,
                    source: i,
                });
            }
            sources.push(iter);
        }

        Ok(Self { sources, heap })
    }

    /// Pushes the next entry from `source` onto the heap, if any remains.
    fn advance(&mut self, source: usize) {
        if let Some(next) = self.sources[source].next() {
            self.heap.push(HeapEntry {
                entry: next,
                source,
            });
        }
    }
}

impl Iterator for MergeIterator {
    type Item = TableEntry;

    fn next(&mut self) -> Option<TableEntry> {
        let top = self.heap.pop()?;
        self.advance(top.source);

        // Equal keys sort lowest-source-first, so `top` is the newest copy.
        // Drain the shadowed duplicates and advance their cursors.
        while let Some(peek) = self.heap.peek() {
            if peek.entry.key != top.entry.key {
                break;
            }
            let dup = self.heap.pop().unwrap();
            self.advance(dup.source);
        }

        Some(top.entry)
    }
}

/// Merges `readers` (ordered newest first) into a single table at `output`.
///
/// Tombstones are removed from the result: the merge spans every table that
/// could contain a shadowed value for the key, so once the newest entry is a
/// tombstone there is nothing left for it to hide. An empty result still
/// writes a valid empty table so the caller can remove the old files
/// uniformly.
///
/// On failure the inputs are untouched; destruction of the old tables is the
/// caller's job and only happens after success.
pub fn compact(readers: &[TableReader], output: &Path) -> Result<()> {
    let live: Vec<TableEntry> = MergeIterator::new(readers)?
        .filter(|e| !e.tombstone)
        .collect();

    TableWriter::write(output, &live)
}
