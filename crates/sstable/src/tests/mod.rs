
use crate::TableEntry;

/// Helper: a live entry.
pub fn entry(key: &[u8], value: &[u8]) -> TableEntry {
    TableEntry {
        key: key.to_vec(),
        value: value.to_vec(),
        tombstone: false,
    }
}

/// Helper: a deletion marker.
pub fn tombstone(key: &[u8]) -> TableEntry {
    TableEntry {
        key: key.to_vec(),
        value: Vec::new(),
        tombstone: true,
    }
}
