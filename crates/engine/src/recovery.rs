//! Cold-start path: replaying the WAL into a fresh memtable, discovering
//! SSTables on disk, and cleaning up debris from interrupted flushes.

use anyhow::{Context, Result};
use log::debug;
use memtable::Memtable;
use sstable::TableReader;
use std::path::Path;
use wal::{WalReader, WalRecord};

/// Replays a WAL file into the given memtable.
///
/// A missing file is a fresh start, not an error. Corruption never
/// propagates from here: the WAL reader stops at the first invalid record
/// and keeps the valid prefix — those tail bytes belong to writes that were
/// never acknowledged.
pub(crate) fn replay_wal(path: &Path, mem: &mut Memtable) -> Result<()> {
    let mut reader = match WalReader::open(path) {
        Ok(r) => r,
        Err(wal::WalError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!(e).context("open WAL for replay")),
    };

    let mut replayed = 0usize;
    reader.replay(|rec| {
        replayed += 1;
        match rec {
            WalRecord::Put { key, value } => mem.put(key, value),
            WalRecord::Del { key } => mem.delete(key),
        }
    })?;

    if replayed > 0 {
        debug!("replayed {} WAL records from {}", replayed, path.display());
    }
    Ok(())
}

/// Scans `dir` for `{level}-{seq}.sst` files and opens them newest first
/// (descending sequence). Returns the readers and the next free sequence
/// number.
///
/// Filenames that don't parse are skipped — they aren't ours.
pub(crate) fn load_sstables(dir: &Path) -> Result<(Vec<TableReader>, u64)> {
    let mut found: Vec<(u64, std::path::PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if let Some((_, seq)) = parse_sst_name(name) {
            found.push((seq, path));
        }
    }

    // Newest first.
    found.sort_by(|a, b| b.0.cmp(&a.0));

    let next_seq = found.first().map(|(seq, _)| seq + 1).unwrap_or(1);

    let mut readers = Vec::with_capacity(found.len());
    for (_, path) in &found {
        let reader = TableReader::open(path)
            .with_context(|| format!("load sstable {}", path.display()))?;
        readers.push(reader);
    }

    Ok((readers, next_seq))
}

/// Deletes leftover `.sst.tmp` files from interrupted flushes.
pub(crate) fn cleanup_tmp_files(dir: &Path) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let p = entry.path();
            if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(".sst.tmp") {
                    debug!("removing stale temp file {}", p.display());
                    let _ = std::fs::remove_file(&p);
                }
            }
        }
    }
}

/// Level of an SSTable judging from its path, `None` if the name doesn't
/// follow the `{level}-{seq}.sst` pattern.
pub(crate) fn table_level(path: &Path) -> Option<u8> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_sst_name)
        .map(|(level, _)| level)
}

/// Parses `{level}-{seq:06}.sst` into `(level, seq)`. Level must be 0 or 1.
fn parse_sst_name(name: &str) -> Option<(u8, u64)> {
    let stem = name.strip_suffix(".sst")?;
    let (level_str, seq_str) = stem.split_once('-')?;
    let level: u8 = level_str.parse().ok()?;
    if level > 1 {
        return None;
    }
    let seq: u64 = seq_str.parse().ok()?;
    Some((level, seq))
}

#[cfg(test)]
mod parse_tests {
    use super::parse_sst_name;

    #[test]
    fn parses_wellformed_names() {
        assert_eq!(parse_sst_name("0-000001.sst"), Some((0, 1)));
        assert_eq!(parse_sst_name("1-000042.sst"), Some((1, 42)));
        assert_eq!(parse_sst_name("0-123456.sst"), Some((0, 123456)));
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(parse_sst_name("wal"), None);
        assert_eq!(parse_sst_name("0-000001.sst.tmp"), None);
        assert_eq!(parse_sst_name("2-000001.sst"), None);
        assert_eq!(parse_sst_name("x-000001.sst"), None);
        assert_eq!(parse_sst_name("0-abc.sst"), None);
        assert_eq!(parse_sst_name("000001.sst"), None);
    }
}
