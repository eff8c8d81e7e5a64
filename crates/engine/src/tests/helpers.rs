use std::fs;
use std::path::Path;

/// Counts `.sst` files in the storage directory.
pub fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}

/// Counts `.sst` files whose name starts with `{level}-`.
pub fn count_level_files(dir: &Path, level: u8) -> usize {
    let prefix = format!("{}-", level);
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(&prefix) && n.ends_with(".sst"))
                .unwrap_or(false)
        })
        .count()
}
