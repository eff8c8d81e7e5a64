//! Process-level integration tests for the SiltKV shell.
//!
//! Each test spawns the real binary, drives it over stdin, and inspects
//! stdout plus the on-disk state.

use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Runs the shell against `dir`, feeding `commands` through stdin.
fn run_cli(dir: &Path, commands: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new("cargo")
        .args(["run", "-p", "cli", "--"])
        .env("SILT_DIR", dir.to_str().unwrap())
        .env("SILT_FLUSH_KB", "1") // 1 KiB: flushes trigger easily
        .env("SILT_WAL_SYNC", "false")
        .env("SILT_COMPACT_TRIGGER", "2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(commands.as_bytes())
            .expect("failed to write commands");
        stdin.write_all(b"EXIT\n").expect("failed to write EXIT");
    }

    let output = child.wait_with_output().expect("failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn basic_put_get() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT key1 value1\nGET key1\n");

    assert!(output.contains("OK"));
    assert!(output.contains("value1"));
}

#[test]
fn get_missing_key_prints_nil() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "GET nothing\n");

    assert!(output.contains("(nil)"));
}

#[test]
fn overwrite_key() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT k old\nGET k\nPUT k new\nGET k\n");

    assert!(output.contains("old"));
    assert!(output.contains("new"));
}

#[test]
fn delete_key() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT delme value\nGET delme\nDEL delme\nGET delme\n");

    assert!(output.contains("value"));
    assert!(output.contains("(nil)"));
}

#[test]
fn values_with_spaces_are_preserved() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT greeting hello wide world\nGET greeting\n");

    assert!(output.contains("hello wide world"));
}

#[test]
fn flush_creates_sstable() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT a 1\nPUT b 2\nFLUSH\nGET a\nGET b\n");

    assert!(output.contains("OK"));
    assert!(output.contains("1"));
    assert!(output.contains("2"));

    let sst_files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "sst").unwrap_or(false))
        .collect();
    assert!(!sst_files.is_empty(), "FLUSH should create an SSTable");
}

#[test]
fn stats_reports_counters() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "PUT k v\nSTATS\n");

    assert!(output.contains("sstables="));
    assert!(output.contains("memtable_entries="));
    assert!(output.contains("wal_bytes="));
}

#[test]
fn unknown_command_reports_error() {
    let dir = tempdir().unwrap();
    let output = run_cli(dir.path(), "FROB x y\n");

    assert!(output.contains("ERR unknown command"));
}

#[test]
fn data_persists_across_runs() {
    let dir = tempdir().unwrap();

    let first = run_cli(dir.path(), "PUT durable yes\n");
    assert!(first.contains("OK"));

    let second = run_cli(dir.path(), "GET durable\n");
    assert!(second.contains("yes"));
}

#[test]
fn deletes_persist_across_runs() {
    let dir = tempdir().unwrap();

    run_cli(dir.path(), "PUT k v\nDEL k\n");
    let output = run_cli(dir.path(), "GET k\n");

    assert!(output.contains("(nil)"));
}

#[test]
fn compact_collapses_tables() {
    let dir = tempdir().unwrap();

    // Two flush rounds produce two level-0 tables; with the trigger at 2 the
    // second flush compacts them into a single level-1 table.
    let mut commands = String::new();
    for i in 0..10 {
        commands.push_str(&format!("PUT key{:03} value_with_some_padding_{}\n", i, i));
    }
    commands.push_str("FLUSH\n");
    for i in 10..20 {
        commands.push_str(&format!("PUT key{:03} value_with_some_padding_{}\n", i, i));
    }
    commands.push_str("FLUSH\nCOMPACT\nSTATS\nGET key010\n");

    let output = run_cli(dir.path(), &commands);
    assert!(output.contains("value_with_some_padding_10"));

    // After a full compaction only level-1 tables remain.
    let level0: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with("0-") && n.ends_with(".sst"))
                .unwrap_or(false)
        })
        .collect();
    assert!(level0.is_empty(), "no level-0 tables after COMPACT");
}
