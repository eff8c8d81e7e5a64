//! # CLI - SiltKV Interactive Shell
//!
//! A REPL-style command-line interface for the SiltKV storage engine.
//! Reads commands from stdin, executes them against the engine, and prints
//! results to stdout. Designed for both interactive use and scripted testing
//! (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! FLUSH              Force flush memtable to SSTable
//! COMPACT            Merge all SSTables into a single level-1 table
//! STATS              Print engine counters
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! SILT_DIR              data directory          (default: "data")
//! SILT_FLUSH_KB         flush threshold in KiB  (default: 4096 = 4 MiB)
//! SILT_WAL_SYNC         fsync every WAL append  (default: "true")
//! SILT_COMPACT_TRIGGER  level-0 compaction trigger (default: 4, 0 = off)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ siltkv
//! SiltKV started (dir=data, flush=4096KiB, wal_sync=true, trigger=4)
//! > PUT name Alice
//! OK
//! > GET name
//! Alice
//! > DEL name
//! OK
//! > GET name
//! (nil)
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use engine::Engine;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to
/// `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = env_or("SILT_DIR", "data");
    let flush_kb: usize = env_or("SILT_FLUSH_KB", "4096").parse().unwrap_or(4096);
    let wal_sync: bool = env_or("SILT_WAL_SYNC", "true").parse().unwrap_or(true);
    let trigger: usize = env_or("SILT_COMPACT_TRIGGER", "4").parse().unwrap_or(4);

    let mut engine = Engine::open_with(&dir, flush_kb * 1024, wal_sync)?;
    engine.set_compaction_threshold(trigger);

    println!(
        "SiltKV started (dir={}, flush={}KiB, wal_sync={}, trigger={})",
        dir, flush_kb, wal_sync, trigger
    );
    println!("Commands: PUT key value | GET key | DEL key");
    println!("          FLUSH | COMPACT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: PUT key value");
                        } else {
                            match engine.put(k, v.as_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR put failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: PUT key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match engine.get(k) {
                            Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.delete(k) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR delete failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "FLUSH" => match engine.force_flush() {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("ERR flush failed: {}", e),
                },
                "COMPACT" => match engine.compact() {
                    Ok(()) => println!("OK ({} sstables)", engine.sstable_count()),
                    Err(e) => println!("ERR compact failed: {}", e),
                },
                "STATS" => {
                    let stats = engine.stats();
                    println!(
                        "sstables={} memtable_bytes={} memtable_entries={} wal_bytes={}",
                        stats.num_sstables,
                        stats.memtable_size_bytes,
                        stats.memtable_count,
                        stats.wal_size_bytes
                    );
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("ERR unknown command: {}", other),
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    engine.close()?;
    Ok(())
}
