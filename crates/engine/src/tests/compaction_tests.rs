use super::helpers::{count_level_files, count_sst_files};
use crate::*;
use anyhow::Result;
use tempfile::tempdir;

// --------------------- Manual compaction ---------------------

#[test]
fn compact_merges_all_tables_into_one_level1_file() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    engine.set_compaction_threshold(0);

    for i in 0..3u32 {
        engine.put(&format!("k{:02}", i), b"val")?;
        engine.force_flush()?;
    }
    assert_eq!(engine.level0_count(), 3);

    engine.compact()?;
    assert_eq!(engine.level0_count(), 0);
    assert_eq!(engine.level1_count(), 1);
    assert_eq!(count_sst_files(dir.path()), 1);
    assert_eq!(count_level_files(dir.path(), 1), 1);

    for i in 0..3u32 {
        assert_eq!(engine.get(&format!("k{:02}", i))?, Some(b"val".to_vec()));
    }
    Ok(())
}

#[test]
fn compact_single_table_is_noop() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    engine.set_compaction_threshold(0);

    engine.put("k", b"v")?;
    engine.force_flush()?;
    assert_eq!(engine.sstable_count(), 1);

    engine.compact()?;
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.level0_count(), 1);
    Ok(())
}

#[test]
fn compact_preserves_newest_value() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    engine.set_compaction_threshold(0);

    for v in [b"v1", b"v2", b"v3"] {
        engine.put("key", v)?;
        engine.force_flush()?;
    }

    engine.compact()?;
    assert_eq!(engine.get("key")?, Some(b"v3".to_vec()));
    Ok(())
}

#[test]
fn compact_removes_tombstoned_keys() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    engine.set_compaction_threshold(0);

    engine.put("doomed", b"v")?;
    engine.put("keeper", b"v")?;
    engine.force_flush()?;
    engine.delete("doomed")?;
    engine.force_flush()?;

    engine.compact()?;

    // The merged table holds only the live key; the tombstone is gone.
    assert_eq!(engine.level1_count(), 1);
    assert_eq!(engine.get("doomed")?, None);
    assert_eq!(engine.get("keeper")?, Some(b"v".to_vec()));

    // Still gone after a reopen (nothing on disk can resurrect it).
    drop(engine);
    let engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    assert_eq!(engine.get("doomed")?, None);
    Ok(())
}

#[test]
fn compacted_seq_is_higher_than_inputs() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1024 * 1024, false)?;
    engine.set_compaction_threshold(0);

    engine.put("a", b"1")?;
    engine.force_flush()?;
    engine.put("b", b"2")?;
    engine.force_flush()?;
    // Inputs are seq 1 and 2; the merged table takes seq 3.
    engine.compact()?;

    assert!(dir.path().join("1-000003.sst").exists());
    assert_eq!(engine.next_seq(), 4);
    Ok(())
}

// --------------------- Auto-compaction ---------------------

#[test]
fn auto_compaction_triggers_at_level0_threshold() -> Result<()> {
    let dir = tempdir()?;
    // Every put flushes; the default trigger is 4.
    let mut engine = Engine::open_with(dir.path(), 1, false)?;

    engine.put("a", b"1")?;
    engine.put("b", b"2")?;
    engine.put("c", b"3")?;
    assert_eq!(engine.level0_count(), 3);
    assert_eq!(engine.level1_count(), 0);

    // Fourth flush hits the trigger and collapses everything to level 1.
    engine.put("d", b"4")?;
    assert_eq!(engine.level0_count(), 0);
    assert_eq!(engine.level1_count(), 1);
    assert_eq!(count_sst_files(dir.path()), 1);

    for key in ["a", "b", "c", "d"] {
        assert!(engine.get(key)?.is_some(), "{} lost in compaction", key);
    }
    Ok(())
}

#[test]
fn auto_compaction_includes_level1_in_merge() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1, false)?;

    // First round: 4 flushes -> one level-1 table.
    for key in ["a", "b", "c", "d"] {
        engine.put(key, b"round1")?;
    }
    assert_eq!(engine.level1_count(), 1);

    // Second round overwrites two keys; the merge must take the new values.
    for key in ["a", "b", "e", "f"] {
        engine.put(key, b"round2")?;
    }
    assert_eq!(engine.level0_count(), 0);
    assert_eq!(engine.level1_count(), 1);

    assert_eq!(engine.get("a")?, Some(b"round2".to_vec()));
    assert_eq!(engine.get("c")?, Some(b"round1".to_vec()));
    assert_eq!(engine.get("f")?, Some(b"round2".to_vec()));
    Ok(())
}

#[test]
fn zero_threshold_disables_auto_compaction() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open_with(dir.path(), 1, false)?;
    engine.set_compaction_threshold(0);
    assert_eq!(engine.compaction_threshold(), 0);

    for i in 0..6u32 {
        engine.put(&format!("k{}", i), b"v")?;
    }
    assert_eq!(engine.level0_count(), 6);
    assert_eq!(engine.level1_count(), 0);
    Ok(())
}

// --------------------- Large workload ---------------------

#[test]
fn large_workload_with_deletes_survives_reopen() -> Result<()> {
    let dir = tempdir()?;

    {
        // Small threshold so the workload exercises flushes and compactions.
        let mut engine = Engine::open_with(dir.path(), 32 * 1024, false)?;
        for i in 0..10_000u32 {
            engine.put(&format!("key-{:05}", i), format!("val-{:05}", i).as_bytes())?;
        }
        for i in (0..10_000u32).step_by(2) {
            engine.delete(&format!("key-{:05}", i))?;
        }
        engine.close()?;
    }

    let engine = Engine::open_with(dir.path(), 32 * 1024, false)?;
    for i in 0..10_000u32 {
        let key = format!("key-{:05}", i);
        if i % 2 == 0 {
            assert_eq!(engine.get(&key)?, None, "{} should be deleted", key);
        } else {
            assert_eq!(
                engine.get(&key)?,
                Some(format!("val-{:05}", i).into_bytes()),
                "{} should be readable",
                key
            );
        }
    }
    Ok(())
}
