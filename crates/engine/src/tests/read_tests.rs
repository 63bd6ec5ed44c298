use tempfile::tempdir;

use crate::{Engine, EngineConfig};

#[test]
fn newest_queued_memtable_wins_over_an_older_one() {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        memtable_size_limit: 40,
        memtable_flush_threshold: 10_000,
    };
    let mut engine = Engine::open(dir.path(), config).unwrap();

    engine.set(b"k", b"old").unwrap();
    // Large enough to not fit alongside "k" in the same 40-byte memtable,
    // forcing a rotation without crossing the flush threshold.
    engine.set(b"padding-key", b"padding-value-bytes").unwrap();
    engine.set(b"k", b"new").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"new".to_vec()));
}

#[test]
fn newest_sstable_wins_over_an_older_one() {
    let dir = tempdir().unwrap();
    let mut engine = Engine::open_default(dir.path()).unwrap();

    engine.set(b"k", b"v1").unwrap();
    engine.force_flush().unwrap();
    engine.set(b"k", b"v2").unwrap();
    engine.force_flush().unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn memtable_value_shadows_an_older_flushed_sstable_value() {
    let dir = tempdir().unwrap();
    let mut engine = Engine::open_default(dir.path()).unwrap();

    engine.set(b"k", b"from-sstable").unwrap();
    engine.force_flush().unwrap();
    engine.set(b"k", b"from-memtable").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"from-memtable".to_vec()));
}
