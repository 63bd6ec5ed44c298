use tempfile::tempdir;

use super::helpers::{count_log_files, count_sst_files};
use crate::Engine;

#[test]
fn unflushed_writes_survive_a_restart_via_wal_replay() {
    let dir = tempdir().unwrap();
    {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        engine.set(b"a", b"1").unwrap();
        engine.set(b"b", b"2").unwrap();
        engine.delete(b"a").unwrap();
    }

    let engine = Engine::open_default(dir.path()).unwrap();
    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn flushed_data_survives_a_restart_via_sstables() {
    let dir = tempdir().unwrap();
    {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        engine.set(b"k", b"v").unwrap();
        engine.force_flush().unwrap();
    }

    let engine = Engine::open_default(dir.path()).unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn recovery_combines_flushed_sstables_and_a_replayed_wal() {
    let dir = tempdir().unwrap();
    {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        engine.set(b"flushed", b"in_sst").unwrap();
        engine.force_flush().unwrap();
    }
    {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        engine.set(b"in_wal", b"pending").unwrap();
    }

    let engine = Engine::open_default(dir.path()).unwrap();
    assert_eq!(engine.get(b"flushed").unwrap(), Some(b"in_sst".to_vec()));
    assert_eq!(engine.get(b"in_wal").unwrap(), Some(b"pending".to_vec()));
}

#[test]
fn replaying_a_wal_consumes_it_and_starts_a_fresh_segment() {
    let dir = tempdir().unwrap();
    {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        engine.set(b"k", b"v").unwrap();
    }
    assert_eq!(count_log_files(dir.path()), 1);

    let _engine = Engine::open_default(dir.path()).unwrap();
    // The replayed segment is deleted once its data is durable on disk,
    // leaving only the fresh segment opened for live writes.
    assert_eq!(count_log_files(dir.path()), 1);
}

#[test]
fn repeated_restarts_with_writes_in_between_preserve_every_key() {
    let dir = tempdir().unwrap();
    for i in 0..5u32 {
        let mut engine = Engine::open_default(dir.path()).unwrap();
        let key = format!("k{i}");
        engine.set(key.as_bytes(), format!("v{i}").as_bytes()).unwrap();
    }

    let engine = Engine::open_default(dir.path()).unwrap();
    for i in 0..5u32 {
        let key = format!("k{i}");
        assert_eq!(
            engine.get(key.as_bytes()).unwrap(),
            Some(format!("v{i}").into_bytes())
        );
    }
    assert!(count_sst_files(dir.path()) >= 1);
}
