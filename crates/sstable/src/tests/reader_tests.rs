use memtable::Memtable;
use storage::{FileMetadata, Value};
use tempfile::tempdir;

use crate::{SSTableReader, SSTableWriter};

fn wal_meta() -> FileMetadata {
    let dir = tempdir().unwrap();
    let mut provider = storage::Provider::new(dir.path()).unwrap();
    provider.prepare_new_wal_file()
}

fn write_sstable(path: &std::path::Path, entries: &[(&str, &str)]) {
    let mut mem = Memtable::new(1 << 20, wal_meta());
    for (k, v) in entries {
        mem.insert(k.as_bytes(), v.as_bytes());
    }
    let mut w = SSTableWriter::create(path).unwrap();
    w.process(mem.iter()).unwrap();
    w.close().unwrap();
}

#[test]
fn reads_back_every_written_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");
    write_sstable(&path, &[("apple", "red"), ("banana", "yellow"), ("cherry", "dark red")]);

    let mut r = SSTableReader::open(&path).unwrap();
    assert_eq!(r.get(b"apple").unwrap(), Some(Value::Set(b"red".to_vec())));
    assert_eq!(r.get(b"banana").unwrap(), Some(Value::Set(b"yellow".to_vec())));
    assert_eq!(r.get(b"cherry").unwrap(), Some(Value::Set(b"dark red".to_vec())));
}

#[test]
fn missing_key_smaller_than_max_key_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");
    write_sstable(&path, &[("b", "2"), ("d", "4")]);

    let mut r = SSTableReader::open(&path).unwrap();
    assert_eq!(r.get(b"a").unwrap(), None);
    assert_eq!(r.get(b"c").unwrap(), None);
}

#[test]
fn key_greater_than_max_key_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");
    write_sstable(&path, &[("a", "1"), ("m", "13")]);

    let mut r = SSTableReader::open(&path).unwrap();
    assert_eq!(r.get(b"z").unwrap(), None);
}

#[test]
fn tombstones_round_trip_through_an_sstable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");

    let mut mem = Memtable::new(1 << 20, wal_meta());
    mem.insert(b"x", b"1");
    mem.insert_tombstone(b"x");
    let mut w = SSTableWriter::create(&path).unwrap();
    w.process(mem.iter()).unwrap();
    w.close().unwrap();

    let mut r = SSTableReader::open(&path).unwrap();
    assert_eq!(r.get(b"x").unwrap(), Some(Value::Delete));
}

#[test]
fn many_keys_spanning_several_data_blocks_are_all_reachable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");

    let mut mem = Memtable::new(1 << 20, wal_meta());
    let mut keys: Vec<String> = (0..5000).map(|i| format!("key-{i:06}")).collect();
    keys.sort();
    for k in &keys {
        mem.insert(k.as_bytes(), b"v");
    }
    let mut w = SSTableWriter::create(&path).unwrap();
    w.process(mem.iter()).unwrap();
    w.close().unwrap();

    let mut r = SSTableReader::open(&path).unwrap();
    for k in &keys {
        assert_eq!(r.get(k.as_bytes()).unwrap(), Some(Value::Set(b"v".to_vec())), "missing {k}");
    }
    assert_eq!(r.get(b"not-a-key").unwrap(), None);
}
