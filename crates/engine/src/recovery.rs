//! Cold-start recovery: replaying WAL segments left behind by a prior run
//! and reconstructing the engine's in-memory state before it accepts new
//! writes.
//!
//! Each WAL segment is replayed independently, oldest file number first.
//! Within one segment the reconstructed memtable is itself rotated whenever
//! it would overflow, exactly as it would have been during the original
//! write path; once the segment is fully replayed its memtables (including
//! the last, possibly partial one) are flushed to SSTable and the segment's
//! file is deleted, since its data is now durable on disk in SSTable form.
//! A fresh WAL segment and an empty active memtable are created last, so the
//! engine is ready for live writes the moment recovery returns.

use std::collections::VecDeque;
use std::path::Path;

use memtable::Memtable;
use storage::{FileMetadata, Provider, Value};
use tracing::info;
use wal::{WalReader, WalWriter};

use crate::{Engine, EngineConfig, EngineError};

pub(crate) fn open<P: AsRef<Path>>(data_dir: P, config: EngineConfig) -> Result<Engine, EngineError> {
    let mut provider = Provider::new(data_dir)?;
    let files = provider.list_files()?;

    let mut sstables: Vec<FileMetadata> = files.iter().copied().filter(|f| f.is_sstable()).collect();
    let wal_segments: Vec<FileMetadata> = files.into_iter().filter(|f| f.is_wal()).collect();

    let mut queue: VecDeque<Memtable> = VecDeque::new();

    for segment in wal_segments {
        info!(file_num = segment.file_num(), "replaying wal segment");
        replay_segment(&mut provider, segment, &config, &mut queue)?;
        flush_all(&mut provider, &mut queue, &mut sstables)?;
        provider.delete_file(segment)?;
    }

    let wal_file = provider.prepare_new_wal_file();
    let file = provider.open_for_writing(wal_file)?;
    let wal = WalWriter::new(file);
    queue.push_back(Memtable::new(config.memtable_size_limit, wal_file));

    Ok(Engine {
        provider,
        config,
        wal,
        wal_file,
        queue,
        sstables,
    })
}

fn replay_segment(
    provider: &mut Provider,
    segment: FileMetadata,
    config: &EngineConfig,
    queue: &mut VecDeque<Memtable>,
) -> Result<(), EngineError> {
    let file = provider.open_for_reading(segment)?;
    let mut reader = WalReader::open(file);
    let mut current = Memtable::new(config.memtable_size_limit, segment);

    reader.replay(|key, value| match value {
        Value::Set(val) => {
            if !current.has_room_for_write(&key, &val) {
                let full = std::mem::replace(&mut current, Memtable::new(config.memtable_size_limit, segment));
                queue.push_back(full);
            }
            current.insert(&key, &val);
        }
        Value::Delete => {
            if !current.has_room_for_write(&key, &[]) {
                let full = std::mem::replace(&mut current, Memtable::new(config.memtable_size_limit, segment));
                queue.push_back(full);
            }
            current.insert_tombstone(&key);
        }
    })?;

    // Force a final rotation: the memtable just replayed must not linger as
    // the engine's live active memtable once this segment's WAL is deleted.
    queue.push_back(current);
    Ok(())
}

/// Flushes every queued memtable to SSTable, oldest first, leaving `queue`
/// empty. Skips memtables that never received a write.
fn flush_all(
    provider: &mut Provider,
    queue: &mut VecDeque<Memtable>,
    sstables: &mut Vec<FileMetadata>,
) -> Result<(), EngineError> {
    while let Some(mem) = queue.pop_front() {
        if mem.is_empty() {
            continue;
        }
        let sst_file = provider.prepare_new_sst_file();
        let path = provider.path_for(sst_file);
        info!(file_num = sst_file.file_num(), "recovery flush to sstable");
        let mut writer = sstable::SSTableWriter::create(&path)?;
        writer.process(mem.iter())?;
        writer.close()?;
        sstables.push(sst_file);
    }
    Ok(())
}
