//! On-disk file naming and lifecycle for the database's data directory.
//!
//! All durable state lives as numbered files directly inside the data
//! directory: `%06d.sst` for SSTables and `%06d.log` for WAL segments,
//! drawn from a single counter shared by both file kinds. The [`Provider`]
//! is the only thing in the engine that touches file names or raw paths;
//! every other component speaks in terms of [`FileMetadata`].

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced by the storage provider.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A file in the data directory did not match the `%06d.<ext>` naming
    /// scheme.
    #[error("malformed file name: {0}")]
    MalformedFileName(String),
}

/// What kind of file a [`FileMetadata`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// A file extension other than `sst` or `log`. Files of this type are
    /// listed but ignored by the database.
    Unknown,
    /// A `%06d.sst` SSTable file.
    SsTable,
    /// A `%06d.log` WAL segment file.
    Wal,
}

/// Identifies a single file in the data directory by number and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    file_num: u32,
    file_type: FileType,
}

impl FileMetadata {
    /// The file's number (shared counter across SSTables and WAL segments).
    pub fn file_num(&self) -> u32 {
        self.file_num
    }

    /// The file's type.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// `true` if this file is an SSTable.
    pub fn is_sstable(&self) -> bool {
        self.file_type == FileType::SsTable
    }

    /// `true` if this file is a WAL segment.
    pub fn is_wal(&self) -> bool {
        self.file_type == FileType::Wal
    }
}

/// Owns the data directory and hands out file handles by [`FileMetadata`].
pub struct Provider {
    data_dir: PathBuf,
    file_num: u32,
}

impl Provider {
    /// Opens (creating if necessary) the data directory at `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            file_num: 0,
        })
    }

    /// The data directory this provider manages.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Lists every file in the data directory, parsed into [`FileMetadata`]
    /// and sorted ascending by file number.
    ///
    /// Also advances the internal file-number counter past the highest
    /// number observed, so that subsequently prepared files never collide
    /// with files already on disk.
    pub fn list_files(&mut self) -> Result<Vec<FileMetadata>, StorageError> {
        let mut meta = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let (num_part, ext) = name
                .split_once('.')
                .ok_or_else(|| StorageError::MalformedFileName(name.to_string()))?;
            let file_num: u32 = num_part
                .parse()
                .map_err(|_| StorageError::MalformedFileName(name.to_string()))?;
            let file_type = match ext {
                "sst" => FileType::SsTable,
                "log" => FileType::Wal,
                _ => FileType::Unknown,
            };
            if file_num >= self.file_num {
                self.file_num = file_num;
            }
            meta.push(FileMetadata {
                file_num,
                file_type,
            });
        }
        meta.sort_by_key(|m| m.file_num);
        Ok(meta)
    }

    fn next_file_num(&mut self) -> u32 {
        self.file_num += 1;
        self.file_num
    }

    fn file_name(&self, meta: FileMetadata) -> String {
        match meta.file_type {
            FileType::SsTable => format!("{:06}.sst", meta.file_num),
            FileType::Wal => format!("{:06}.log", meta.file_num),
            FileType::Unknown => unreachable!("a file is never prepared with an unknown type"),
        }
    }

    /// Returns the full filesystem path for `meta`, following the
    /// `%06d.sst` / `%06d.log` naming scheme.
    pub fn path_for(&self, meta: FileMetadata) -> PathBuf {
        self.data_dir.join(self.file_name(meta))
    }

    /// Reserves the next file number for a new SSTable.
    pub fn prepare_new_sst_file(&mut self) -> FileMetadata {
        FileMetadata {
            file_num: self.next_file_num(),
            file_type: FileType::SsTable,
        }
    }

    /// Reserves the next file number for a new WAL segment.
    pub fn prepare_new_wal_file(&mut self) -> FileMetadata {
        FileMetadata {
            file_num: self.next_file_num(),
            file_type: FileType::Wal,
        }
    }

    /// Opens `meta` for writing. Fails if the file already exists — callers
    /// must go through [`Provider::prepare_new_sst_file`] or
    /// [`Provider::prepare_new_wal_file`] first.
    pub fn open_for_writing(&self, meta: FileMetadata) -> Result<File, StorageError> {
        let path = self.data_dir.join(self.file_name(meta));
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?)
    }

    /// Opens `meta` for reading.
    pub fn open_for_reading(&self, meta: FileMetadata) -> Result<File, StorageError> {
        let path = self.data_dir.join(self.file_name(meta));
        Ok(File::open(path)?)
    }

    /// Deletes `meta`'s file. Idempotent: a missing file is not an error.
    pub fn delete_file(&self, meta: FileMetadata) -> Result<(), StorageError> {
        let path = self.data_dir.join(self.file_name(meta));
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn prepares_sequential_file_numbers_across_types() {
        let dir = tempdir().unwrap();
        let mut p = Provider::new(dir.path()).unwrap();
        let wal1 = p.prepare_new_wal_file();
        let sst1 = p.prepare_new_sst_file();
        let wal2 = p.prepare_new_wal_file();
        assert_eq!(wal1.file_num(), 1);
        assert_eq!(sst1.file_num(), 2);
        assert_eq!(wal2.file_num(), 3);
    }

    #[test]
    fn list_files_sorts_ascending_and_resumes_the_counter() {
        let dir = tempdir().unwrap();
        {
            let mut p = Provider::new(dir.path()).unwrap();
            let a = p.prepare_new_wal_file();
            let b = p.prepare_new_sst_file();
            p.open_for_writing(a).unwrap();
            p.open_for_writing(b).unwrap();
        }
        let mut p = Provider::new(dir.path()).unwrap();
        let files = p.list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_num(), 1);
        assert!(files[0].is_wal());
        assert_eq!(files[1].file_num(), 2);
        assert!(files[1].is_sstable());

        let next = p.prepare_new_sst_file();
        assert_eq!(next.file_num(), 3);
    }

    #[test]
    fn unknown_extensions_are_listed_but_untyped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("000001.tmp"), b"junk").unwrap();
        let mut p = Provider::new(dir.path()).unwrap();
        let files = p.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(!files[0].is_sstable());
        assert!(!files[0].is_wal());
    }

    #[test]
    fn open_for_writing_fails_if_the_file_already_exists() {
        let dir = tempdir().unwrap();
        let mut p = Provider::new(dir.path()).unwrap();
        let meta = p.prepare_new_sst_file();
        p.open_for_writing(meta).unwrap();
        assert!(p.open_for_writing(meta).is_err());
    }

    #[test]
    fn delete_file_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut p = Provider::new(dir.path()).unwrap();
        let meta = p.prepare_new_sst_file();
        p.open_for_writing(meta).unwrap();
        p.delete_file(meta).unwrap();
        p.delete_file(meta).unwrap();
    }
}
