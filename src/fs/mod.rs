// src/fs/mod.rs

//! Filesystem access used by the change detector.
//!
//! The detector only ever lists directories and `lstat`s entries, so the
//! trait is that small. [`mock::MockFileSystem`] implements it in memory with
//! a controllable clock and injectable read failures.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod mock;

/// What kind of node an entry is. Symlinks are never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// The part of an entry's metadata the detector compares between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStamp {
    pub kind: EntryKind,
    pub size: u64,
    pub modified: SystemTime,
}

impl EntryStamp {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Return the entries of a directory as full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Metadata of `path` without following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryStamp>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryStamp> {
        let meta = fs::symlink_metadata(path)?;
        let ft = meta.file_type();
        let kind = if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        // Some platforms/filesystems cannot report mtime; size still works.
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(EntryStamp {
            kind,
            size: meta.len(),
            modified,
        })
    }
}
