// src/fs/mock.rs

use super::{EntryKind, EntryStamp, FileSystem};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Default)]
struct MockState {
    nodes: BTreeMap<PathBuf, EntryStamp>,
    unreadable: HashSet<PathBuf>,
    /// Logical clock; every mutation gets a strictly later mtime.
    tick: u64,
}

impl MockState {
    fn now(&mut self) -> SystemTime {
        self.tick += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.tick)
    }

    fn ensure_dirs(&mut self, path: &Path) {
        let mut missing = Vec::new();
        let mut cur = path.parent();
        while let Some(dir) = cur {
            if dir.as_os_str().is_empty() || self.nodes.contains_key(dir) {
                break;
            }
            missing.push(dir.to_path_buf());
            cur = dir.parent();
        }
        for dir in missing.into_iter().rev() {
            let modified = self.now();
            self.nodes.insert(
                dir,
                EntryStamp {
                    kind: EntryKind::Dir,
                    size: 0,
                    modified,
                },
            );
        }
    }
}

/// In-memory filesystem for detector tests.
///
/// Parent directories are created implicitly. Cloning shares state, so a test
/// can keep a handle and mutate the tree while a detector owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.ensure_dirs(path);
        let modified = state.now();
        state.nodes.insert(
            path.to_path_buf(),
            EntryStamp {
                kind: EntryKind::Dir,
                size: 0,
                modified,
            },
        );
    }

    /// Create or overwrite a file with the given size.
    pub fn write_file(&self, path: impl AsRef<Path>, size: u64) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.ensure_dirs(path);
        let modified = state.now();
        state.nodes.insert(
            path.to_path_buf(),
            EntryStamp {
                kind: EntryKind::File,
                size,
                modified,
            },
        );
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.ensure_dirs(path);
        let modified = state.now();
        state.nodes.insert(
            path.to_path_buf(),
            EntryStamp {
                kind: EntryKind::Symlink,
                size: 0,
                modified,
            },
        );
    }

    /// Bump the mtime of an existing entry, keeping its size.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        let modified = state.now();
        if let Some(node) = state.nodes.get_mut(path.as_ref()) {
            node.modified = modified;
        }
    }

    /// Remove an entry and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.nodes.retain(|p, _| !p.starts_with(path));
    }

    /// Make `read_dir` on `path` fail with `PermissionDenied`.
    pub fn deny_reads(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.unreadable.insert(path.as_ref().to_path_buf());
    }

    pub fn allow_reads(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.unreadable.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        if state.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        match state.nodes.get(path) {
            Some(node) if node.is_dir() => Ok(state
                .nodes
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            Some(_) => Err(io::Error::other(format!("not a directory: {:?}", path))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not found: {:?}", path),
            )),
        }
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryStamp> {
        let state = self.state.lock().unwrap();
        state.nodes.get(path).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("not found: {:?}", path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_parents_and_listing() {
        let fs = MockFileSystem::new();
        fs.add_dir("/root");
        fs.write_file("/root/src/main.rs", 10);

        let listed = fs.read_dir(Path::new("/root")).unwrap();
        assert_eq!(listed, vec![PathBuf::from("/root/src")]);
        assert!(fs.symlink_metadata(Path::new("/root/src")).unwrap().is_dir());
        assert_eq!(fs.symlink_metadata(Path::new("/root/src/main.rs")).unwrap().size, 10);
    }

    #[test]
    fn touch_moves_mtime_forward() {
        let fs = MockFileSystem::new();
        fs.write_file("/r/a", 1);
        let before = fs.symlink_metadata(Path::new("/r/a")).unwrap();
        fs.touch("/r/a");
        let after = fs.symlink_metadata(Path::new("/r/a")).unwrap();
        assert!(after.modified > before.modified);
        assert_eq!(after.size, before.size);
    }

    #[test]
    fn denied_and_removed() {
        let fs = MockFileSystem::new();
        fs.write_file("/r/d/x", 1);
        fs.deny_reads("/r/d");
        assert_eq!(
            fs.read_dir(Path::new("/r/d")).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        fs.allow_reads("/r/d");
        assert!(fs.read_dir(Path::new("/r/d")).is_ok());

        fs.remove("/r/d");
        assert_eq!(
            fs.symlink_metadata(Path::new("/r/d/x")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
