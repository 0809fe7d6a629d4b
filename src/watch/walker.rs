// src/watch/walker.rs

//! One full walk of the watched tree.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::errors::{PollwatchError, Result};
use crate::fs::{EntryStamp, FileSystem};
use crate::types::ReadErrorPolicy;

/// Everything one walk observed.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Every non-hidden entry below the root (the root itself excluded).
    pub entries: HashMap<PathBuf, EntryStamp>,
    /// Paths that could not be read under `ReadErrorPolicy::Skip`. Whatever
    /// was known below them last cycle is still considered current.
    pub skipped: Vec<PathBuf>,
}

/// Entries whose file name starts with `.` are never walked or recorded.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Walk `root` with an explicit worklist.
///
/// Symlinks are recorded but never descended into, so link cycles cannot
/// make the walk loop. An entry that disappears between being listed and
/// being stat'ed is dropped silently; it simply isn't part of this walk.
pub fn walk_tree(fs: &dyn FileSystem, root: &Path, on_error: ReadErrorPolicy) -> Result<WalkOutcome> {
    let mut outcome = WalkOutcome::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(e) if dir != root && e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?dir, "directory vanished during walk");
                continue;
            }
            Err(e) => {
                handle_read_error(&mut outcome, on_error, dir, e)?;
                continue;
            }
        };

        for child in children {
            if is_hidden(&child) {
                trace!(path = ?child, "skipping hidden entry");
                continue;
            }

            let stamp = match fs.symlink_metadata(&child) {
                Ok(stamp) => stamp,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = ?child, "entry vanished during walk");
                    continue;
                }
                Err(e) => {
                    handle_read_error(&mut outcome, on_error, child, e)?;
                    continue;
                }
            };

            if stamp.is_dir() {
                pending.push(child.clone());
            }
            outcome.entries.insert(child, stamp);
        }
    }

    Ok(outcome)
}

fn handle_read_error(
    outcome: &mut WalkOutcome,
    on_error: ReadErrorPolicy,
    path: PathBuf,
    source: io::Error,
) -> Result<()> {
    match on_error {
        ReadErrorPolicy::Fail => Err(PollwatchError::Walk { path, source }),
        ReadErrorPolicy::Skip => {
            warn!(path = ?path, error = %source, "cannot read entry; keeping its last known state");
            outcome.skipped.push(path);
            Ok(())
        }
    }
}
