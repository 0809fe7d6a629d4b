// src/watch/snapshot.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fs::EntryStamp;
use crate::watch::walker::WalkOutcome;

/// A difference between two consecutive walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl Change {
    pub fn path(&self) -> &Path {
        match self {
            Change::Added(p) | Change::Modified(p) | Change::Removed(p) => p,
        }
    }
}

/// Last-seen stamp of every watched entry.
///
/// After each [`Snapshot::apply`] the snapshot holds exactly what the walk
/// saw (plus the retained state of skipped subtrees), so it never grows with
/// deleted paths.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: HashMap<PathBuf, EntryStamp>,
}

impl Snapshot {
    pub fn from_walk(outcome: WalkOutcome) -> Self {
        Self {
            entries: outcome.entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&EntryStamp> {
        self.entries.get(path)
    }

    /// Replace the snapshot with a fresh walk and return what changed.
    pub fn apply(&mut self, outcome: WalkOutcome) -> Vec<Change> {
        let WalkOutcome {
            entries: mut fresh,
            skipped,
        } = outcome;
        let mut changes = Vec::new();

        for (path, stamp) in &fresh {
            match self.entries.get(path) {
                None => changes.push(Change::Added(path.clone())),
                Some(prev) if differs(prev, stamp) => changes.push(Change::Modified(path.clone())),
                Some(_) => {}
            }
        }

        for (path, prev) in self.entries.drain() {
            if fresh.contains_key(&path) {
                continue;
            }
            if skipped.iter().any(|s| path.starts_with(s)) {
                fresh.insert(path, prev);
            } else {
                changes.push(Change::Removed(path));
            }
        }

        self.entries = fresh;
        changes
    }
}

/// Directories compare by presence only. Their own mtime moves whenever any
/// child, hidden ones included, is added or removed, and visible children are
/// diffed on their own.
fn differs(prev: &EntryStamp, cur: &EntryStamp) -> bool {
    if prev.kind != cur.kind {
        return true;
    }
    if cur.is_dir() {
        return false;
    }
    prev.size != cur.size || prev.modified != cur.modified
}
