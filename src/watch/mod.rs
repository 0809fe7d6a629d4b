// src/watch/mod.rs

//! Polling change detection.
//!
//! This module is responsible for:
//! - Walking the watched tree without recursion, skipping hidden entries.
//! - Diffing each walk against the previous one by size/mtime.
//! - Posting at most one best-effort notification per poll cycle.
//!
//! It does **not** know about processes; its only output is the
//! notification channel.

pub mod detector;
pub mod notifier;
pub mod snapshot;
pub mod walker;

pub use detector::{ChangeDetector, CycleReport, PollingDetector};
pub use notifier::{notification_channel, Notifier, PostOutcome};
pub use snapshot::{Change, Snapshot};
pub use walker::{is_hidden, walk_tree, WalkOutcome};
