// src/watch/notifier.rs

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Result of posting a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// The slot was empty; the supervisor will see this notification.
    Delivered,
    /// A notification is already pending; this one folds into it.
    Coalesced,
    /// Nobody is listening any more.
    Closed,
}

/// Sending half of the single-slot notification channel.
///
/// Posting never blocks and never spawns: when the slot is full the
/// supervisor has not consumed the previous signal yet, and that signal
/// already means "something changed".
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<()>,
}

/// Create the notification channel shared by detector and supervisor.
pub fn notification_channel() -> (Notifier, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (Notifier { tx }, rx)
}

impl Notifier {
    pub fn post(&self) -> PostOutcome {
        match self.tx.try_send(()) {
            Ok(()) => PostOutcome::Delivered,
            Err(TrySendError::Full(())) => PostOutcome::Coalesced,
            Err(TrySendError::Closed(())) => PostOutcome::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
