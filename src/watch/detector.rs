// src/watch/detector.rs

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::WatchConfig;
use crate::errors::{PollwatchError, Result};
use crate::fs::FileSystem;
use crate::types::{DeletionPolicy, ReadErrorPolicy};
use crate::watch::notifier::{Notifier, PostOutcome};
use crate::watch::snapshot::{Change, Snapshot};
use crate::watch::walker::{walk_tree, WalkOutcome};

/// Source of change notifications.
///
/// The supervisor only ever sees the notification channel, so a native
/// filesystem-event implementation can replace [`PollingDetector`] without
/// touching it.
pub trait ChangeDetector: Send + 'static {
    /// Establish the baseline. Failing here is fatal for the whole process.
    /// Returns the number of entries being watched.
    fn prime(&mut self) -> Result<usize>;

    /// Watch until `cancel` fires, posting to `notifier` after changes.
    fn run(
        self,
        cancel: CancellationToken,
        notifier: Notifier,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Summary of one poll cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub changes: Vec<Change>,
    /// How many of `changes` count as a reason to restart.
    pub triggering: usize,
    /// `None` when nothing triggering happened and no post was attempted.
    pub notified: Option<PostOutcome>,
}

/// Change detector that re-walks the tree every `interval`.
#[derive(Debug)]
pub struct PollingDetector {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    interval: Duration,
    deletion: DeletionPolicy,
    read_errors: ReadErrorPolicy,
    snapshot: Snapshot,
    primed: bool,
}

impl PollingDetector {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            fs,
            root: root.into(),
            interval,
            deletion: DeletionPolicy::default(),
            read_errors: ReadErrorPolicy::default(),
            snapshot: Snapshot::default(),
            primed: false,
        }
    }

    pub fn from_config(cfg: &WatchConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self::new(fs, cfg.root.clone(), cfg.interval)
            .with_deletion_policy(cfg.deletion)
            .with_read_error_policy(cfg.read_errors)
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion = policy;
        self
    }

    pub fn with_read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.read_errors = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Run one cycle synchronously on the calling thread.
    pub fn poll_once(&mut self, notifier: &Notifier) -> Result<CycleReport> {
        let outcome = walk_tree(self.fs.as_ref(), &self.root, self.read_errors)?;
        Ok(self.finish_cycle(outcome, notifier))
    }

    /// Run one cycle with the walk on the blocking pool.
    async fn poll_cycle(&mut self, notifier: &Notifier) -> Result<CycleReport> {
        let outcome = self.walk_blocking(self.read_errors).await?;
        Ok(self.finish_cycle(outcome, notifier))
    }

    async fn walk_blocking(&self, policy: ReadErrorPolicy) -> Result<WalkOutcome> {
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || walk_tree(fs.as_ref(), &root, policy))
            .await
            .map_err(|e| PollwatchError::Other(e.into()))?
    }

    fn set_baseline(&mut self, outcome: WalkOutcome) -> usize {
        self.snapshot = Snapshot::from_walk(outcome);
        self.primed = true;
        debug!(entries = self.snapshot.len(), "initial snapshot taken");
        self.snapshot.len()
    }

    fn finish_cycle(&mut self, outcome: WalkOutcome, notifier: &Notifier) -> CycleReport {
        let changes = self.snapshot.apply(outcome);
        let triggering = changes.iter().filter(|c| self.is_triggering(c)).count();

        for change in &changes {
            debug!(?change, "entry changed");
        }

        // One post per cycle, however many entries changed.
        let notified = if triggering > 0 {
            let res = notifier.post();
            info!(changed = triggering, outcome = ?res, "change detected");
            Some(res)
        } else {
            None
        };

        CycleReport {
            changes,
            triggering,
            notified,
        }
    }

    fn is_triggering(&self, change: &Change) -> bool {
        match change {
            Change::Added(_) | Change::Modified(_) => true,
            Change::Removed(_) => self.deletion == DeletionPolicy::Restart,
        }
    }

    async fn run_loop(mut self, cancel: CancellationToken, notifier: Notifier) -> Result<()> {
        if !self.primed {
            let outcome = self
                .walk_blocking(ReadErrorPolicy::Fail)
                .await
                .map_err(initial_walk_error)?;
            self.set_baseline(outcome);
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the baseline is already fresh.
        ticker.tick().await;

        info!(root = ?self.root, interval = ?self.interval, "change detector started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.poll_cycle(&notifier).await?;
            if report.notified == Some(PostOutcome::Closed) || notifier.is_closed() {
                debug!("notification receiver gone; stopping detector");
                break;
            }
        }

        info!("change detector stopped");
        Ok(())
    }
}

impl ChangeDetector for PollingDetector {
    fn prime(&mut self) -> Result<usize> {
        let outcome = walk_tree(self.fs.as_ref(), &self.root, ReadErrorPolicy::Fail)
            .map_err(initial_walk_error)?;
        Ok(self.set_baseline(outcome))
    }

    fn run(
        self,
        cancel: CancellationToken,
        notifier: Notifier,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(self.run_loop(cancel, notifier))
    }
}

fn initial_walk_error(e: PollwatchError) -> PollwatchError {
    match e {
        PollwatchError::Walk { path, source } => PollwatchError::InitialWalk { path, source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::watch::notifier::notification_channel;

    fn detector(fs: &MockFileSystem) -> PollingDetector {
        PollingDetector::new(Arc::new(fs.clone()), "/proj", Duration::from_millis(10))
    }

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj");
        fs.write_file("/proj/go.mod", 30);
        fs
    }

    #[tokio::test]
    async fn static_tree_never_notifies() {
        let fs = project();
        let (notifier, mut rx) = notification_channel();
        let mut det = detector(&fs);
        assert_eq!(det.prime().unwrap(), 1);

        for _ in 0..5 {
            let report = det.poll_once(&notifier).unwrap();
            assert!(report.changes.is_empty());
            assert_eq!(report.notified, None);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn burst_in_one_cycle_posts_once() {
        let fs = project();
        let (notifier, mut rx) = notification_channel();
        let mut det = detector(&fs);
        det.prime().unwrap();

        fs.write_file("/proj/a.go", 1);
        fs.write_file("/proj/b.go", 2);
        fs.write_file("/proj/go.mod", 31);

        let report = det.poll_once(&notifier).unwrap();
        assert_eq!(report.triggering, 3);
        assert_eq!(report.notified, Some(PostOutcome::Delivered));

        assert_eq!(rx.recv().await, Some(()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unconsumed_notification_coalesces_later_cycles() {
        let fs = project();
        let (notifier, mut rx) = notification_channel();
        let mut det = detector(&fs);
        det.prime().unwrap();

        fs.write_file("/proj/a.go", 1);
        det.poll_once(&notifier).unwrap();
        fs.write_file("/proj/b.go", 1);
        let report = det.poll_once(&notifier).unwrap();
        assert_eq!(report.notified, Some(PostOutcome::Coalesced));

        assert_eq!(rx.recv().await, Some(()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn hidden_churn_is_invisible() {
        let fs = project();
        fs.write_file("/proj/.git/HEAD", 10);
        let (notifier, _rx) = notification_channel();
        let mut det = detector(&fs);
        det.prime().unwrap();

        fs.touch("/proj/.git/HEAD");
        fs.write_file("/proj/.git/index", 99);
        fs.write_file("/proj/.env", 3);
        fs.touch("/proj");

        let report = det.poll_once(&notifier).unwrap();
        assert!(report.changes.is_empty());
    }

    #[tokio::test]
    async fn deletion_policy_decides_whether_removals_trigger() {
        let fs = project();
        let (notifier, mut rx) = notification_channel();

        let mut ignoring = detector(&fs).with_deletion_policy(DeletionPolicy::Ignore);
        ignoring.prime().unwrap();
        let mut restarting = detector(&fs).with_deletion_policy(DeletionPolicy::Restart);
        restarting.prime().unwrap();

        fs.remove("/proj/go.mod");

        let report = ignoring.poll_once(&notifier).unwrap();
        assert_eq!(report.changes, vec![Change::Removed(PathBuf::from("/proj/go.mod"))]);
        assert_eq!(report.notified, None);
        assert!(ignoring.snapshot().is_empty());
        assert!(rx.try_recv().is_err());

        let report = restarting.poll_once(&notifier).unwrap();
        assert_eq!(report.notified, Some(PostOutcome::Delivered));
        assert!(restarting.snapshot().is_empty());
    }

    #[tokio::test]
    async fn recreated_file_counts_as_added() {
        let fs = project();
        let (notifier, _rx) = notification_channel();
        let mut det = detector(&fs).with_deletion_policy(DeletionPolicy::Ignore);
        det.prime().unwrap();

        fs.remove("/proj/go.mod");
        det.poll_once(&notifier).unwrap();
        fs.write_file("/proj/go.mod", 30);

        let report = det.poll_once(&notifier).unwrap();
        assert_eq!(report.changes, vec![Change::Added(PathBuf::from("/proj/go.mod"))]);
    }

    #[tokio::test]
    async fn unreadable_subtree_under_skip_policy() {
        let fs = project();
        fs.write_file("/proj/pkg/util.go", 5);
        let (notifier, _rx) = notification_channel();
        let mut det = detector(&fs).with_read_error_policy(ReadErrorPolicy::Skip);
        det.prime().unwrap();

        fs.deny_reads("/proj/pkg");
        let report = det.poll_once(&notifier).unwrap();
        assert!(report.changes.is_empty());
        assert!(det.snapshot().get(Path::new("/proj/pkg/util.go")).is_some());

        fs.allow_reads("/proj/pkg");
        fs.write_file("/proj/pkg/util.go", 6);
        let report = det.poll_once(&notifier).unwrap();
        assert_eq!(report.changes, vec![Change::Modified(PathBuf::from("/proj/pkg/util.go"))]);
    }

    #[tokio::test]
    async fn unreadable_subtree_under_fail_policy() {
        let fs = project();
        fs.add_dir("/proj/pkg");
        let (notifier, _rx) = notification_channel();
        let mut det = detector(&fs).with_read_error_policy(ReadErrorPolicy::Fail);
        det.prime().unwrap();

        fs.deny_reads("/proj/pkg");
        assert!(matches!(
            det.poll_once(&notifier),
            Err(PollwatchError::Walk { .. })
        ));
    }

    #[test]
    fn prime_failure_is_initial_walk_error() {
        let fs = MockFileSystem::new();
        let mut det = detector(&fs);
        assert!(matches!(det.prime(), Err(PollwatchError::InitialWalk { .. })));

        let fs = project();
        fs.deny_reads("/proj");
        // Even the skip policy cannot rescue a first walk.
        let mut det = detector(&fs).with_read_error_policy(ReadErrorPolicy::Skip);
        assert!(matches!(det.prime(), Err(PollwatchError::InitialWalk { .. })));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let fs = project();
        let (notifier, _rx) = notification_channel();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(detector(&fs).run(cancel.clone(), notifier));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        let res = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(res, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn run_stops_when_receiver_dropped() {
        let fs = project();
        let (notifier, rx) = notification_channel();
        drop(rx);

        let res = tokio::time::timeout(
            Duration::from_secs(1),
            detector(&fs).run(CancellationToken::new(), notifier),
        )
        .await;
        assert!(matches!(res, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn unprimed_run_takes_its_own_baseline() {
        let fs = project();
        let (notifier, mut rx) = notification_channel();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(detector(&fs).run(cancel.clone(), notifier));

        // The existing tree is the baseline, not a change.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());

        fs.write_file("/proj/main.go", 12);
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert_eq!(got, Ok(Some(())));

        cancel.cancel();
        let res = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(res, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn unprimed_run_on_missing_root_is_initial_walk_error() {
        let fs = MockFileSystem::new();
        let (notifier, _rx) = notification_channel();

        let res = tokio::time::timeout(
            Duration::from_secs(1),
            detector(&fs).run(CancellationToken::new(), notifier),
        )
        .await;
        assert!(matches!(res, Ok(Err(PollwatchError::InitialWalk { .. }))));
    }
}
