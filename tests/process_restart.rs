// tests/process_restart.rs
//
// Full run with real processes: the command appends a line to a log file
// outside the watched tree, then sleeps until it is stopped.

#![cfg(unix)]

mod common;
use crate::common::builders::{TreeBuilder, WatchConfigBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::{sleep, timeout, Duration};
use tokio_util::sync::CancellationToken;

use pollwatch::config::CommandSpec;
use pollwatch::exec::ProcessRunner;
use pollwatch::fs::RealFileSystem;
use pollwatch::run_with;
use pollwatch::watch::PollingDetector;

type TestResult = Result<(), Box<dyn Error>>;

fn launches_logged(log: &Path) -> usize {
    fs::read_to_string(log)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

async fn wait_for_lines(log: &Path, n: usize) {
    timeout(Duration::from_secs(5), async {
        while launches_logged(log) < n {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {n} launches, saw {}", launches_logged(log)));
}

#[tokio::test]
async fn edits_restart_the_real_command() -> TestResult {
    init_tracing();
    let watched = TreeBuilder::new().file("main.go", "package main\n");
    let scratch = TreeBuilder::new();
    let log = scratch.path("launches.log");

    let mut cfg = WatchConfigBuilder::new(watched.root())
        .interval(Duration::from_millis(50))
        .stop_timeout(Duration::from_secs(1))
        .initial_run(true)
        .build();
    cfg.command = CommandSpec {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("echo run >> '{}'; exec sleep 30", log.display()),
        ],
    };

    let detector = PollingDetector::from_config(&cfg, Arc::new(RealFileSystem));
    let runner = ProcessRunner::from_config(&cfg);
    let cancel = CancellationToken::new();

    let task = {
        let cfg = cfg.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { run_with(&cfg, detector, runner, cancel).await })
    };

    wait_for_lines(&log, 1).await;

    watched.write("main.go", "package main\n\nfunc main() {}\n");
    wait_for_lines(&log, 2).await;

    // Hidden churn does not restart anything.
    watched.write(".git/index", "binary");
    sleep(Duration::from_millis(300)).await;
    assert_eq!(launches_logged(&log), 2);

    let started = Instant::now();
    cancel.cancel();
    let stats = timeout(Duration::from_secs(5), task)
        .await??
        .map_err(|e| format!("{e:#}"))?;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(stats.launches, 2);
    assert_eq!(stats.restarts, 1);
    assert_eq!(stats.failures, 0);
    Ok(())
}
