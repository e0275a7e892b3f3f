//! Cancellation and deadline behavior against real child processes

use std::sync::Arc;
use std::time::{Duration, Instant};

use clamreport_core::application::{
    CancelReason, ReportParser, RunContext, ScanConfig, ScanService,
};
use clamreport_core::port::error_reporter::mocks::RecordingErrorReporter;
use clamreport_core::port::{CommandRunner, RunError};
use clamreport_core::AppError;
use clamreport_infra_system::SubprocessRunner;

fn slow_scanner(timeout: Option<Duration>) -> ScanService {
    let reporter = Arc::new(RecordingErrorReporter::new());
    let runner = Arc::new(SubprocessRunner::new(reporter.clone()));
    let config = ScanConfig {
        scanner_bin: "sleep".to_string(),
        extra_args: Vec::new(),
        timeout,
    };
    ScanService::new(runner, ReportParser::new(reporter), config)
}

#[tokio::test]
async fn test_configured_timeout_cancels_scan() {
    let service = slow_scanner(Some(Duration::from_millis(100)));
    let started = Instant::now();

    let err = service.scan(None, &["10".to_string()]).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(
        err,
        AppError::Run(RunError::Cancelled(CancelReason::DeadlineExceeded))
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_caller_cancel_wins_over_timeout() {
    let service = Arc::new(slow_scanner(Some(Duration::from_secs(30))));
    let (ctx, handle) = RunContext::cancellable();

    let task = {
        let service = service.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { service.scan(Some(&ctx), &["10".to_string()]).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let err = task.await.unwrap().unwrap_err();

    assert!(matches!(
        err,
        AppError::Run(RunError::Cancelled(CancelReason::Cancelled))
    ));
}

/// Killing the child makes it exit unsuccessfully; the caller must see the
/// deadline, not the kill signal.
#[tokio::test]
async fn test_cancellation_preferred_over_process_failure() {
    let reporter = Arc::new(RecordingErrorReporter::new());
    let runner = SubprocessRunner::new(reporter.clone());
    let ctx = RunContext::background().with_timeout(Duration::from_millis(100));

    let err = runner
        .run(
            Some(&ctx),
            "sh",
            &["-c".to_string(), "echo scanning; sleep 0.5; exit 7".to_string()],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Cancelled(CancelReason::DeadlineExceeded)));
    assert_eq!(err.exit_code(), None);
    assert_eq!(reporter.count(), 1);
    assert_eq!(reporter.captured()[0], "context deadline exceeded");
}

#[cfg(unix)]
#[tokio::test]
async fn test_no_process_left_after_deadline() {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let reporter = Arc::new(RecordingErrorReporter::new());
    let runner = SubprocessRunner::new(reporter);
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("scanner.pid");
    let script = format!("echo $$ > {}; exec sleep 10", pid_file.display());
    let ctx = RunContext::background().with_timeout(Duration::from_millis(200));

    let err = runner
        .run(Some(&ctx), "sh", &["-c".to_string(), script])
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(kill(Pid::from_raw(pid), None).is_err(), "scanner {pid} still alive");
}

#[cfg(unix)]
#[tokio::test]
async fn test_grandchild_killed_with_scanner() {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let runner = SubprocessRunner::new(Arc::new(RecordingErrorReporter::new()));
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("worker.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let ctx = RunContext::background().with_timeout(Duration::from_millis(200));

    let err = runner
        .run(Some(&ctx), "sh", &["-c".to_string(), script])
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    // A killed orphan may linger as a zombie until its new parent reaps it
    let running = |pid: i32| {
        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    };
    let gone_by = Instant::now() + Duration::from_secs(5);
    while running(pid) {
        assert!(Instant::now() < gone_by, "background worker {pid} still alive");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
