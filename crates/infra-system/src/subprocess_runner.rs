// Subprocess runner implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::io::{PipeReader, Read};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use clamreport_core::application::{CancelReason, RunContext};
use clamreport_core::port::{CommandRunner, ErrorReporter, ExecutionFailure, RunError};

/// Subprocess runner
/// Spawns the scanner as a child process with stdout and stderr merged
pub struct SubprocessRunner {
    reporter: Arc<dyn ErrorReporter>,
}

impl SubprocessRunner {
    /// Create a new subprocess runner
    ///
    /// # Arguments
    /// * `reporter` - Telemetry sink that receives every error before it is returned
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessRunner::new(Arc::new(TracingErrorReporter::new()));
    /// let output = runner.run(None, "clamscan", &["/srv".to_string()]).await?;
    /// ```
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    /// Report an error to telemetry, then hand it back for propagation
    fn fail(&self, err: RunError) -> RunError {
        self.reporter.capture_error(&err);
        err
    }

    /// Spawn `program` with both output streams writing into one pipe,
    /// so the captured text keeps the order in which it was written.
    fn spawn_merged(program: &str, args: &[String]) -> Result<(Child, PipeReader), ExecutionFailure> {
        let (reader, writer) = std::io::pipe().map_err(ExecutionFailure::Spawn)?;
        let stderr_writer = writer.try_clone().map_err(ExecutionFailure::Spawn)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);

        // Own process group so cancellation also reaches grandchildren
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(ExecutionFailure::Spawn)?;

        // The command holds the parent's write ends; the reader only sees
        // EOF once they are closed.
        drop(command);

        Ok((child, reader))
    }

    /// Kill the child and its process group, then reap the child
    async fn terminate(child: &mut Child, pid: Option<u32>) -> std::io::Result<ExitStatus> {
        kill_process_group(pid);
        if let Err(e) = child.start_kill() {
            // Already exited; wait() below reaps it
            warn!(pid = ?pid, error = %e, "Failed to kill child process");
        }
        child.wait().await
    }

    /// Kill whatever is left of the run and build the cancellation error
    fn cancelled(
        &self,
        reason: CancelReason,
        pid: Option<u32>,
        program: &str,
        started: Instant,
    ) -> RunError {
        // Grandchildren may still hold the pipe open
        kill_process_group(pid);
        warn!(
            pid = ?pid,
            program = %program,
            reason = %reason,
            duration_ms = started.elapsed().as_millis() as u64,
            "Subprocess cancelled"
        );
        self.fail(RunError::Cancelled(reason))
    }
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        // ESRCH: the whole group is already gone
        debug!(pgid = pid, error = %e, "Process group not killed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Classify an unsuccessful exit status
fn failure_from_status(status: ExitStatus) -> ExecutionFailure {
    if let Some(code) = status.code() {
        return ExecutionFailure::ExitStatus(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return ExecutionFailure::Signal(signal);
        }
    }

    ExecutionFailure::Abnormal(status.to_string())
}

/// Drain the pipe until every writer has closed it
fn read_all(mut reader: PipeReader) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(
        &self,
        ctx: Option<&RunContext>,
        program: &str,
        args: &[String],
    ) -> Result<String, RunError> {
        if program.is_empty() {
            return Err(self.fail(RunError::InvalidCommand));
        }

        if let Some(reason) = ctx.and_then(RunContext::err) {
            warn!(program = %program, reason = %reason, "Context fired before process start");
            return Err(self.fail(RunError::Cancelled(reason)));
        }

        let started = Instant::now();
        info!(program = %program, args = ?args, "Starting subprocess");

        let (mut child, reader) = match Self::spawn_merged(program, args) {
            Ok(spawned) => spawned,
            Err(source) => {
                return Err(self.fail(RunError::Execution {
                    program: program.to_string(),
                    output: String::new(),
                    source,
                }))
            }
        };
        let pid = child.id();
        let mut collector = tokio::task::spawn_blocking(move || read_all(reader));

        let waited = match ctx {
            Some(ctx) => tokio::select! {
                status = child.wait() => Some(status),
                _ = ctx.done() => None,
            },
            None => Some(child.wait().await),
        };
        let status = match waited {
            Some(status) => status,
            None => {
                warn!(pid = ?pid, program = %program, "Context fired, killing child process");
                Self::terminate(&mut child, pid).await
            }
        };

        // A fired context wins over whatever the process itself reported
        if let Some(reason) = ctx.and_then(RunContext::err) {
            // Output of a cancelled run is discarded
            return Err(self.cancelled(reason, pid, program, started));
        }

        // The child is gone, but a grandchild may keep the pipe open
        let collected = match ctx {
            Some(ctx) => tokio::select! {
                collected = &mut collector => Some(collected),
                _ = ctx.done() => None,
            },
            None => Some(collector.await),
        };
        let collected = match collected {
            Some(collected) => collected,
            None => {
                let reason = ctx.and_then(RunContext::err).unwrap_or(CancelReason::Cancelled);
                return Err(self.cancelled(reason, pid, program, started));
            }
        };

        if let Some(reason) = ctx.and_then(RunContext::err) {
            return Err(self.cancelled(reason, pid, program, started));
        }

        let output = match collected {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Err(e)) => {
                return Err(self.fail(RunError::Execution {
                    program: program.to_string(),
                    output: String::new(),
                    source: ExecutionFailure::Output(e),
                }))
            }
            Err(join_err) => {
                return Err(self.fail(RunError::Execution {
                    program: program.to_string(),
                    output: String::new(),
                    source: ExecutionFailure::Output(std::io::Error::other(join_err)),
                }))
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                return Err(self.fail(RunError::Execution {
                    program: program.to_string(),
                    output,
                    source: ExecutionFailure::Wait(e),
                }))
            }
        };

        info!(
            pid = ?pid,
            program = %program,
            exit_code = ?status.code(),
            output_len = output.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Subprocess completed"
        );

        if !status.success() {
            return Err(self.fail(RunError::Execution {
                program: program.to_string(),
                output,
                source: failure_from_status(status),
            }));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clamreport_core::port::error_reporter::mocks::RecordingErrorReporter;
    use std::time::Duration;

    fn runner() -> (SubprocessRunner, Arc<RecordingErrorReporter>) {
        let reporter = Arc::new(RecordingErrorReporter::new());
        (SubprocessRunner::new(reporter.clone()), reporter)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn test_returns_string_echoed_to_stdout() {
        let (runner, reporter) = runner();

        let output = runner.run(None, "echo", &args(&["hello world"])).await.unwrap();

        assert_eq!(output, "hello world\n");
        assert_eq!(reporter.count(), 0);
    }

    #[tokio::test]
    async fn test_merges_stdout_and_stderr_in_order() {
        let (runner, _) = runner();

        let output = runner
            .run(None, "sh", &args(&["-c", "echo out; echo err 1>&2; echo out2"]))
            .await
            .unwrap();

        assert_eq!(output, "out\nerr\nout2\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_output() {
        let (runner, reporter) = runner();

        let err = runner
            .run(None, "sh", &args(&["-c", "echo partial; exit 3"]))
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.output(), "partial\n");
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let (runner, reporter) = runner();

        let err = runner
            .run(None, "clamreport-definitely-not-installed", &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Execution {
                source: ExecutionFailure::Spawn(_),
                ..
            }
        ));
        assert_eq!(err.output(), "");
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_empty_program_rejected() {
        let (runner, reporter) = runner();

        let err = runner.run(None, "", &[]).await.unwrap_err();

        assert!(matches!(err, RunError::InvalidCommand));
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_handles_context_with_timeout() {
        let (runner, reporter) = runner();
        let ctx = RunContext::background().with_timeout(Duration::from_millis(50));
        let started = Instant::now();

        let err = runner
            .run(Some(&ctx), "sh", &args(&["-c", "echo partial; sleep 10"]))
            .await
            .unwrap_err();

        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
        assert!(matches!(err, RunError::Cancelled(CancelReason::DeadlineExceeded)));
        assert_eq!(err.output(), "", "partial output discarded");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_expired_context_skips_spawn() {
        let (runner, _) = runner();
        let ctx = RunContext::background().with_timeout(Duration::ZERO);

        let err = runner
            .run(Some(&ctx), "sleep", &args(&["10"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Cancelled(CancelReason::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_handles_cancellation_of_context() {
        let (runner, _) = runner();
        let runner = Arc::new(runner);
        let (ctx, handle) = RunContext::cancellable();

        let task = {
            let runner = runner.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { runner.run(Some(&ctx), "sleep", &args(&["10"])).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let err = task.await.unwrap().unwrap_err();

        assert_eq!(ctx.err(), Some(CancelReason::Cancelled));
        assert!(matches!(err, RunError::Cancelled(CancelReason::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_during_output_collection() {
        let (runner, reporter) = runner();
        let ctx = RunContext::background().with_timeout(Duration::from_millis(200));
        let started = Instant::now();

        // sh exits at once; the background sleep keeps the pipe open
        let err = runner
            .run(Some(&ctx), "sh", &args(&["-c", "echo hi; sleep 3 &"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Cancelled(CancelReason::DeadlineExceeded)));
        assert_eq!(err.output(), "");
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "returned after {:?}",
            started.elapsed()
        );
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn test_live_context_returns_output() {
        let (runner, _) = runner();
        let ctx = RunContext::background().with_timeout(Duration::from_secs(30));

        let output = runner
            .run(Some(&ctx), "echo", &args(&["still here"]))
            .await
            .unwrap();

        assert_eq!(output, "still here\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_child_is_not_left_running() {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let (runner, _) = runner();
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("child.pid");
        let script = format!("echo $$ > {}; exec sleep 10", pid_file.display());
        let ctx = RunContext::background().with_timeout(Duration::from_millis(200));

        let err = runner
            .run(Some(&ctx), "sh", &args(&["-c", &script]))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(
            kill(Pid::from_raw(pid), None).is_err(),
            "child process {pid} still alive"
        );
    }
}
