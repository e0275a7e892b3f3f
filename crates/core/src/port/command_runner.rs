// Command Runner Port
// Abstraction for launching the external scanner and capturing its output

use crate::application::context::{CancelReason, RunContext};
use async_trait::async_trait;
use thiserror::Error;

/// Underlying cause of a failed process run
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("failed to read process output: {0}")]
    Output(#[source] std::io::Error),

    #[error("exit status {0}")]
    ExitStatus(i32),

    #[error("terminated by signal {0}")]
    Signal(i32),

    #[error("abnormal termination: {0}")]
    Abnormal(String),
}

/// Command runner errors
#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid command: program name is empty")]
    InvalidCommand,

    /// The process could not run or exited unsuccessfully.
    /// `output` holds whatever was captured before the failure.
    #[error("execution of `{program}` failed: {source}")]
    Execution {
        program: String,
        output: String,
        #[source]
        source: ExecutionFailure,
    },

    /// Explicit cancellation or deadline expiry. Captured output is discarded.
    #[error(transparent)]
    Cancelled(#[from] CancelReason),
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled(_))
    }

    /// Exit code of a process that ran to completion unsuccessfully
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Execution {
                source: ExecutionFailure::ExitStatus(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    /// Captured output; always empty for cancellation
    pub fn output(&self) -> &str {
        match self {
            RunError::Execution { output, .. } => output,
            _ => "",
        }
    }

    pub fn into_output(self) -> String {
        match self {
            RunError::Execution { output, .. } => output,
            _ => String::new(),
        }
    }
}

/// Command Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns a real child process (infra-system)
/// - MockCommandRunner: scripted outcomes for tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its combined stdout/stderr.
    ///
    /// With a context, the child is killed when the context fires and the
    /// result is `RunError::Cancelled`, even if the process also failed.
    /// Without one, no cancellation checks are made.
    ///
    /// # Errors
    /// - RunError::InvalidCommand if `program` is empty
    /// - RunError::Execution if the process fails to start or exits non-zero
    /// - RunError::Cancelled if the context was cancelled or its deadline passed
    async fn run(
        &self,
        ctx: Option<&RunContext>,
        program: &str,
        args: &[String],
    ) -> Result<String, RunError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit 0 with this output
        Output(String),
        /// Exit with a non-zero code after printing output
        ExitCode { output: String, code: i32 },
        /// Fail to start
        SpawnFailure(String),
        /// Report cancellation
        Cancelled(CancelReason),
    }

    /// Mock Command Runner for testing
    pub struct MockCommandRunner {
        behavior: MockBehavior,
        calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    }

    impl MockCommandRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_output(output: impl Into<String>) -> Self {
            Self::new(MockBehavior::Output(output.into()))
        }

        pub fn new_exit_code(output: impl Into<String>, code: i32) -> Self {
            Self::new(MockBehavior::ExitCode {
                output: output.into(),
                code,
            })
        }

        /// Program and arguments of every call, in order
        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for MockCommandRunner {
        async fn run(
            &self,
            _ctx: Option<&RunContext>,
            program: &str,
            args: &[String],
        ) -> Result<String, RunError> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));

            match &self.behavior {
                MockBehavior::Output(output) => Ok(output.clone()),
                MockBehavior::ExitCode { output, code } => Err(RunError::Execution {
                    program: program.to_string(),
                    output: output.clone(),
                    source: ExecutionFailure::ExitStatus(*code),
                }),
                MockBehavior::SpawnFailure(msg) => Err(RunError::Execution {
                    program: program.to_string(),
                    output: String::new(),
                    source: ExecutionFailure::Spawn(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        msg.clone(),
                    )),
                }),
                MockBehavior::Cancelled(reason) => Err(RunError::Cancelled(*reason)),
            }
        }
    }
}
