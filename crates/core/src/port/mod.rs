// Port Layer - Interfaces for external dependencies

pub mod command_runner;
pub mod error_reporter;

// Re-exports
pub use command_runner::{CommandRunner, ExecutionFailure, RunError};
pub use error_reporter::{ErrorReporter, NoopErrorReporter};
