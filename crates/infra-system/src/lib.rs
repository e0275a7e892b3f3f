// ClamReport Infrastructure - System Adapters
// Implements: CommandRunner, ErrorReporter

pub mod subprocess_runner;
pub mod tracing_reporter;

pub use subprocess_runner::SubprocessRunner;
pub use tracing_reporter::TracingErrorReporter;
