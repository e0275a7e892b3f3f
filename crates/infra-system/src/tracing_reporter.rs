// Error reporter that emits structured tracing events
use std::error::Error;
use tracing::error;

use clamreport_core::domain::ParseError;
use clamreport_core::port::ErrorReporter;

/// Telemetry sink backed by the process-wide tracing subscriber.
/// Parse failures also log the raw scanner output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl TracingErrorReporter {
    pub fn new() -> Self {
        Self
    }
}

/// Messages of every `source()` below `error`
fn cause_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

impl ErrorReporter for TracingErrorReporter {
    fn capture_error(&self, err: &(dyn Error + 'static)) {
        let causes = cause_chain(err);

        if let Some(parse) = err.downcast_ref::<ParseError>() {
            error!(
                error = %err,
                causes = ?causes,
                raw_output = %parse.raw_output(),
                "Captured report parse failure"
            );
        } else {
            error!(error = %err, causes = ?causes, "Captured error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clamreport_core::domain::ParseFailureReason;
    use clamreport_core::port::{ExecutionFailure, RunError};

    #[test]
    fn test_cause_chain_walks_sources() {
        let err = RunError::Execution {
            program: "clamscan".to_string(),
            output: String::new(),
            source: ExecutionFailure::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )),
        };

        let causes = cause_chain(&err);

        assert_eq!(
            causes,
            vec![
                "failed to start process: No such file or directory".to_string(),
                "No such file or directory".to_string(),
            ]
        );
    }

    #[test]
    fn test_capture_does_not_panic_without_subscriber() {
        let reporter = TracingErrorReporter::new();

        reporter.capture_error(&ParseError::new(
            ParseFailureReason::EmptyScanResult,
            "\n----------- SCAN SUMMARY -----------\n",
        ));
    }
}
