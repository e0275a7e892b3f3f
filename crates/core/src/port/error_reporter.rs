// Error Reporter Port (telemetry sink)

use std::error::Error;

/// Out-of-band error sink.
///
/// Every execution and parse failure is handed to the reporter before it is
/// returned to the caller. Reporting is fire-and-forget: implementations must
/// not fail or block the caller.
pub trait ErrorReporter: Send + Sync {
    fn capture_error(&self, error: &(dyn Error + 'static));
}

/// Reporter that drops everything (tests, embedding without telemetry)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    fn capture_error(&self, _error: &(dyn Error + 'static)) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records the message of every captured error
    #[derive(Debug, Default)]
    pub struct RecordingErrorReporter {
        captured: Mutex<Vec<String>>,
    }

    impl RecordingErrorReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn captured(&self) -> Vec<String> {
            self.captured.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.captured.lock().unwrap().len()
        }
    }

    impl ErrorReporter for RecordingErrorReporter {
        fn capture_error(&self, error: &(dyn Error + 'static)) {
            self.captured.lock().unwrap().push(error.to_string());
        }
    }
}
