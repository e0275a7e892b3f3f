// Report Parse Error Types

use thiserror::Error;

/// Why a scanner report was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailureReason {
    #[error("expected exactly one summary delimiter, found {0}")]
    SummaryDelimiterCount(usize),

    #[error("empty scan result")]
    EmptyScanResult,

    #[error("empty result line at line {line}")]
    EmptyResultLine { line: usize },

    #[error("result line {line} has no path/verdict separator")]
    MissingSeparator { line: usize },
}

/// Scanner output that does not match the expected report shape.
///
/// Always carries the complete raw output, verbatim, so format drift can be
/// diagnosed without re-running the scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parsing error: {reason}")]
pub struct ParseError {
    #[source]
    reason: ParseFailureReason,
    raw_output: String,
}

impl ParseError {
    pub fn new(reason: ParseFailureReason, raw_output: impl Into<String>) -> Self {
        Self {
            reason,
            raw_output: raw_output.into(),
        }
    }

    pub fn reason(&self) -> ParseFailureReason {
        self.reason
    }

    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }
}
