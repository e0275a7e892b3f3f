// Domain Layer - Scan verdicts and report failures

pub mod error;
pub mod scan_result;

// Re-exports
pub use error::{ParseError, ParseFailureReason};
pub use scan_result::{ScanResult, ScanSummary};
