// Scan Result Domain Model

use serde::Serialize;

/// Verdict for one file line of a scanner report.
///
/// Only the report parser builds these; fields are read through accessors
/// so a result cannot change after it was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    path: String,
    infected: bool,
    detection: String,
}

impl ScanResult {
    /// A file the scanner reported as `OK`
    pub fn clean(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            infected: false,
            detection: String::new(),
        }
    }

    /// A file the scanner matched against a signature
    pub fn infected(path: impl Into<String>, detection: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            infected: true,
            detection: detection.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_infected(&self) -> bool {
        self.infected
    }

    /// Signature name, empty for clean files
    pub fn detection(&self) -> &str {
        &self.detection
    }
}

/// Aggregate counts over one scan run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub infected: usize,
}

impl ScanSummary {
    pub fn from_results(results: &[ScanResult]) -> Self {
        Self {
            scanned: results.len(),
            infected: results.iter().filter(|r| r.is_infected()).count(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.infected == 0
    }
}
