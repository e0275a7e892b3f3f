// Scanner report parser
use crate::domain::{ParseError, ParseFailureReason, ScanResult};
use crate::port::ErrorReporter;
use std::sync::Arc;
use tracing::{debug, warn};

use super::constants::{CLEAN_VERDICT, FOUND_MARKER, RESULT_SEPARATOR, SUMMARY_DELIMITER};

/// Parse the combined output of one scan run.
///
/// Returns one result per file line, in report order. Any deviation from the
/// expected shape fails the whole report; no partial list is ever returned.
///
/// Expected shape:
/// ```text
/// /path/one: OK
/// /path/two: Eicar-Signature FOUND
/// ----------- SCAN SUMMARY -----------
/// Infected files: 1
/// ```
pub fn parse_report(output: &str) -> Result<Vec<ScanResult>, ParseError> {
    let fail = |reason: ParseFailureReason| ParseError::new(reason, output);

    let delimiters = output.matches(SUMMARY_DELIMITER).count();
    let results_section = match output.split_once(SUMMARY_DELIMITER) {
        Some((results, _summary)) if delimiters == 1 => results,
        _ => return Err(fail(ParseFailureReason::SummaryDelimiterCount(delimiters))),
    };

    let results_section = results_section.trim();
    if results_section.is_empty() {
        return Err(fail(ParseFailureReason::EmptyScanResult));
    }

    results_section
        .split('\n')
        .enumerate()
        .map(|(idx, line)| parse_result_line(line, idx + 1).map_err(fail))
        .collect()
}

/// Parse one `<path>: <verdict>` line. `line_no` is 1-based.
fn parse_result_line(line: &str, line_no: usize) -> Result<ScanResult, ParseFailureReason> {
    if line.is_empty() {
        return Err(ParseFailureReason::EmptyResultLine { line: line_no });
    }

    // Split on the last separator so paths containing ": " stay intact
    let (path, verdict) = line
        .rsplit_once(RESULT_SEPARATOR)
        .ok_or(ParseFailureReason::MissingSeparator { line: line_no })?;

    if verdict == CLEAN_VERDICT {
        return Ok(ScanResult::clean(path));
    }

    // First occurrence only, wherever it sits
    Ok(ScanResult::infected(path, verdict.replacen(FOUND_MARKER, "", 1)))
}

/// Report parser bound to a telemetry sink.
///
/// Failures are reported before they are returned; whether a failure aborts
/// the application is left to the caller.
pub struct ReportParser {
    reporter: Arc<dyn ErrorReporter>,
}

impl ReportParser {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    pub fn parse(&self, output: &str) -> Result<Vec<ScanResult>, ParseError> {
        match parse_report(output) {
            Ok(results) => {
                debug!(files = results.len(), "Parsed scanner report");
                Ok(results)
            }
            Err(err) => {
                warn!(
                    reason = %err.reason(),
                    output_len = output.len(),
                    "Scanner report rejected"
                );
                self.reporter.capture_error(&err);
                Err(err)
            }
        }
    }
}
