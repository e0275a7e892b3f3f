// Scan use case: run the scanner, then parse its report
use crate::domain::{ScanResult, ScanSummary};
use crate::error::Result;
use crate::port::CommandRunner;
use std::sync::Arc;
use tracing::info;

use super::config::ScanConfig;
use super::constants::INFECTED_EXIT_CODE;
use super::context::RunContext;
use super::report_parser::ReportParser;

/// Runs one scanner pass over a set of targets
pub struct ScanService {
    runner: Arc<dyn CommandRunner>,
    parser: ReportParser,
    config: ScanConfig,
}

impl ScanService {
    /// Create a new scan service
    ///
    /// # Arguments
    /// * `runner` - Command runner used to launch the scanner
    /// * `parser` - Report parser (carries the telemetry sink)
    /// * `config` - Scanner binary, extra flags and optional timeout
    pub fn new(runner: Arc<dyn CommandRunner>, parser: ReportParser, config: ScanConfig) -> Self {
        Self {
            runner,
            parser,
            config,
        }
    }

    /// Scan `targets` and return one result per reported file.
    ///
    /// The scanner exits with status 1 when it finds an infection; that run
    /// still produced a full report, so its output is parsed like a clean run.
    /// The configured timeout is layered on `ctx`.
    ///
    /// # Errors
    /// - AppError::Run for spawn failures, other non-zero exits and cancellation
    /// - AppError::Parse when the report does not have the expected shape
    pub async fn scan(
        &self,
        ctx: Option<&RunContext>,
        targets: &[String],
    ) -> Result<Vec<ScanResult>> {
        let scoped;
        let ctx = match (ctx, self.config.timeout) {
            (Some(parent), Some(timeout)) => {
                scoped = parent.with_timeout(timeout);
                Some(&scoped)
            }
            (None, Some(timeout)) => {
                scoped = RunContext::background().with_timeout(timeout);
                Some(&scoped)
            }
            (ctx, None) => ctx,
        };

        let mut args = self.config.extra_args.clone();
        args.extend(targets.iter().cloned());

        info!(
            scanner = %self.config.scanner_bin,
            targets = targets.len(),
            timeout = ?self.config.timeout,
            "Starting scan"
        );

        let output = match self.runner.run(ctx, &self.config.scanner_bin, &args).await {
            Ok(output) => output,
            Err(err) if err.exit_code() == Some(INFECTED_EXIT_CODE) && !err.output().is_empty() => {
                info!("Scanner reported infections");
                err.into_output()
            }
            Err(err) => return Err(err.into()),
        };

        let results = self.parser.parse(&output)?;
        let summary = ScanSummary::from_results(&results);

        info!(
            scanned = summary.scanned,
            infected = summary.infected,
            "Scan completed"
        );

        Ok(results)
    }
}
