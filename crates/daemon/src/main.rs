//! ClamReport - Main Entry Point
//! Runs one scanner pass over the given targets and prints the verdicts as JSON

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clamreport_core::application::{ReportParser, RunContext, ScanConfig, ScanService};
use clamreport_core::domain::ScanSummary;
use clamreport_core::port::ErrorReporter;
use clamreport_core::AppError;
use clamreport_infra_system::{SubprocessRunner, TracingErrorReporter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "clamreport=info,clamreport_core=info,clamreport_infra_system=info";

/// Exit status when the scanner report could not be parsed
const EXIT_PARSE_FAILURE: u8 = 2;

/// Install the tracing subscriber. Logs go to stderr; stdout carries results.
fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("CLAMREPORT_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

async fn run() -> Result<()> {
    info!("ClamReport v{} starting...", VERSION);

    // 1. Load configuration
    let config = ScanConfig::from_lookup(|key| std::env::var(key).ok())
        .map_err(AppError::from)
        .context("Invalid scanner configuration")?;
    let targets: Vec<String> = std::env::args().skip(1).collect();

    // 2. Setup dependencies (DI wiring)
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingErrorReporter::new());
    let runner = Arc::new(SubprocessRunner::new(reporter.clone()));
    let service = ScanService::new(runner, ReportParser::new(reporter), config);

    // 3. Ctrl+C cancels the running scan
    let (ctx, cancel) = RunContext::cancellable();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received. Cancelling scan...");
            cancel.cancel();
        }
    });

    // 4. Scan
    let outcome = service.scan(Some(&ctx), &targets).await;
    signal_task.abort();
    let results = outcome.context("Scan did not complete")?;

    // 5. Print results
    let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
    println!("{json}");

    let summary = ScanSummary::from_results(&results);
    info!(
        scanned = summary.scanned,
        infected = summary.infected,
        "Scan finished"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("clamreport: failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // A malformed report is fatal: never act on partial data
        Err(e) => match e.downcast_ref::<AppError>() {
            Some(AppError::Parse(parse)) => {
                error!(
                    reason = %parse.reason(),
                    raw_output = %parse.raw_output(),
                    "Scanner report could not be parsed"
                );
                ExitCode::from(EXIT_PARSE_FAILURE)
            }
            _ => {
                error!(error = ?e, "Scan failed");
                ExitCode::FAILURE
            }
        },
    }
}
