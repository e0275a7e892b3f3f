// Application Layer - Use Cases and Business Logic

pub mod config;
pub mod constants;
pub mod context;
pub mod report_parser;
pub mod scan_service;

// Re-exports
pub use config::{ConfigError, ScanConfig};
pub use context::{CancelHandle, CancelReason, RunContext};
pub use report_parser::{parse_report, ReportParser};
pub use scan_service::ScanService;
