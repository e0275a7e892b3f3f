// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Run error: {0}")]
    Run(#[from] crate::port::RunError),

    #[error("Parse error: {0}")]
    Parse(#[from] crate::domain::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::application::config::ConfigError),
}

impl AppError {
    /// True when the scan was aborted by cancellation or deadline expiry
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Run(e) if e.is_cancelled())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
