// Scanner configuration

use std::time::Duration;
use thiserror::Error;

use super::constants::{CLAMSCAN_CMD, NO_SUMMARY_FLAG};

/// Environment variable naming the scanner executable
pub const ENV_SCANNER_BIN: &str = "CLAMREPORT_SCANNER_BIN";
/// Environment variable with whitespace-separated extra scanner flags
pub const ENV_SCANNER_ARGS: &str = "CLAMREPORT_SCANNER_ARGS";
/// Environment variable with the per-scan timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "CLAMREPORT_TIMEOUT_SECS";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidTimeout { key: &'static str, value: String },

    #[error("scanner flag {0} suppresses the report summary")]
    ForbiddenFlag(String),
}

/// How the scanner is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub scanner_bin: String,
    /// Flags placed before the scan targets
    pub extra_args: Vec<String>,
    /// Per-scan limit layered on the caller's context
    pub timeout: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scanner_bin: CLAMSCAN_CMD.to_string(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }
}

impl ScanConfig {
    /// Build a config from a key lookup (normally `std::env::var`).
    /// Unset keys fall back to defaults.
    ///
    /// # Example
    /// ```text
    /// let config = ScanConfig::from_lookup(|key| std::env::var(key).ok())?;
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bin) = lookup(ENV_SCANNER_BIN) {
            let bin = bin.trim();
            if bin.is_empty() {
                return Err(ConfigError::Empty {
                    key: ENV_SCANNER_BIN,
                });
            }
            config.scanner_bin = bin.to_string();
        }

        if let Some(args) = lookup(ENV_SCANNER_ARGS) {
            config.extra_args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout {
                    key: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the report parser cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner_bin.is_empty() {
            return Err(ConfigError::Empty {
                key: ENV_SCANNER_BIN,
            });
        }
        if let Some(flag) = self.extra_args.iter().find(|a| a.as_str() == NO_SUMMARY_FLAG) {
            return Err(ConfigError::ForbiddenFlag(flag.clone()));
        }
        Ok(())
    }
}
