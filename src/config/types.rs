//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::format::SizeFormat;
use crate::transfer::{
    DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_INTERVAL, DEFAULT_RETRY_WAIT, RetryPolicy,
    TransferSettings,
};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for one reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the tree to copy from
    pub source: PathBuf,
    /// Root under which the source tree is mirrored
    pub destination: PathBuf,
    /// Chunk size for the copy loop
    pub buffer_size: usize,
    /// Fixed wait between a failure and its retry
    pub retry_wait: Duration,
    /// Minimum gap between progress lines
    pub progress_interval: Duration,
    /// Also copy files whose destination differs in size or mtime
    pub overwrite: bool,
    /// Classify and report only
    pub dry_run: bool,
    /// Print sizes as raw byte counts
    pub raw_bytes: bool,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            retry_wait: DEFAULT_RETRY_WAIT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            overwrite: false,
            dry_run: false,
            raw_bytes: false,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Construct a Config with explicit roots; other fields use defaults.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn size_format(&self) -> SizeFormat {
        SizeFormat::from_raw_flag(self.raw_bytes)
    }

    /// Engine tunables derived from this config.
    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            buffer_size: self.buffer_size,
            retry: RetryPolicy::new(self.retry_wait),
            progress_interval: self.progress_interval,
            size_format: self.size_format(),
        }
    }
}
