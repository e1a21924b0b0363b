//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - SOURCE and DESTINATION are required unless --print-config or --init-config is given.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::paths::normalize_lexically;
use crate::config::types::{Config, LogLevel};
use crate::transfer::MAX_BUFFER_SIZE;

/// Mirror a directory tree, skipping files whose size and mtime already match.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Mirror a directory tree with resumable, retrying file copies"
)]
pub struct Args {
    /// Directory to copy from.
    #[arg(
        value_name = "SOURCE",
        value_hint = ValueHint::DirPath,
        required_unless_present_any = ["print_config", "init_config"]
    )]
    pub source: Option<PathBuf>,

    /// Directory under which SOURCE is mirrored (as DESTINATION/<name of SOURCE>/...).
    #[arg(
        value_name = "DESTINATION",
        value_hint = ValueHint::DirPath,
        required_unless_present_any = ["print_config", "init_config"]
    )]
    pub destination: Option<PathBuf>,

    /// Classify and list files, but do not copy anything.
    #[arg(short = 'd', long, help = "List what would be copied and exit without copying")]
    pub dry_run: bool,

    /// Also copy files whose destination differs in size or modification time.
    #[arg(short = 'o', long, help = "Overwrite mismatching destination files")]
    pub overwrite: bool,

    /// Print sizes as raw byte counts instead of KiB/MiB/...
    #[arg(short = 'b', long, help = "Print sizes in bytes")]
    pub raw_bytes: bool,

    /// Chunk size in bytes for each read/write (at most 1 GiB).
    #[arg(
        long,
        value_name = "BYTES",
        value_parser = clap::value_parser!(u64).range(1..=MAX_BUFFER_SIZE as u64)
    )]
    pub buffer_size: Option<u64>,

    /// Seconds to wait after a failure before retrying.
    #[arg(long, value_name = "SECONDS")]
    pub retry_wait: Option<u64>,

    /// Minimum seconds between progress lines.
    #[arg(long, value_name = "SECONDS")]
    pub progress_interval: Option<u64>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(long, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where robust_copy will look for the config file, then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    /// Write a commented template config to the config location, then exit.
    #[arg(long, help = "Create a template config file and exit")]
    pub init_config: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(src) = &self.source {
            cfg.source = resolve_source_root(&sanitize_path(src));
        }
        if let Some(dst) = &self.destination {
            cfg.destination = absolutize(&sanitize_path(dst));
        }
        if let Some(n) = self.buffer_size {
            cfg.buffer_size = usize::try_from(n).unwrap_or(usize::MAX);
        }
        if let Some(secs) = self.retry_wait {
            cfg.retry_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = self.progress_interval {
            cfg.progress_interval = Duration::from_secs(secs);
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(lf) = &self.log_file {
            cfg.log_file = Some(lf.clone());
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
        if self.overwrite {
            cfg.overwrite = true;
        }
        if self.raw_bytes {
            cfg.raw_bytes = true;
        }
    }
}

/// Canonical source root; falls back to the absolute form when the path
/// cannot be resolved (validation reports why).
fn resolve_source_root(p: &Path) -> PathBuf {
    dunce::canonicalize(p).unwrap_or_else(|_| absolutize(p))
}

/// Lexically absolute path with `.` and `..` folded; the destination may not exist yet.
fn absolutize(p: &Path) -> PathBuf {
    let abs = std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    normalize_lexically(&abs)
}

// Trim surrounding quotes left behind by shells (PowerShell/CMD) and one trailing separator.
fn sanitize_path(p: &Path) -> PathBuf {
    let s = p.to_string_lossy();
    let trimmed = s.trim();
    let mut inner = trimmed
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string();
    if inner.len() > 1 && (inner.ends_with('/') || inner.ends_with('\\')) {
        inner.pop();
    }
    PathBuf::from(inner)
}

pub fn parse() -> Args {
    Args::parse()
}
