//! Core library for `robust_copy`.
//!
//! Mirrors a source directory tree under a destination root. Each file is
//! classified by size and modification time; files that need copying are
//! transferred by a retrying engine that resumes interrupted copies instead
//! of starting over, then stamps the source's mtime on the copy.
//!
//! Modules:
//! - [`classify`]: size + mtime comparison of a source/destination pair
//! - [`transfer`]: resumable copy engine, retry policy, progress reporting
//! - [`sync`]: tree walk, bucket listing and the sequential transfer loop
//! - [`config`], [`cli`], [`logging`]: ambient setup for the binary

pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod format;
pub mod logging;
pub mod output;
pub mod platform;
pub mod sync;
pub mod transfer;

pub use classify::{Classification, FileEntry, classify};
pub use config::{Config, LogLevel, default_config_path, default_log_path};
pub use errors::CopyError;
pub use format::SizeFormat;
pub use sync::{SyncReport, map_destination, plan};
pub use transfer::{
    CopyTask, MAX_BUFFER_SIZE, RetryPolicy, TransferEngine, TransferOutcome, TransferSettings,
    resume_offset,
};
