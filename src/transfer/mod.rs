//! Resumable, retrying whole-file transfer.
//!
//! A transfer never fails from the caller's point of view: every filesystem
//! step (source size, parent directories, the copy stage, mtime read, mtime
//! write) runs under [`RetryPolicy::run`] and is retried until it succeeds.
//!
//! The copy stage reopens both files on each attempt without truncating the
//! destination, rewinds the last two buffers' worth of progress and carries
//! on from there. Rewinding means a tail that was written but never made it
//! to disk is rewritten rather than trusted. Two buffers is a policy choice,
//! not a bound derived from the I/O primitives.

pub mod io;
pub mod progress;
pub mod retry;

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::CopyError;
use crate::format::SizeFormat;

pub use io::{Destination, StdIo, TransferIo};
pub use progress::{
    ConsoleSink, DEFAULT_PROGRESS_INTERVAL, MemorySink, ProgressSink, ProgressTracker,
};
pub use retry::{DEFAULT_RETRY_WAIT, RetryPolicy};

/// Default chunk size: 1 MiB.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Largest accepted chunk size: 1 GiB.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024;

/// How many buffer-lengths of progress are discarded before each resume.
pub const REWIND_BUFFERS: u64 = 2;

/// Offset at which a (re)opened copy continues.
///
/// `bytes_copied` is `None` before the first open. Otherwise the position is
/// moved back by [`REWIND_BUFFERS`] buffer-lengths, clamped at zero; it is
/// never past `bytes_copied`.
pub fn resume_offset(bytes_copied: Option<u64>, buffer_capacity: usize) -> u64 {
    match bytes_copied {
        None => 0,
        Some(n) => n.saturating_sub(REWIND_BUFFERS.saturating_mul(buffer_capacity as u64)),
    }
}

/// One file selected for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Source length at classification time (used for listings; the engine
    /// re-reads the size itself).
    pub size: u64,
}

/// Tunables for a [`TransferEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    pub buffer_size: usize,
    pub retry: RetryPolicy,
    pub progress_interval: Duration,
    pub size_format: SizeFormat,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            retry: RetryPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            size_format: SizeFormat::Binary,
        }
    }
}

/// What happened during a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub bytes: u64,
    /// Number of copy-stage attempts (1 when nothing failed).
    pub copy_attempts: u64,
    /// Offset each copy-stage attempt resumed from, in order.
    pub resume_offsets: Vec<u64>,
    pub modified: FileTime,
}

/// Mutable state of one in-flight transfer. Never shared, never persisted.
struct TransferState {
    size: u64,
    bytes_copied: Option<u64>,
    progress: ProgressTracker,
    format: SizeFormat,
    resume_offsets: Vec<u64>,
}

/// Sequential transfer engine. Owns one buffer, reused across files.
pub struct TransferEngine<I = StdIo, S = ConsoleSink> {
    buffer: Vec<u8>,
    retry: RetryPolicy,
    progress_interval: Duration,
    format: SizeFormat,
    io: I,
    sink: S,
}

impl TransferEngine {
    pub fn new(settings: TransferSettings) -> Self {
        Self::with_parts(settings, StdIo, ConsoleSink)
    }
}

impl<I: TransferIo, S: ProgressSink> TransferEngine<I, S> {
    /// Build an engine with custom handle acquisition and progress sink.
    pub fn with_parts(settings: TransferSettings, io: I, sink: S) -> Self {
        Self {
            buffer: vec![0u8; buffer_len(settings.buffer_size)],
            retry: settings.retry,
            progress_interval: settings.progress_interval,
            format: settings.size_format,
            io,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Transfer a classified task.
    pub fn run_task(&mut self, task: &CopyTask) -> TransferOutcome {
        self.transfer(&task.source, &task.destination)
    }

    /// Copy `source` over `destination` and replicate its modification time.
    /// Blocks until this succeeds.
    pub fn transfer(&mut self, source: &Path, destination: &Path) -> TransferOutcome {
        let retry = self.retry;
        let format = self.format;

        let size = retry.run("getting size", |_| {
            fs::metadata(source)
                .map(|m| m.len())
                .map_err(CopyError::io("stat source", source))
        });

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            retry.run("creating directories", |_| {
                fs::create_dir_all(parent).map_err(CopyError::io("create directories", parent))
            });
        }

        self.sink.started(&format!(
            "Copying {} => {} ({})",
            source.display(),
            destination.display(),
            format.size(size)
        ));
        debug!(source = %source.display(), dest = %destination.display(), size, "transfer started");

        let mut state = TransferState {
            size,
            bytes_copied: None,
            progress: ProgressTracker::new(self.progress_interval, format),
            format,
            resume_offsets: Vec::new(),
        };

        let Self { buffer, io, sink, .. } = self;
        let copy_attempts = retry.run("copying", |attempt| {
            copy_pass(&mut *io, &mut buffer[..], &mut *sink, &mut state, source, destination)
                .map(|()| attempt)
        });

        let modified = retry.run("getting last modified time", |_| {
            fs::metadata(source)
                .map(|m| FileTime::from_last_modification_time(&m))
                .map_err(CopyError::io("stat source", source))
        });
        info!("Setting Last Modified Time to: {}", display_filetime(modified));
        retry.run("setting last modified time", |_| {
            filetime::set_file_mtime(destination, modified)
                .map_err(CopyError::io("set modification time", destination))
        });

        info!(
            source = %source.display(),
            dest = %destination.display(),
            bytes = size,
            attempts = copy_attempts,
            "Copy complete"
        );
        TransferOutcome {
            bytes: size,
            copy_attempts,
            resume_offsets: state.resume_offsets,
            modified,
        }
    }
}

/// Requested chunk size clamped to `1..=MAX_BUFFER_SIZE`.
fn buffer_len(requested: usize) -> usize {
    requested.clamp(1, MAX_BUFFER_SIZE)
}

/// One open-rewind-copy cycle. Handles are dropped (closed) on every return.
fn copy_pass<I: TransferIo, S: ProgressSink>(
    io: &mut I,
    buffer: &mut [u8],
    sink: &mut S,
    state: &mut TransferState,
    source: &Path,
    destination: &Path,
) -> Result<(), CopyError> {
    let mut reader = io
        .open_source(source)
        .map_err(CopyError::io("open source", source))?;
    let mut writer = io
        .open_destination(destination)
        .map_err(CopyError::io("open destination", destination))?;

    let offset = resume_offset(state.bytes_copied, buffer.len());
    state.bytes_copied = Some(offset);
    state.resume_offsets.push(offset);
    if offset > 0 {
        info!("Restarting at: {}", state.format.size(offset));
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(CopyError::io("seek source", source))?;
        writer
            .seek(SeekFrom::Start(offset))
            .map_err(CopyError::io("seek destination", destination))?;
    }

    let mut copied = offset;
    while copied < state.size {
        let want = (state.size - copied).min(buffer.len() as u64) as usize;
        let read = reader
            .read(&mut buffer[..want])
            .map_err(CopyError::io("read", source))?;
        if read == 0 {
            return Err(CopyError::io("read", source)(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("source ended at {copied} of {} bytes", state.size),
            )));
        }
        let written = writer
            .write(&buffer[..read])
            .map_err(CopyError::io("write", destination))?;
        if written != read {
            return Err(CopyError::Integrity { read, written });
        }

        copied += read as u64;
        state.bytes_copied = Some(copied);
        if let Some(line) = state.progress.update(copied, state.size) {
            sink.progress(&line);
        }
    }
    if state.size == 0
        && let Some(line) = state.progress.update(0, 0)
    {
        sink.progress(&line);
    }

    // Drop any stale tail left by a longer previous destination.
    writer
        .set_len(state.size)
        .map_err(CopyError::io("truncate destination", destination))?;
    writer
        .flush()
        .map_err(CopyError::io("flush", destination))?;
    Ok(())
}

fn display_filetime(t: FileTime) -> String {
    DateTime::<Utc>::from_timestamp(t.unix_seconds(), t.nanoseconds())
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| t.to_string())
}
