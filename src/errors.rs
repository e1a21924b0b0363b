//! Typed error definitions for robust_copy.
//!
//! The transfer engine only ever sees two failure kinds: an I/O failure on
//! some filesystem call, or a chunk whose read and write counts disagree.
//! Both are retried; neither escapes `transfer`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopyError {
    /// Any failure touching the filesystem: stat, open, seek, read, write,
    /// directory creation, timestamp get/set.
    #[error("{op} '{}': {source}{}", .path.display(), hint(.source))]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single chunk was read with one length and written with another.
    #[error("bytes mismatch, read: {read}, write: {written}")]
    Integrity { read: usize, written: usize },
}

impl CopyError {
    /// Adapter for `.map_err(...)` on io results: attaches the operation and path.
    pub fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> CopyError + 'a {
        move |source| CopyError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CopyError::Io { .. } => "transient_io",
            CopyError::Integrity { .. } => "copy_integrity",
        }
    }
}

/// Operator hint for common I/O failures, appended to the error message.
fn hint(e: &io::Error) -> &'static str {
    #[cfg(unix)]
    {
        if let Some(code) = e.raw_os_error() {
            match code {
                libc::ENOSPC => return " (insufficient space on device)",
                libc::EROFS => return " (read-only filesystem)",
                libc::EIO => return " (device I/O error; drive or share may have disconnected)",
                libc::ENOTCONN | libc::ESTALE => {
                    return " (network share unavailable; waiting for it to come back)";
                }
                libc::ENAMETOOLONG => return " (path too long)",
                _ => {}
            }
        }
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => " (permission denied; check ownership and permissions)",
        io::ErrorKind::NotFound => " (path not found; drive may be disconnected)",
        io::ErrorKind::UnexpectedEof => " (source ended before its recorded size)",
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => " (timed out)",
        _ => "",
    }
}
