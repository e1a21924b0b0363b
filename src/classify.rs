//! Change detection between a source file and its destination counterpart.
//!
//! Only existence, length and modification time are consulted. Content is
//! never read, so a destination edited in place with its size and mtime
//! restored will be reported as a `Match`. Filesystems with coarse timestamp
//! resolution (FAT, some network shares) can likewise report `Mismatch` for
//! files that were copied faithfully. Both are accepted trade-offs for speed
//! on large trees.

use filetime::FileTime;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Snapshot of a file's identity-relevant metadata at classification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub len: u64,
    pub modified: FileTime,
}

impl FileEntry {
    /// Stat `path` (following symlinks) and capture its length and mtime.
    pub fn stat(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self::from_metadata(path, &meta))
    }

    pub fn from_metadata(path: &Path, meta: &fs::Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            len: meta.len(),
            modified: FileTime::from_last_modification_time(meta),
        }
    }

    /// Same length and bit-exact same modification time.
    pub fn same_identity(&self, other: &FileEntry) -> bool {
        self.len == other.len && self.modified == other.modified
    }
}

/// Outcome of comparing a source file with its mapped destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Destination does not exist.
    NeedsCopy,
    /// Destination exists with identical size and modification time.
    Match,
    /// Destination exists but size or modification time differs.
    Mismatch,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::NeedsCopy => "needs_copy",
            Classification::Match => "match",
            Classification::Mismatch => "mismatch",
        })
    }
}

/// Classify `source` against `destination`.
///
/// The source is expected to exist. Stat failures (other than the
/// destination being absent) are returned as-is; there is no retry here,
/// re-running the whole classification is cheap.
pub fn classify(source: &Path, destination: &Path) -> io::Result<Classification> {
    let dest = match FileEntry::stat(destination) {
        Ok(entry) => entry,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Classification::NeedsCopy),
        Err(e) => return Err(e),
    };
    let src = FileEntry::stat(source)?;

    if src.same_identity(&dest) {
        Ok(Classification::Match)
    } else {
        Ok(Classification::Mismatch)
    }
}
