//! Handle acquisition for the copy stage.
//!
//! The engine opens its handles through [`TransferIo`] so the read/write pair
//! can be swapped (e.g. to inject faults). Handles are plain owned values;
//! they close when dropped, on success and on every error path.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

/// A writable, seekable destination that can also be cut to length.
pub trait Destination: Write + Seek {
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl Destination for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// Opens the source and destination handles for one copy attempt.
pub trait TransferIo {
    type Source: Read + Seek;
    type Dest: Destination;

    fn open_source(&mut self, path: &Path) -> io::Result<Self::Source>;

    /// Open for writing, creating if absent. Existing bytes must be kept:
    /// a previous attempt's prefix is reused.
    fn open_destination(&mut self, path: &Path) -> io::Result<Self::Dest>;
}

/// Real files via `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdIo;

impl TransferIo for StdIo {
    type Source = File;
    type Dest = File;

    fn open_source(&mut self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn open_destination(&mut self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
    }
}
