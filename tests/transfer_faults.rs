use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use robust_copy::transfer::io::{Destination, StdIo, TransferIo};
use robust_copy::transfer::MemorySink;
use robust_copy::{RetryPolicy, SizeFormat, TransferEngine, TransferSettings};
use tempfile::tempdir;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt as tsfmt, registry};

const BUF: usize = 4096;

fn settings() -> TransferSettings {
    TransferSettings {
        buffer_size: BUF,
        retry: RetryPolicy::new(Duration::ZERO),
        progress_interval: Duration::from_secs(3600),
        size_format: SizeFormat::Raw,
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

/// Faults applied once each, the first time the matching handle is opened.
#[derive(Default)]
struct FaultyIo {
    failing_source_opens: u32,
    short_write_on: Option<usize>,
    read_error_after: Option<u64>,
}

struct FlakySource {
    inner: File,
    pos: u64,
    fail_at: Option<u64>,
}

impl Read for FlakySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(limit) = self.fail_at
            && self.pos >= limit
        {
            return Err(io::Error::other("share went away"));
        }
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for FlakySource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.inner.seek(pos)?;
        Ok(self.pos)
    }
}

struct ShortWriter {
    inner: File,
    writes: usize,
    short_on: Option<usize>,
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        if self.short_on == Some(self.writes) {
            return self.inner.write(&buf[..buf.len() / 2]);
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for ShortWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Destination for ShortWriter {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.inner.set_len(len)
    }
}

impl TransferIo for FaultyIo {
    type Source = FlakySource;
    type Dest = ShortWriter;

    fn open_source(&mut self, path: &Path) -> io::Result<FlakySource> {
        if self.failing_source_opens > 0 {
            self.failing_source_opens -= 1;
            return Err(io::Error::new(io::ErrorKind::NotFound, "not mounted"));
        }
        Ok(FlakySource {
            inner: StdIo.open_source(path)?,
            pos: 0,
            fail_at: self.read_error_after.take(),
        })
    }

    fn open_destination(&mut self, path: &Path) -> io::Result<ShortWriter> {
        Ok(ShortWriter {
            inner: StdIo.open_destination(path)?,
            writes: 0,
            short_on: self.short_write_on.take(),
        })
    }
}

#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a scoped subscriber and return everything it logged.
fn capture_logs(f: impl FnOnce()) -> String {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let make_writer = {
        let buf = buf.clone();
        move || BufferWriter(buf.clone())
    };
    let layer = tsfmt::layer()
        .with_writer(make_writer)
        .with_target(false)
        .with_ansi(false)
        .compact();
    let dispatch = tracing::Dispatch::new(registry().with(EnvFilter::new("info")).with(layer));
    tracing::dispatcher::with_default(&dispatch, f);
    let guard = buf.lock().unwrap();
    String::from_utf8_lossy(&guard[..]).to_string()
}

#[test]
fn short_write_is_reported_once_and_resumed_two_buffers_back() {
    let td = tempdir().unwrap();
    let src = td.path().join("in.bin");
    let dst = td.path().join("out.bin");
    let data = pattern(10 * BUF + 123);
    fs::write(&src, &data).unwrap();

    let io = FaultyIo {
        short_write_on: Some(5),
        ..Default::default()
    };
    let mut engine = TransferEngine::with_parts(settings(), io, MemorySink::default());

    let mut outcome = None;
    let logs = capture_logs(|| outcome = Some(engine.transfer(&src, &dst)));
    let outcome = outcome.unwrap();

    // Four full chunks landed before the short fifth write; rewind by two.
    assert_eq!(outcome.resume_offsets, vec![0, 2 * BUF as u64]);
    assert_eq!(outcome.copy_attempts, 2);
    assert_eq!(fs::read(&dst).unwrap(), data);
    assert_eq!(
        logs.matches("bytes mismatch, read: 4096, write: 2048").count(),
        1,
        "{logs}"
    );
    assert!(logs.contains("copy_integrity"), "{logs}");
    assert!(logs.contains("Restarting at: 8192 B"), "{logs}");
    assert!(logs.contains("Retrying..."), "{logs}");
}

#[test]
fn unavailable_source_is_retried_until_it_opens() {
    let td = tempdir().unwrap();
    let src = td.path().join("in.bin");
    let dst = td.path().join("nested").join("out.bin");
    let data = pattern(3 * BUF);
    fs::write(&src, &data).unwrap();

    let io = FaultyIo {
        failing_source_opens: 3,
        ..Default::default()
    };
    let mut engine = TransferEngine::with_parts(settings(), io, MemorySink::default());
    let outcome = engine.transfer(&src, &dst);

    assert_eq!(outcome.copy_attempts, 4);
    assert_eq!(outcome.resume_offsets, vec![0]);
    assert_eq!(fs::read(&dst).unwrap(), data);
}

#[test]
fn read_failure_mid_copy_resumes_without_losing_bytes() {
    let td = tempdir().unwrap();
    let src = td.path().join("in.bin");
    let dst = td.path().join("out.bin");
    let data = pattern(8 * BUF + 1);
    fs::write(&src, &data).unwrap();

    let io = FaultyIo {
        read_error_after: Some(6 * BUF as u64),
        ..Default::default()
    };
    let mut engine = TransferEngine::with_parts(settings(), io, MemorySink::default());
    let outcome = engine.transfer(&src, &dst);

    assert_eq!(outcome.resume_offsets, vec![0, 4 * BUF as u64]);
    assert_eq!(fs::read(&dst).unwrap(), data);
    let mtime_src = filetime::FileTime::from_last_modification_time(&fs::metadata(&src).unwrap());
    let mtime_dst = filetime::FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
    assert_eq!(mtime_src, mtime_dst);
}
