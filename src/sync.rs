//! Tree reconciliation: walk the source, classify every file against its
//! mirror under the destination root, list the buckets, then transfer.
//!
//! The source root's own directory name is kept, so `/data/photos` mirrored
//! into `/backup` lands in `/backup/photos/...`.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf, StripPrefixError};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify::{Classification, classify};
use crate::config::Config;
use crate::format::SizeFormat;
use crate::output as out;
use crate::transfer::{CopyTask, ProgressSink, TransferEngine, TransferIo, TransferOutcome};

/// Buckets produced by one reconciliation run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Destination already has the same size and mtime.
    pub matching: Vec<PathBuf>,
    /// Destination exists but differs.
    pub mismatching: Vec<PathBuf>,
    /// Files selected for transfer, in walk order.
    pub to_copy: Vec<CopyTask>,
    /// Files that could not be classified or sized, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// One entry per completed transfer (empty on a dry run).
    pub transferred: Vec<TransferOutcome>,
}

impl SyncReport {
    pub fn bytes_transferred(&self) -> u64 {
        self.transferred.iter().map(|t| t.bytes).sum()
    }
}

/// Destination path for `file`: `dest_root/<source root name>/<path below source root>`.
pub fn map_destination(
    source_root: &Path,
    dest_root: &Path,
    file: &Path,
) -> Result<PathBuf, StripPrefixError> {
    let rel = file.strip_prefix(source_root)?;
    Ok(match source_root.file_name() {
        Some(name) => dest_root.join(name).join(rel),
        None => dest_root.join(rel),
    })
}

/// Walk `source_root` and classify each regular file. Does not print or copy.
///
/// Unreadable entries below the root are logged and skipped; files whose
/// classification fails end up in [`SyncReport::failed`].
pub fn plan(source_root: &Path, dest_root: &Path, overwrite: bool) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let walker = WalkDir::new(source_root)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("walk source '{}'", source_root.display()));
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let ft = entry.file_type();
        if ft.is_symlink() {
            debug!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }
        if !ft.is_file() {
            continue;
        }

        let source = entry.path();
        let destination = map_destination(source_root, dest_root, source)
            .with_context(|| format!("map '{}' under destination", source.display()))?;

        match classify(source, &destination) {
            Ok(Classification::NeedsCopy) => queue_copy(&mut report, &entry, destination),
            Ok(Classification::Match) => report.matching.push(source.to_path_buf()),
            Ok(Classification::Mismatch) => {
                report.mismatching.push(source.to_path_buf());
                if overwrite {
                    queue_copy(&mut report, &entry, destination);
                }
            }
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Could not classify file");
                report.failed.push((source.to_path_buf(), e.to_string()));
            }
        }
    }

    info!(
        matching = report.matching.len(),
        mismatching = report.mismatching.len(),
        to_copy = report.to_copy.len(),
        failed = report.failed.len(),
        "Classification complete"
    );
    Ok(report)
}

/// Queue `entry` for copying, or record it as failed when its size cannot be read.
fn queue_copy(report: &mut SyncReport, entry: &walkdir::DirEntry, destination: PathBuf) {
    let source = entry.path().to_path_buf();
    match entry.metadata() {
        Ok(meta) => report.to_copy.push(CopyTask {
            source,
            destination,
            size: meta.len(),
        }),
        Err(e) => {
            warn!(path = %source.display(), error = %e, "Could not read file size");
            report.failed.push((source, e.to_string()));
        }
    }
}

/// Print each non-empty bucket followed by a blank line.
pub fn print_plan(report: &SyncReport, overwrite: bool, format: SizeFormat) {
    if !report.matching.is_empty() {
        out::print_heading("+ + + + Existing matching files (size and modify date) + + + +");
        for p in &report.matching {
            out::print_user(&p.display().to_string());
        }
        out::print_blank();
    }

    if !report.mismatching.is_empty() {
        let action = if overwrite { "overwriting" } else { "skipping" };
        out::print_heading(&format!("- - - - Existing mismatching files, {action} - - - -"));
        for p in &report.mismatching {
            out::print_user(&p.display().to_string());
        }
        out::print_blank();
    }

    if !report.to_copy.is_empty() {
        out::print_heading("* * * * Files to Copy * * * *");
        for t in &report.to_copy {
            out::print_user(&format!(
                "{} => {} ({})",
                t.source.display(),
                t.destination.display(),
                format.size(t.size)
            ));
        }
        out::print_blank();
    }

    if !report.failed.is_empty() {
        out::print_heading("! ! ! ! Files that could not be checked ! ! ! !");
        for (p, reason) in &report.failed {
            out::print_warn(&format!("{}: {reason}", p.display()));
        }
        out::print_blank();
    }
}

/// Full run: announce roots, plan, list buckets, then transfer (unless dry run).
pub fn run<I: TransferIo, S: ProgressSink>(
    cfg: &Config,
    engine: &mut TransferEngine<I, S>,
) -> Result<SyncReport> {
    if !cfg.source.is_dir() {
        bail!("source is not a directory: {}", cfg.source.display());
    }

    out::print_user(&format!("Copy from: {}", cfg.source.display()));
    out::print_user(&format!("Copy to: {}", cfg.destination.display()));
    out::print_blank();

    let mut report = plan(&cfg.source, &cfg.destination, cfg.overwrite)?;
    print_plan(&report, cfg.overwrite, cfg.size_format());

    if cfg.dry_run {
        out::print_user("Dry Run Complete");
        return Ok(report);
    }

    for t in &report.to_copy {
        let outcome = engine.run_task(t);
        debug!(
            path = %t.destination.display(),
            bytes = outcome.bytes,
            attempts = outcome.copy_attempts,
            "Transfer complete"
        );
        report.transferred.push(outcome);
        out::print_blank();
    }

    info!(
        files = report.transferred.len(),
        bytes = report.bytes_transferred(),
        "Run complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_keeps_source_root_name() {
        let got = map_destination(
            Path::new("/data/photos"),
            Path::new("/backup"),
            Path::new("/data/photos/2024/a.jpg"),
        )
        .unwrap();
        assert_eq!(got, PathBuf::from("/backup/photos/2024/a.jpg"));
    }

    #[test]
    fn mapping_rejects_files_outside_root() {
        assert!(
            map_destination(
                Path::new("/data/photos"),
                Path::new("/backup"),
                Path::new("/data/other/a.jpg"),
            )
            .is_err()
        );
    }

    #[cfg(unix)]
    #[test]
    fn mapping_from_filesystem_root_has_no_name_segment() {
        let got = map_destination(Path::new("/"), Path::new("/backup"), Path::new("/etc/hosts"))
            .unwrap();
        assert_eq!(got, PathBuf::from("/backup/etc/hosts"));
    }

    #[test]
    fn vanished_file_is_recorded_as_failed_not_queued_empty() {
        let td = tempfile::tempdir().unwrap();
        let file = td.path().join("gone.bin");
        std::fs::write(&file, vec![9u8; 64]).unwrap();
        let entry = WalkDir::new(&file).into_iter().next().unwrap().unwrap();
        std::fs::remove_file(&file).unwrap();

        let mut report = SyncReport::default();
        queue_copy(&mut report, &entry, td.path().join("dst").join("gone.bin"));
        assert!(report.to_copy.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, file);

        std::fs::write(&file, vec![9u8; 64]).unwrap();
        let entry = WalkDir::new(&file).into_iter().next().unwrap().unwrap();
        queue_copy(&mut report, &entry, td.path().join("dst").join("gone.bin"));
        assert_eq!(report.to_copy.len(), 1);
        assert_eq!(report.to_copy[0].size, 64);
    }
}
