//! Config validation logic.
//! Verifies the source root, the destination root and their relationship before any work starts.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::paths::{normalize_lexically, resolve_through_existing_ancestor};
use super::types::Config;
use crate::transfer::MAX_BUFFER_SIZE;

impl Config {
    /// Validate tunables and the two roots.
    ///
    /// - buffer_size must be in `1..=MAX_BUFFER_SIZE`.
    /// - source must exist, be a directory and be readable.
    /// - destination may be missing, but must not be an existing non-directory.
    /// - destination must not lie inside the source tree (the walk would
    ///   otherwise pick up its own output). `..` and symlinked ancestors are
    ///   resolved before comparing, even when the destination does not exist.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            bail!("buffer_size must be greater than zero");
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            bail!(
                "buffer_size {} exceeds the maximum of {MAX_BUFFER_SIZE} bytes",
                self.buffer_size
            );
        }

        let src = &self.source;
        let dst = &self.destination;

        ensure_dir_exists_and_is_dir(src, "source")?;
        fs::read_dir(src).with_context(|| {
            format!("Cannot read source directory '{}'; check permissions", src.display())
        })?;
        debug!("source readable: {}", src.display());

        if dst.exists() && !dst.is_dir() {
            error!("destination exists but isn't a directory: {}", dst.display());
            bail!("destination exists but isn't a directory: {}", dst.display());
        }

        let src_real = dunce::canonicalize(src).unwrap_or_else(|_| normalize_lexically(src));
        let dst_real = resolve_through_existing_ancestor(dst);
        debug!("destination resolves to {}", dst_real.display());
        if dst_real.starts_with(&src_real) {
            bail!(
                "destination '{}' must not be inside source '{}'",
                dst_real.display(),
                src_real.display()
            );
        }

        info!(
            "Config validated: source='{}' destination='{}' buffer={} retry_wait={}s",
            src.display(),
            dst.display(),
            self.buffer_size,
            self.retry_wait.as_secs()
        );
        Ok(())
    }
}

/// Ensure path exists and is a directory; emit clear errors with path context.
fn ensure_dir_exists_and_is_dir(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        error!("{name} does not exist: {}", path.display());
        bail!("{name} does not exist: {}", path.display());
    }
    if !path.is_dir() {
        error!("{name} is not a directory: {}", path.display());
        bail!("{name} is not a directory: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_disjoint_roots_with_missing_destination() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let cfg = Config::new(&src, td.path().join("backup"));
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_missing_source() {
        let td = tempdir().unwrap();
        let cfg = Config::new(td.path().join("nope"), td.path().join("dst"));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("source does not exist"), "{err}");
    }

    #[test]
    fn rejects_destination_inside_source() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(src.join("out")).unwrap();
        let cfg = Config::new(&src, src.join("out"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_file_as_destination() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let dst = td.path().join("file");
        fs::write(&dst, b"x").unwrap();
        assert!(Config::new(&src, &dst).validate().is_err());
    }

    #[test]
    fn rejects_zero_buffer() {
        let td = tempdir().unwrap();
        let mut cfg = Config::new(td.path(), td.path().join("dst"));
        cfg.buffer_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_buffer_above_maximum() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let mut cfg = Config::new(&src, td.path().join("dst"));
        cfg.buffer_size = MAX_BUFFER_SIZE + 1;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"), "{err}");

        cfg.buffer_size = MAX_BUFFER_SIZE;
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_missing_destination_that_climbs_back_into_source() {
        let td = tempdir().unwrap();
        let base = fs::canonicalize(td.path()).unwrap();
        let src = base.join("src");
        fs::create_dir_all(&src).unwrap();
        // `x` does not exist, so the destination cannot be canonicalized directly.
        let dst = base.join("x").join("..").join("src").join("out");
        let err = Config::new(&src, &dst).validate().unwrap_err();
        assert!(err.to_string().contains("must not be inside source"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn rejects_missing_destination_under_symlink_to_source() {
        let td = tempdir().unwrap();
        let base = fs::canonicalize(td.path()).unwrap();
        let src = base.join("src");
        fs::create_dir_all(&src).unwrap();
        let link = base.join("link");
        std::os::unix::fs::symlink(&src, &link).unwrap();
        let err = Config::new(&src, link.join("out")).validate().unwrap_err();
        assert!(err.to_string().contains("must not be inside source"), "{err}");
    }
}
