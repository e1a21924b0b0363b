//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request (`--init-config`).
//!
//! Notes:
//! - Every field is optional; missing fields keep their defaults.
//! - Unknown fields are rejected so typos surface instead of being ignored.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};
use crate::transfer::{DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_INTERVAL, DEFAULT_RETRY_WAIT};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    buffer_size: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    retry_wait_seconds: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    progress_interval_seconds: Option<u64>,
    overwrite: Option<bool>,
    raw_bytes: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

// Trims surrounding whitespace; a non-numeric value is an error, an empty one is "unset".
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
    }
}

// Map XmlConfig -> Config on top of defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(n) = parsed.buffer_size {
        cfg.buffer_size = usize::try_from(n)
            .map_err(|_| anyhow!("buffer_size {n} does not fit in memory on this platform"))?;
    }
    if let Some(secs) = parsed.retry_wait_seconds {
        cfg.retry_wait = Duration::from_secs(secs);
    }
    if let Some(secs) = parsed.progress_interval_seconds {
        cfg.progress_interval = Duration::from_secs(secs);
    }
    cfg.overwrite = parsed.overwrite.unwrap_or(false);
    cfg.raw_bytes = parsed.raw_bytes.unwrap_or(false);

    if let Some(s) = parsed.log_level.as_deref() {
        cfg.log_level = LogLevel::parse(s).ok_or_else(|| anyhow!("invalid log_level '{}'", s.trim()))?;
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }

    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid config xml '{}'", path.display()))
}

/// Load the config in use (see [`default_config_path`]).
///
/// A missing file yields defaults, except when `ROBUST_COPY_CONFIG` names it
/// explicitly: then a missing file is an error.
pub fn load_config() -> Result<Config> {
    let explicit = std::env::var_os(super::paths::CONFIG_ENV).is_some_and(|v| !v.is_empty());
    match default_config_path() {
        Some(path) if path.exists() => load_config_from_xml_path(&path),
        Some(path) if explicit => bail!(
            "config file named by {} does not exist: {}",
            super::paths::CONFIG_ENV,
            path.display()
        ),
        _ => Ok(Config::default()),
    }
}

/// Create a commented template config file and its parent directory.
/// Refuses to overwrite an existing file or to write through a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/robust_copy.log".into());

    let content = format!(
        "<!--\n  robust_copy configuration (XML). CLI flags override these values.\n\n    buffer_size                -> bytes per read/write chunk\n    retry_wait_seconds         -> wait between a failure and its retry\n    progress_interval_seconds  -> minimum gap between progress lines\n    overwrite                  -> also copy files whose size or mtime differ (true/false)\n    raw_bytes                  -> print sizes as raw byte counts (true/false)\n    log_level                  -> quiet | normal | info | debug\n    log_file                   -> optional log file (console output is kept)\n-->\n<config>\n  <buffer_size>{}</buffer_size>\n  <retry_wait_seconds>{}</retry_wait_seconds>\n  <progress_interval_seconds>{}</progress_interval_seconds>\n  <overwrite>false</overwrite>\n  <raw_bytes>false</raw_bytes>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        DEFAULT_BUFFER_SIZE,
        DEFAULT_RETRY_WAIT.as_secs(),
        DEFAULT_PROGRESS_INTERVAL.as_secs(),
        suggested_log
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
