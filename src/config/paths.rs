//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ROBUST_COPY_CONFIG";

const APP_DIR: &str = "robust_copy";

/// Config path in use: `$ROBUST_COPY_CONFIG` if set, else the OS config dir.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    if let Some(mut base) = config_dir() {
        base.push(APP_DIR);
        base.push("config.xml");
        Some(base)
    } else {
        env::var("HOME").ok().map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join(APP_DIR)
                .join("config.xml")
        })
    }
}

/// Default log file path: next to `$ROBUST_COPY_CONFIG` when set, else the OS data dir.
pub fn default_log_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty())
        && let Some(parent) = Path::new(&explicit).parent()
    {
        return Some(parent.join("robust_copy.log"));
    }
    if let Some(mut base) = data_dir() {
        base.push(APP_DIR);
        base.push("robust_copy.log");
        Some(base)
    } else {
        env::var("HOME").ok().map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join("robust_copy.log")
        })
    }
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

/// Real location of `path`, which may not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail is re-applied lexically.
pub fn resolve_through_existing_ancestor(path: &Path) -> PathBuf {
    let mut tail: Vec<Component<'_>> = Vec::new();
    let mut cur = path;
    loop {
        if let Ok(real) = dunce::canonicalize(cur) {
            return push_components(real, tail.into_iter().rev());
        }
        let mut comps = cur.components();
        match comps.next_back() {
            Some(c @ (Component::Normal(_) | Component::CurDir | Component::ParentDir)) => {
                tail.push(c);
                cur = comps.as_path();
            }
            _ => return normalize_lexically(path),
        }
    }
}

/// Fold `.` and `..` without touching the filesystem. `..` never climbs
/// above a root; leading `..` of a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    push_components(PathBuf::new(), path.components())
}

fn push_components<'a>(mut out: PathBuf, comps: impl IntoIterator<Item = Component<'a>>) -> PathBuf {
    for c in comps {
        match c {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
