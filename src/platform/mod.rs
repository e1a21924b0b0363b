//! Platform-specific helpers.
//! Hides the Unix/Windows differences around file modes for the log and config files.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{open_log_file_secure_append, set_dir_mode_0700, write_config_secure_new_0600};

#[cfg(not(unix))]
pub use windows::{open_log_file_secure_append, set_dir_mode_0700, write_config_secure_new_0600};
