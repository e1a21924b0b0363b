//! Fixed-backoff, unbounded retry.
//!
//! Every filesystem step of a transfer runs through [`RetryPolicy::run`]:
//! on failure the error is logged, the policy sleeps for its wait, and the
//! same step is attempted again. There is no attempt cap and no escalation.

use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::CopyError;

/// Default wait between a failure and its retry.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }

    /// Run `op` until it succeeds, returning its value.
    ///
    /// `step` names the operation in log output. `op` receives the 1-based
    /// attempt number.
    pub fn run<T, F>(&self, step: &str, mut op: F) -> T
    where
        F: FnMut(u64) -> Result<T, CopyError>,
    {
        let mut attempt = 1u64;
        loop {
            match op(attempt) {
                Ok(value) => return value,
                Err(e) => {
                    warn!(step, attempt, kind = e.kind(), error = %e, "Error {step}");
                    self.backoff();
                    attempt += 1;
                }
            }
        }
    }

    /// Sleep for the configured wait. `thread::sleep` cannot be interrupted
    /// from inside the process; a signal either terminates us or is ignored.
    fn backoff(&self) {
        info!("Waiting {}s...", self.wait.as_secs_f64());
        thread::sleep(self.wait);
        info!("Retrying...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    fn transient() -> CopyError {
        CopyError::io("read", Path::new("/mnt/share/a.bin"))(io::Error::other("transient"))
    }

    #[test]
    fn returns_first_success_without_waiting() {
        let policy = RetryPolicy::new(Duration::from_secs(3600));
        let value: u32 = policy.run("noop", |_| Ok(7));
        assert_eq!(value, 7);
    }

    #[test]
    fn retries_until_success() {
        let policy = RetryPolicy::new(Duration::ZERO);
        let mut seen = Vec::new();
        let value = policy.run("flaky", |attempt| {
            seen.push(attempt);
            if attempt < 4 {
                Err(transient())
            } else {
                Ok("done")
            }
        });
        assert_eq!(value, "done");
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn default_wait_is_ten_seconds() {
        assert_eq!(RetryPolicy::default().wait, Duration::from_secs(10));
    }
}
