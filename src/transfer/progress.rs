//! Per-transfer progress telemetry.
//!
//! A [`ProgressTracker`] decides when a line is due (every interval, plus a
//! guaranteed final line) and renders it. Lines are handed to a
//! [`ProgressSink`], which decouples the engine from where text ends up.

use std::time::{Duration, Instant};

use crate::format::{SizeFormat, time_elapsed, time_left};
use crate::output;

/// Default minimum gap between two progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(9);

/// Gaps at or above this are not used for the instantaneous rate.
const MAX_RATE_WINDOW: Duration = Duration::from_secs(100);

/// Receives line-oriented status text from a transfer.
pub trait ProgressSink {
    /// A transfer is starting.
    fn started(&mut self, line: &str);
    /// A throttled progress update.
    fn progress(&mut self, line: &str);
}

/// Writes progress to stdout through the `output` helpers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn started(&mut self, line: &str) {
        output::print_user(line);
    }

    fn progress(&mut self, line: &str) {
        output::print_user(line);
    }
}

/// Collects lines in memory; handy for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl ProgressSink for MemorySink {
    fn started(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn progress(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn started(&mut self, line: &str) {
        (**self).started(line)
    }

    fn progress(&mut self, line: &str) {
        (**self).progress(line)
    }
}

/// Snapshot fed to [`render_line`]; kept free of clocks so it is testable.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSample {
    pub copied: u64,
    pub total: u64,
    pub elapsed: Duration,
    /// Time and bytes since the previous line, if there was one.
    pub since_last: Option<(Duration, u64)>,
}

/// Format one progress line:
/// `elapsed  |  copied / total (pct%)  |  [Avg: x/s, Rem: t]  |  [Cur: y/s]`
pub fn render_line(sample: &ProgressSample, fmt: SizeFormat) -> String {
    let elapsed_secs = sample.elapsed.as_secs();
    let mut line = time_elapsed(elapsed_secs);

    let pct = if sample.total == 0 {
        100.0
    } else {
        sample.copied as f64 / sample.total as f64 * 100.0
    };
    line.push_str(&format!(
        "  |  {} / {} ({pct:.1}%)",
        fmt.size(sample.copied),
        fmt.size(sample.total)
    ));

    if elapsed_secs > 0 {
        let avg = sample.copied / elapsed_secs;
        line.push_str(&format!("  |  [Avg: {}/s", fmt.size(avg)));
        if avg > 0 {
            let remaining = sample.total.saturating_sub(sample.copied);
            line.push_str(&format!(", Rem: {}", time_left(remaining / avg)));
        }
        line.push(']');
    }

    if let Some((gap, bytes)) = sample.since_last {
        let gap_ms = gap.as_millis();
        if gap_ms > 0 && gap < MAX_RATE_WINDOW && bytes > 0 {
            let cur = (bytes as u128 * 1000 / gap_ms) as u64;
            line.push_str(&format!("  |  [Cur: {}/s]", fmt.size(cur)));
        }
    }

    line
}

/// Throttling state for one transfer. Re-created for every file.
#[derive(Debug)]
pub struct ProgressTracker {
    interval: Duration,
    format: SizeFormat,
    started: Instant,
    last_print: Option<Instant>,
    last_bytes: u64,
}

impl ProgressTracker {
    pub fn new(interval: Duration, format: SizeFormat) -> Self {
        Self {
            interval,
            format,
            started: Instant::now(),
            last_print: None,
            last_bytes: 0,
        }
    }

    /// Record `copied` of `total` bytes; returns a line when one is due.
    /// A line is always produced once `copied == total`.
    pub fn update(&mut self, copied: u64, total: u64) -> Option<String> {
        self.update_at(Instant::now(), copied, total)
    }

    fn update_at(&mut self, now: Instant, copied: u64, total: u64) -> Option<String> {
        let due = match self.last_print {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if !due && copied != total {
            return None;
        }

        let since_last = self.last_print.map(|last| {
            (
                now.saturating_duration_since(last),
                copied.saturating_sub(self.last_bytes),
            )
        });
        let sample = ProgressSample {
            copied,
            total,
            elapsed: now.saturating_duration_since(self.started),
            since_last,
        };
        self.last_print = Some(now);
        self.last_bytes = copied;
        Some(render_line(&sample, self.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn line_without_elapsed_time_skips_rates() {
        let s = ProgressSample {
            copied: 512,
            total: 1024,
            elapsed: Duration::from_millis(300),
            since_last: None,
        };
        assert_eq!(render_line(&s, SizeFormat::Binary), "0:00  |  512 B / 1.0 KiB (50.0%)");
    }

    #[test]
    fn line_with_average_and_remaining() {
        let s = ProgressSample {
            copied: 10 * MIB,
            total: 40 * MIB,
            elapsed: Duration::from_secs(10),
            since_last: None,
        };
        assert_eq!(
            render_line(&s, SizeFormat::Binary),
            "0:10  |  10.0 MiB / 40.0 MiB (25.0%)  |  [Avg: 1.0 MiB/s, Rem: 30s]"
        );
    }

    #[test]
    fn line_with_current_rate() {
        let s = ProgressSample {
            copied: 20 * MIB,
            total: 40 * MIB,
            elapsed: Duration::from_secs(20),
            since_last: Some((Duration::from_secs(10), 18 * MIB)),
        };
        let line = render_line(&s, SizeFormat::Binary);
        assert!(line.ends_with("  |  [Cur: 1.8 MiB/s]"), "{line}");
    }

    #[test]
    fn current_rate_skipped_for_stale_or_empty_windows() {
        let mut s = ProgressSample {
            copied: 100,
            total: 200,
            elapsed: Duration::from_secs(0),
            since_last: Some((Duration::from_secs(200), 50)),
        };
        assert!(!render_line(&s, SizeFormat::Raw).contains("Cur"));
        s.since_last = Some((Duration::from_secs(5), 0));
        assert!(!render_line(&s, SizeFormat::Raw).contains("Cur"));
        s.since_last = Some((Duration::ZERO, 10));
        assert!(!render_line(&s, SizeFormat::Raw).contains("Cur"));
    }

    #[test]
    fn raw_format_is_used_throughout() {
        let s = ProgressSample {
            copied: 1536,
            total: 3072,
            elapsed: Duration::from_secs(1),
            since_last: None,
        };
        assert_eq!(
            render_line(&s, SizeFormat::Raw),
            "0:01  |  1536 B / 3072 B (50.0%)  |  [Avg: 1536 B/s, Rem: 1s]"
        );
    }

    #[test]
    fn tracker_throttles_but_always_emits_final_line() {
        let mut t = ProgressTracker::new(Duration::from_secs(9), SizeFormat::Binary);
        let base = t.started;
        assert!(t.update_at(base, 10, 100).is_some(), "first update prints");
        assert!(t.update_at(base + Duration::from_secs(1), 20, 100).is_none());
        assert!(t.update_at(base + Duration::from_secs(9), 30, 100).is_some());
        let last = t.update_at(base + Duration::from_secs(10), 100, 100).unwrap();
        assert!(last.contains("(100.0%)"), "{last}");
    }
}
