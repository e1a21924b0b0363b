//! Human-readable sizes and durations for progress and listings.
//!
//! Sizes are binary-prefix scaled with one decimal (`1.5 KiB`) unless the
//! caller asks for raw bytes. Durations come in two shapes: a clock form for
//! elapsed time (`1:01:00`) and a labelled form for estimates (`1h 1m 0s`).

/// How byte counts are rendered. Passed explicitly; there is no global switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeFormat {
    /// Binary prefixes with one decimal place (default).
    #[default]
    Binary,
    /// Plain byte count, e.g. `1536 B`.
    Raw,
}

impl SizeFormat {
    pub fn from_raw_flag(raw_bytes: bool) -> Self {
        if raw_bytes { SizeFormat::Raw } else { SizeFormat::Binary }
    }

    /// Render `bytes` according to this format.
    pub fn size(self, bytes: u64) -> String {
        match self {
            SizeFormat::Raw => format!("{bytes} B"),
            SizeFormat::Binary => binary_size(bytes),
        }
    }
}

const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

// Threshold just below 1024 * 1023.95 so values that would print as "1024.0"
// roll over to the next unit instead.
const ROLLOVER: u64 = 0x0fff_cccc_cccc_cccc;

fn binary_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes;
    let mut unit = 0usize;
    let mut shift = 40i32;
    while shift >= 0 && bytes > ROLLOVER >> shift {
        value >>= 10;
        unit += 1;
        shift -= 10;
    }
    format!("{:.1} {}iB", value as f64 / 1024.0, UNITS[unit])
}

fn split_hms(total_secs: u64) -> (u64, u64, u64) {
    (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60)
}

/// Clock form for elapsed time: `M:SS`, or `H:MM:SS` from one hour on.
pub fn time_elapsed(total_secs: u64) -> String {
    let (h, m, s) = split_hms(total_secs);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Labelled form for remaining-time estimates, omitting leading zero units.
pub fn time_left(total_secs: u64) -> String {
    let (h, m, s) = split_hms(total_secs);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}
