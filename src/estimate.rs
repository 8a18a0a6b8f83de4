//! Heuristic slide count and running-time estimate.
//!
//! The client never parses the PDF. It scans the raw bytes for page objects
//! (`/Type /Page`) and counts them. Encrypted, compressed object streams or
//! linearised files can make the count wrong; the number is only used to show
//! the user a ballpark running time before the job is submitted.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Matches a page object marker. `\b` keeps `/Pages` (the page tree root)
/// out of the count.
static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").unwrap());

/// Estimate the number of pages in `bytes`.
///
/// Returns the number of page markers found, or 1 when none are found: a file
/// that made it through intake has at least one page even if the heuristic
/// cannot see it.
pub fn count_pages(bytes: &[u8]) -> usize {
    let found = PAGE_MARKER.find_iter(bytes).count();
    if found == 0 {
        1
    } else {
        found
    }
}

/// Total running time in seconds for `pages` slides of `duration` seconds.
pub fn estimated_total_secs(pages: usize, duration: f64) -> f64 {
    pages as f64 * duration
}

/// Format a running time as `"35s"` or `"2m 5s"`.
///
/// Fractional seconds are rounded to the nearest whole second.
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Estimated running time, formatted, or `None` while the page count is
/// still unknown (0).
pub fn describe_estimate(pages: usize, duration: f64) -> Option<String> {
    (pages > 0).then(|| format_duration(estimated_total_secs(pages, duration)))
}
