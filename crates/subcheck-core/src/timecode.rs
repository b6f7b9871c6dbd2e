//! Timecode Parsing and Formatting
//!
//! Handles the timestamp variants emitted by different subtitle authoring
//! tools. The millisecond separator varies (`,`, `.`, or `:`); canonical
//! output always uses the comma of the SubRip convention.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::TimeSec;

/// Single timestamp: HH:MM:SS followed by a 3-digit millisecond group
/// separated by comma, dot, or colon.
static TIMECODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}):(\d{2}):(\d{2})[,.:](\d{3})$").expect("valid regex"));

/// Timecode range line: `<time> --> <time>` with flexible whitespace
/// around the arrow and flexible millisecond separators on both sides.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}[,.:]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.:]\d{3})")
        .expect("valid regex")
});

/// Parses a timestamp string into seconds.
///
/// Fails soft: unrecognized input returns `0.0`. Callers that need to
/// distinguish malformed timestamps must match the pattern upstream
/// (see [`parse_time_range`]).
pub fn parse_timecode(text: &str) -> TimeSec {
    let Some(caps) = TIMECODE_RE.captures(text.trim()) else {
        return 0.0;
    };

    // Groups are all digits, so the parses cannot fail.
    let hours: f64 = caps[1].parse().unwrap_or(0.0);
    let minutes: f64 = caps[2].parse().unwrap_or(0.0);
    let seconds: f64 = caps[3].parse().unwrap_or(0.0);
    let millis: f64 = caps[4].parse().unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0
}

/// Formats seconds as a canonical SubRip timestamp (`HH:MM:SS,mmm`).
pub fn format_timecode(seconds: TimeSec) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Parses a timecode-range line (`start --> end`).
///
/// Returns numeric start/end seconds together with canonical display
/// strings, or `None` if the line does not match the range pattern.
pub fn parse_time_range(line: &str) -> Option<(TimeSec, TimeSec, String, String)> {
    let caps = RANGE_RE.captures(line)?;

    let start = parse_timecode(&caps[1]);
    let end = parse_timecode(&caps[2]);

    Some((start, end, format_timecode(start), format_timecode(end)))
}

// =============================================================================
// Tests
// =============================================================================
