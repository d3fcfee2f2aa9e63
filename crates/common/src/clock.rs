//! Clock and timecode utilities.
//!
//! Every render job is anchored to a clock captured when the job starts.
//! This module provides utilities for:
//! - Capturing the job epoch (monotonic and wall-clock)
//! - Parsing and formatting `HH:MM:SS.ff` timecodes
//! - Detecting stalled encoder progress

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A job clock that provides monotonic elapsed time relative to a fixed
/// epoch (the moment the job started).
#[derive(Debug, Clone)]
pub struct JobClock {
    /// The instant the job started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Utc>,
}

impl JobClock {
    /// Create a new job clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Seconds elapsed since the job started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at job start (RFC 3339).
    pub fn epoch_wall(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }

    /// Unix timestamp (seconds) at job start, used to name temp artifacts.
    pub fn unix_stamp(&self) -> i64 {
        self.epoch_wall.timestamp()
    }
}

/// Parse a timecode into seconds.
///
/// Accepts `HH:MM:SS(.ff)`, `MM:SS(.ff)` and plain seconds. Negative or
/// malformed input yields `None`.
pub fn parse_timecode(input: &str) -> Option<f64> {
    let parts: Vec<&str> = input.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        [s] => (0, 0, *s),
        _ => return None,
    };
    let seconds = seconds.parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_timecode(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Detects an encoder that stopped advancing its output timestamp.
#[derive(Debug)]
pub struct StallWatch {
    threshold: Duration,
    last_value: f64,
    last_advance: Instant,
}

impl StallWatch {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_value: 0.0,
            last_advance: Instant::now(),
        }
    }

    /// Record an observed position. Returns true when the position has not
    /// advanced for longer than the threshold; the timer re-arms afterwards
    /// so a stall is reported at most once per threshold window.
    pub fn observe(&mut self, value: f64) -> bool {
        self.observe_at(value, Instant::now())
    }

    fn observe_at(&mut self, value: f64, now: Instant) -> bool {
        if value > self.last_value + 0.001 {
            self.last_value = value;
            self.last_advance = now;
            return false;
        }
        if now.duration_since(self.last_advance) >= self.threshold {
            self.last_advance = now;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = JobClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(clock.unix_stamp() > 0);
    }

    #[test]
    fn test_parse_timecode_forms() {
        assert_eq!(parse_timecode("00:01:02.50"), Some(62.5));
        assert_eq!(parse_timecode("1:30"), Some(90.0));
        assert_eq!(parse_timecode("42.25"), Some(42.25));
        assert_eq!(parse_timecode("01:00:00"), Some(3600.0));
    }

    #[test]
    fn test_parse_timecode_rejects_garbage() {
        assert_eq!(parse_timecode(""), None);
        assert_eq!(parse_timecode("N/A"), None);
        assert_eq!(parse_timecode("-00:00:01"), None);
        assert_eq!(parse_timecode("1:2:3:4"), None);
        assert_eq!(parse_timecode("-5"), None);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(62.5), "00:01:02.500");
        assert_eq!(format_timecode(3661.001), "01:01:01.001");
        assert_eq!(format_timecode(-3.0), "00:00:00.000");
    }

    #[test]
    fn test_stall_watch() {
        let start = Instant::now();
        let mut watch = StallWatch::new(Duration::from_secs(10));
        watch.last_advance = start;

        assert!(!watch.observe_at(1.0, start + Duration::from_secs(1)));
        assert!(!watch.observe_at(1.0, start + Duration::from_secs(5)));
        assert!(watch.observe_at(1.0, start + Duration::from_secs(12)));
        // Re-armed after reporting.
        assert!(!watch.observe_at(1.0, start + Duration::from_secs(13)));
        assert!(!watch.observe_at(2.0, start + Duration::from_secs(30)));
    }
}
