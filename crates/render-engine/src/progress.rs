//! Encoder progress parsing and stage-weighted percentages.

use hudclip_common::clock::parse_timecode;

/// Progress mark emitted when the intro stage starts.
pub const INTRO_PROGRESS: u8 = 95;
/// Progress mark emitted when the concat stage starts.
pub const CONCAT_PROGRESS: u8 = 99;
/// Emitted only after the output has been delivered.
pub const COMPLETE_PROGRESS: u8 = 100;

/// Extract the encoder's current output position (seconds) from one line.
///
/// Understands the `-progress` keys (`out_time`, `out_time_us`,
/// `out_time_ms`; the latter two are both microseconds) and the classic
/// `time=HH:MM:SS.ff` stats marker.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let trimmed = line.trim();
    if let Some((key, value)) = trimmed.split_once('=') {
        let value = value.trim();
        match key.trim() {
            "out_time_us" | "out_time_ms" => {
                return value
                    .parse::<f64>()
                    .ok()
                    .filter(|us| *us >= 0.0)
                    .map(|us| us / 1_000_000.0);
            }
            "out_time" => return parse_timecode(value),
            _ => {}
        }
    }

    let start = trimmed.find("time=")?;
    let value = trimmed[start + "time=".len()..].split_whitespace().next()?;
    parse_timecode(value)
}

/// Converts core-stage encoder positions into monotone 0-100 progress.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    core_duration_secs: f64,
    core_weight: f64,
    last_emitted: Option<u8>,
}

impl ProgressReporter {
    /// `core_weight` is the share of the bar owned by the core stage
    /// (1.0 without an intro, 0.8 with one).
    pub fn new(core_duration_secs: f64, core_weight: f64) -> Self {
        Self {
            core_duration_secs,
            core_weight: core_weight.clamp(0.0, 1.0),
            last_emitted: None,
        }
    }

    /// Percentage for `elapsed_secs` of core output; never reaches 100.
    pub fn core_percent(&self, elapsed_secs: f64) -> u8 {
        if self.core_duration_secs <= 0.0 || !elapsed_secs.is_finite() {
            return 0;
        }
        let ceiling = 100.0 * self.core_weight;
        let value = (elapsed_secs.max(0.0) / self.core_duration_secs * ceiling).min(ceiling);
        (value.floor() as u8).min(COMPLETE_PROGRESS - 1)
    }

    /// Feed one encoder line; returns a value to emit when progress advanced.
    pub fn observe_line(&mut self, line: &str) -> Option<u8> {
        let secs = parse_out_time(line)?;
        self.advance_to(self.core_percent(secs))
    }

    /// Returns `value` if it is above everything emitted so far.
    pub fn advance_to(&mut self, value: u8) -> Option<u8> {
        match self.last_emitted {
            Some(last) if value <= last => None,
            _ => {
                self.last_emitted = Some(value);
                Some(value)
            }
        }
    }

    pub fn last_emitted(&self) -> Option<u8> {
        self.last_emitted
    }
}
