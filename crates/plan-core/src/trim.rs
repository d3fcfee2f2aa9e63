//! Trim window planning.
//!
//! Turns the user's start/end selection into the encoder's input seek
//! window plus the fade timings applied on the output side. When fades are
//! enabled the seek window is padded by one fade length on each side so the
//! fades play over footage outside the selection, unless the selection sits
//! too close to either end of the source.

use hudclip_common::error::{HudclipError, HudclipResult};
use serde::{Deserialize, Serialize};

/// Length of the video fade-in/out and of the seek padding.
pub const FADE_DURATION_SECS: f64 = 1.5;

/// Tolerance for the "too close to the edge" comparisons.
pub const EDGE_EPSILON_SECS: f64 = 0.01;

/// Input seek window and output fade timings for the core segment.
///
/// `seek_*` values are in source seconds. Everything else is in output
/// seconds (already divided by the speed factor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub seek_start_secs: f64,
    pub seek_length_secs: f64,
    pub output_duration_secs: f64,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    pub fade_out_start_secs: f64,
}

impl TrimWindow {
    pub fn has_fade_in(&self) -> bool {
        self.fade_in_secs > 0.0
    }

    pub fn has_fade_out(&self) -> bool {
        self.fade_out_secs > 0.0
    }
}

/// Configuration for the trim planner.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    pub fade_duration_secs: f64,
    pub edge_epsilon_secs: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            fade_duration_secs: FADE_DURATION_SECS,
            edge_epsilon_secs: EDGE_EPSILON_SECS,
        }
    }
}

/// Derives [`TrimWindow`]s from user selections.
pub struct TrimWindowPlanner {
    config: TrimConfig,
}

impl TrimWindowPlanner {
    pub fn new(config: TrimConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TrimConfig::default())
    }

    /// Plan the seek window for `[start, end]`.
    ///
    /// `total_secs` is the source duration, or 0 when unknown (no end
    /// clamping is possible then). `speed` must be positive.
    pub fn plan(
        &self,
        start_secs: f64,
        end_secs: f64,
        total_secs: f64,
        fades_enabled: bool,
        speed: f64,
    ) -> HudclipResult<TrimWindow> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(HudclipError::invalid_job(format!(
                "speed factor must be positive, got {speed}"
            )));
        }

        let fade = self.config.fade_duration_secs;
        let eps = self.config.edge_epsilon_secs;

        let (seek_start, seek_end, fade_in, fade_out) = if !fades_enabled {
            (start_secs, end_secs, 0.0, 0.0)
        } else {
            let (seek_start, fade_in) = if start_secs < fade - eps {
                tracing::debug!(start_secs, "Start too close to source start; no fade-in padding");
                (start_secs, 0.0)
            } else {
                ((start_secs - fade).max(0.0), fade)
            };

            let (seek_end, fade_out) = if total_secs > 0.0 && end_secs > total_secs - fade + eps {
                tracing::debug!(
                    end_secs,
                    total_secs,
                    "End too close to source end; no fade-out padding"
                );
                (end_secs.min(total_secs), 0.0)
            } else if total_secs > 0.0 {
                ((end_secs + fade).min(total_secs), fade)
            } else {
                (end_secs + fade, fade)
            };

            (seek_start, seek_end, fade_in, fade_out)
        };

        let seek_length = (seek_end - seek_start).max(0.0);
        let output_duration = seek_length / speed;
        if output_duration <= 0.0 {
            return Err(HudclipError::ZeroOrNegativeDuration {
                duration_secs: output_duration,
            });
        }

        let fade_in_secs = (fade_in / speed).min(output_duration);
        let fade_out_secs = (fade_out / speed).min(output_duration);
        let fade_out_start_secs = (output_duration - fade_out_secs).max(0.0);

        Ok(TrimWindow {
            seek_start_secs: seek_start,
            seek_length_secs: seek_length,
            output_duration_secs: output_duration,
            fade_in_secs,
            fade_out_secs,
            fade_out_start_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_padded_window_with_fades() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(10.0, 40.0, 120.0, true, 1.0)
            .unwrap();
        assert!(close(window.seek_start_secs, 8.5));
        assert!(close(window.seek_length_secs, 33.0));
        assert!(close(window.output_duration_secs, 33.0));
        assert!(close(window.fade_in_secs, 1.5));
        assert!(close(window.fade_out_secs, 1.5));
        assert!(close(window.fade_out_start_secs, 31.5));
    }

    #[test]
    fn test_exact_window_without_fades() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(10.0, 40.0, 120.0, false, 1.0)
            .unwrap();
        assert!(close(window.seek_start_secs, 10.0));
        assert!(close(window.seek_length_secs, 30.0));
        assert!(!window.has_fade_in());
        assert!(!window.has_fade_out());
    }

    #[test]
    fn test_start_near_zero_suppresses_fade_in() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(0.5, 20.0, 0.0, true, 1.0)
            .unwrap();
        assert!(close(window.seek_start_secs, 0.5));
        assert!(!window.has_fade_in());
        assert!(close(window.seek_length_secs, 21.0));
        assert!(window.has_fade_out());
    }

    #[test]
    fn test_end_near_total_suppresses_fade_out() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(10.0, 119.0, 120.0, true, 1.0)
            .unwrap();
        assert!(!window.has_fade_out());
        assert!(close(window.seek_length_secs, 110.5));
        assert!(close(window.fade_out_start_secs, window.output_duration_secs));
    }

    #[test]
    fn test_end_beyond_total_clamps_to_total() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(10.0, 130.0, 120.0, true, 1.0)
            .unwrap();
        assert!(close(window.seek_start_secs + window.seek_length_secs, 120.0));
    }

    #[test]
    fn test_speed_divides_output_values_only() {
        let window = TrimWindowPlanner::with_defaults()
            .plan(10.0, 40.0, 120.0, true, 2.0)
            .unwrap();
        assert!(close(window.seek_start_secs, 8.5));
        assert!(close(window.seek_length_secs, 33.0));
        assert!(close(window.output_duration_secs, 16.5));
        assert!(close(window.fade_in_secs, 0.75));
        assert!(close(window.fade_out_start_secs, 15.75));
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let result = TrimWindowPlanner::with_defaults().plan(5.0, 5.0, 0.0, false, 1.0);
        assert!(matches!(
            result,
            Err(HudclipError::ZeroOrNegativeDuration { .. })
        ));
    }

    #[test]
    fn test_zero_speed_is_rejected() {
        let result = TrimWindowPlanner::with_defaults().plan(0.0, 5.0, 0.0, false, 0.0);
        assert!(matches!(result, Err(HudclipError::InvalidJob { .. })));
    }
}
