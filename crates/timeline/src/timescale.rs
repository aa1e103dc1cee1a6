/// Conversions between seconds, stored units and on-screen pixels.
///
/// Clip data is stored in units fixed at the reference zoom (40 units per
/// second), so changing the zoom never rewrites stored positions.
use serde::{Deserialize, Serialize};

use crate::{Clip, Units};

/// Reference zoom: one unit per pixel at 40 px/s.
pub const BASE_PX_PER_SECOND: f64 = 40.0;

pub const MIN_ZOOM_PERCENT: f64 = 50.0;
pub const MAX_ZOOM_PERCENT: f64 = 200.0;
pub const ZOOM_STEP_PERCENT: f64 = 10.0;

/// The ruler never shows less than three minutes.
pub const MIN_TIMELINE_SECONDS: f64 = 180.0;
pub const TRAILING_BUFFER_SECONDS: f64 = 10.0;
/// Seeking is capped at three minutes regardless of content length.
pub const SEEK_CEILING_SECONDS: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    In,
    Out,
}

pub fn to_pixels(seconds: f64, pixels_per_second: f64) -> f64 {
    seconds * pixels_per_second
}

pub fn to_seconds(pixels: f64, pixels_per_second: f64) -> f64 {
    if pixels_per_second <= 0.0 || !pixels_per_second.is_finite() {
        return 0.0;
    }
    pixels / pixels_per_second
}

pub fn seconds_to_units(seconds: f64) -> Units {
    seconds * BASE_PX_PER_SECOND
}

pub fn units_to_seconds(units: Units) -> f64 {
    units / BASE_PX_PER_SECOND
}

/// Stored units to screen pixels at the current zoom.
pub fn units_to_screen(units: Units, pixels_per_second: f64) -> f64 {
    units * pixels_per_second / BASE_PX_PER_SECOND
}

/// Screen pixels (usually a pointer delta) to stored units at the current zoom.
pub fn screen_to_units(pixels: f64, pixels_per_second: f64) -> Units {
    if pixels_per_second <= 0.0 || !pixels_per_second.is_finite() {
        return 0.0;
    }
    pixels * BASE_PX_PER_SECOND / pixels_per_second
}

pub fn zoom_percent(pixels_per_second: f64) -> f64 {
    (pixels_per_second / BASE_PX_PER_SECOND * 100.0).round()
}

/// Next zoom level, in 10 point steps of the baseline, kept within 50%..=200%.
pub fn zoom_step(pixels_per_second: f64, direction: ZoomDirection) -> f64 {
    let current = if pixels_per_second.is_finite() {
        zoom_percent(pixels_per_second)
    } else {
        100.0
    };
    let next = match direction {
        ZoomDirection::In => current + ZOOM_STEP_PERCENT,
        ZoomDirection::Out => current - ZOOM_STEP_PERCENT,
    }
    .clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
    (BASE_PX_PER_SECOND * next / 100.0).round()
}

/// Content length: the supplied value, otherwise the furthest clip end.
pub fn total_duration_seconds(supplied: Option<f64>, clips: &[Clip]) -> f64 {
    if let Some(total) = supplied.filter(|t| t.is_finite() && *t >= 0.0) {
        return total;
    }
    let end = clips.iter().map(Clip::end).fold(0.0, f64::max);
    units_to_seconds(end)
}

/// Displayed ruler length: at least three minutes, always ten seconds past the content.
pub fn timeline_length_seconds(total_duration: f64) -> f64 {
    (total_duration + TRAILING_BUFFER_SECONDS)
        .ceil()
        .max(MIN_TIMELINE_SECONDS)
}

pub fn clamp_seek(seconds: f64, total_duration: f64) -> f64 {
    let ceiling = SEEK_CEILING_SECONDS.min(total_duration.max(0.0));
    if !seconds.is_finite() {
        return 0.0;
    }
    seconds.clamp(0.0, ceiling)
}

/// `m:ss.t` label used by the ruler and in logs.
pub fn format_clock(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let secs = (tenths / 10) % 60;
    format!("{}:{:02}.{}", minutes, secs, tenths % 10)
}

/// Current zoom, carried by the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub pixels_per_second: f64,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            pixels_per_second: BASE_PX_PER_SECOND,
        }
    }
}

impl TimeScale {
    pub fn new(pixels_per_second: f64) -> Self {
        Self { pixels_per_second }
    }

    pub fn zoom(&mut self, direction: ZoomDirection) {
        self.pixels_per_second = zoom_step(self.pixels_per_second, direction);
    }

    pub fn percent(&self) -> f64 {
        zoom_percent(self.pixels_per_second)
    }

    pub fn seconds_to_px(&self, seconds: f64) -> f64 {
        to_pixels(seconds, self.pixels_per_second)
    }

    pub fn px_to_seconds(&self, pixels: f64) -> f64 {
        to_seconds(pixels, self.pixels_per_second)
    }

    pub fn units_to_px(&self, units: Units) -> f64 {
        units_to_screen(units, self.pixels_per_second)
    }

    pub fn px_to_units(&self, pixels: f64) -> Units {
        screen_to_units(pixels, self.pixels_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_zoom() {
        for pps in [20.0, 36.0, 40.0, 44.0, 80.0] {
            for t in [0.0, 0.5, 12.25, 179.9] {
                let back = to_seconds(to_pixels(t, pps), pps);
                assert!((back - t).abs() < 1e-9, "{} @ {}", t, pps);
            }
        }
    }

    #[test]
    fn test_zoom_steps_by_ten_percent() {
        assert_eq!(zoom_step(40.0, ZoomDirection::In), 44.0);
        assert_eq!(zoom_step(40.0, ZoomDirection::Out), 36.0);
        assert_eq!(zoom_step(44.0, ZoomDirection::In), 48.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(zoom_step(80.0, ZoomDirection::In), 80.0);
        assert_eq!(zoom_step(20.0, ZoomDirection::Out), 20.0);
        // Off-grid values snap back into range
        assert_eq!(zoom_step(500.0, ZoomDirection::Out), 80.0);

        let mut scale = TimeScale::default();
        for _ in 0..20 {
            scale.zoom(ZoomDirection::Out);
        }
        assert_eq!(scale.pixels_per_second, 20.0);
        assert_eq!(scale.percent(), 50.0);
    }

    #[test]
    fn test_units_follow_reference_zoom() {
        assert_eq!(seconds_to_units(2.5), 100.0);
        assert_eq!(units_to_seconds(40.0), 1.0);
        // At 200% zoom a 100 px drag covers 50 units
        assert_eq!(screen_to_units(100.0, 80.0), 50.0);
        assert_eq!(units_to_screen(50.0, 80.0), 100.0);
        assert_eq!(screen_to_units(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_timeline_length_floor_and_buffer() {
        assert_eq!(timeline_length_seconds(0.0), 180.0);
        assert_eq!(timeline_length_seconds(170.0), 180.0);
        assert_eq!(timeline_length_seconds(170.2), 181.0);
        assert_eq!(timeline_length_seconds(300.0), 310.0);
    }

    #[test]
    fn test_total_duration_prefers_supplied() {
        let clips = vec![
            Clip::video("a.mp4", 0, 0.0, 400.0),
            Clip::text("b", 0, 200.0, 400.0),
        ];
        assert_eq!(total_duration_seconds(None, &clips), 15.0);
        assert_eq!(total_duration_seconds(Some(42.0), &clips), 42.0);
        assert_eq!(total_duration_seconds(Some(f64::NAN), &clips), 15.0);
        assert_eq!(total_duration_seconds(None, &[]), 0.0);
    }

    #[test]
    fn test_seek_ceiling() {
        assert_eq!(clamp_seek(30.0, 60.0), 30.0);
        assert_eq!(clamp_seek(90.0, 60.0), 60.0);
        assert_eq!(clamp_seek(500.0, 900.0), 180.0);
        assert_eq!(clamp_seek(-4.0, 60.0), 0.0);
        assert_eq!(clamp_seek(f64::INFINITY, 60.0), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00.0");
        assert_eq!(format_clock(75.25), "1:15.3");
        assert_eq!(format_clock(180.0), "3:00.0");
    }
}
