/// Playhead grabbing, scrubbing and the hover cursor near it.
use serde::{Deserialize, Serialize};
use timeline::timescale::clamp_seek;

use crate::Viewport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorHint {
    #[default]
    Default,
    ResizeHorizontal,
}

/// Screen x of the playhead line.
pub fn playhead_x(viewport: &Viewport, current_time: f64) -> f64 {
    viewport.seconds_to_screen_x(current_time)
}

pub fn is_near_playhead(pointer_x: f64, viewport: &Viewport, current_time: f64, grab_px: f64) -> bool {
    let offset = viewport.content_x(pointer_x) - viewport.scale.seconds_to_px(current_time);
    offset.is_finite() && offset.abs() <= grab_px
}

/// Time under the pointer, kept inside the seekable range.
pub fn scrub_time(pointer_x: f64, viewport: &Viewport, total_duration: f64) -> f64 {
    let seconds = viewport.scale.px_to_seconds(viewport.content_x(pointer_x));
    clamp_seek(seconds, total_duration)
}

pub fn hover_cursor(pointer_x: f64, viewport: &Viewport, current_time: f64, grab_px: f64) -> CursorHint {
    if is_near_playhead(pointer_x, viewport, current_time, grab_px) {
        CursorHint::ResizeHorizontal
    } else {
        CursorHint::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            content_left: 120.0,
            scroll_left: 60.0,
            ..Viewport::default()
        }
    }

    #[test]
    fn test_grab_band_is_inclusive() {
        let viewport = viewport();
        // 2 s at 40 px/s sits at 120 - 60 + 80 = 140 on screen
        assert_eq!(playhead_x(&viewport, 2.0), 140.0);
        assert!(is_near_playhead(140.0, &viewport, 2.0, 8.0));
        assert!(is_near_playhead(148.0, &viewport, 2.0, 8.0));
        assert!(!is_near_playhead(148.5, &viewport, 2.0, 8.0));
        assert!(!is_near_playhead(f64::NAN, &viewport, 2.0, 8.0));
    }

    #[test]
    fn test_scrub_is_clamped() {
        let viewport = viewport();
        assert_eq!(scrub_time(140.0, &viewport, 30.0), 2.0);
        assert_eq!(scrub_time(0.0, &viewport, 30.0), 0.0);
        assert_eq!(scrub_time(5000.0, &viewport, 30.0), 30.0);
        // Content longer than three minutes still stops at the ceiling
        assert_eq!(scrub_time(100_000.0, &viewport, 600.0), 180.0);
    }

    #[test]
    fn test_hover_cursor() {
        let viewport = Viewport::default();
        assert_eq!(hover_cursor(43.0, &viewport, 1.0, 8.0), CursorHint::ResizeHorizontal);
        assert_eq!(hover_cursor(100.0, &viewport, 1.0, 8.0), CursorHint::Default);
    }
}
