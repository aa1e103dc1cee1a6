use serde::{Deserialize, Serialize};
use timeline::timescale::{timeline_length_seconds, units_to_seconds};
use timeline::{ClipId, Timeline, TrackKind};

use crate::{ClipRect, LaneArea, LayoutQuery, Rect, Viewport};

/// Top-to-bottom order of the lane groups.
pub const GROUP_ORDER: [TrackKind; 3] = [TrackKind::Text, TrackKind::Video, TrackKind::Sound];

/// Vertical metrics of a [`GridLayout`], in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    #[serde(default = "default_top")]
    pub top: f64,
    #[serde(default = "default_lane_height")]
    pub lane_height: f64,
    #[serde(default = "default_lane_gap")]
    pub lane_gap: f64,
    /// Space after each group; keep it at least as tall as the new-lane band
    #[serde(default = "default_group_gap")]
    pub group_gap: f64,
}

fn default_top() -> f64 {
    40.0
}

fn default_lane_height() -> f64 {
    48.0
}

fn default_lane_gap() -> f64 {
    8.0
}

fn default_group_gap() -> f64 {
    32.0
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            top: default_top(),
            lane_height: default_lane_height(),
            lane_gap: default_lane_gap(),
            group_gap: default_group_gap(),
        }
    }
}

/// Deterministic layout computed straight from the model, standing in for a
/// rendered timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    metrics: GridMetrics,
    groups: Vec<(TrackKind, Vec<LaneArea>)>,
    clips: Vec<ClipRect>,
}

impl GridLayout {
    pub fn new(timeline: &Timeline, viewport: &Viewport) -> Self {
        Self::with_metrics(timeline, viewport, GridMetrics::default())
    }

    pub fn with_metrics(timeline: &Timeline, viewport: &Viewport, metrics: GridMetrics) -> Self {
        let length = timeline_length_seconds(units_to_seconds(timeline.end_units()));
        let left = viewport.seconds_to_screen_x(0.0);
        let right = viewport.seconds_to_screen_x(length);

        let mut y = metrics.top;
        let mut groups = Vec::with_capacity(GROUP_ORDER.len());
        for kind in GROUP_ORDER {
            let mut areas = Vec::new();
            for lane in 0..timeline.lane_count(kind) {
                if lane > 0 {
                    y += metrics.lane_gap;
                }
                areas.push(LaneArea {
                    lane,
                    rect: Rect::new(left, y, right, y + metrics.lane_height),
                });
                y += metrics.lane_height;
            }
            y += metrics.group_gap;
            groups.push((kind, areas));
        }

        let clips = timeline
            .clips
            .iter()
            .filter_map(|clip| {
                let (_, areas) = groups.iter().find(|(kind, _)| *kind == clip.kind())?;
                let area = areas.iter().find(|a| a.lane == clip.lane_index)?;
                Some(ClipRect {
                    clip_id: clip.id,
                    kind: clip.kind(),
                    rect: Rect::new(
                        viewport.units_to_screen_x(clip.position),
                        area.rect.top,
                        viewport.units_to_screen_x(clip.end()),
                        area.rect.bottom,
                    ),
                })
            })
            .collect();

        Self {
            metrics,
            groups,
            clips,
        }
    }

    pub fn metrics(&self) -> GridMetrics {
        self.metrics
    }

    fn areas(&self, kind: TrackKind) -> &[LaneArea] {
        self.groups
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, areas)| areas.as_slice())
            .unwrap_or(&[])
    }

    /// Vertical centre of a lane.
    pub fn lane_center_y(&self, kind: TrackKind, lane: usize) -> Option<f64> {
        self.areas(kind)
            .iter()
            .find(|a| a.lane == lane)
            .map(|a| a.rect.center_y())
    }

    /// A point inside the new-lane band of `kind`, `band_height` tall.
    pub fn new_lane_band_y(&self, kind: TrackKind, band_height: f64) -> Option<f64> {
        self.areas(kind)
            .last()
            .map(|a| a.rect.bottom + band_height * 0.5)
    }

    pub fn clip_rect(&self, clip_id: ClipId) -> Option<ClipRect> {
        self.clips.iter().find(|c| c.clip_id == clip_id).copied()
    }
}

impl LayoutQuery for GridLayout {
    fn lane_areas(&self, kind: TrackKind) -> Vec<LaneArea> {
        self.areas(kind).to_vec()
    }

    fn clip_rects(&self) -> Vec<ClipRect> {
        self.clips.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targeting::detect_lane;
    use crate::LaneTarget;
    use timeline::Clip;

    #[test]
    fn test_groups_stack_text_video_sound() {
        let mut timeline = Timeline::new();
        timeline.add_lane(TrackKind::Video).unwrap();
        let layout = GridLayout::new(&timeline, &Viewport::default());

        let text = layout.lane_center_y(TrackKind::Text, 0).unwrap();
        let video0 = layout.lane_center_y(TrackKind::Video, 0).unwrap();
        let video1 = layout.lane_center_y(TrackKind::Video, 1).unwrap();
        let sound = layout.lane_center_y(TrackKind::Sound, 0).unwrap();
        assert!(text < video0 && video0 < video1 && video1 < sound);
        // 40 + 48 + 32 puts the first video lane at 120
        assert_eq!(video0, 144.0);
        assert_eq!(video1, 200.0);
    }

    #[test]
    fn test_clip_rects_follow_viewport() {
        let mut timeline = Timeline::new();
        let clip = Clip::sound("a.wav", 0, 40.0, 80.0);
        let id = clip.id;
        timeline.insert_clip(clip).unwrap();
        let viewport = Viewport {
            content_left: 100.0,
            ..Viewport::new(80.0)
        };
        let layout = GridLayout::new(&timeline, &viewport);
        let rect = layout.clip_rect(id).unwrap().rect;
        assert_eq!(rect.left, 180.0);
        assert_eq!(rect.right, 340.0);
    }

    #[test]
    fn test_new_lane_band_is_reachable() {
        let timeline = Timeline::new();
        let layout = GridLayout::new(&timeline, &Viewport::default());
        let y = layout.new_lane_band_y(TrackKind::Text, 24.0).unwrap();
        assert_eq!(
            detect_lane(&layout, TrackKind::Text, y, 1, true, 24.0),
            Some(LaneTarget::NewLane)
        );
        // The same y is outside every video lane and band
        assert_eq!(detect_lane(&layout, TrackKind::Video, y, 1, true, 24.0), None);
    }
}
