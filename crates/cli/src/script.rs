use anyhow::{anyhow, bail, Context, Result};
use arrange::{GridLayout, GridMetrics, Point, PointerTarget, Viewport};
use serde::Deserialize;
use timeline::{TrackKind, ZoomDirection};

/// A recorded pointer session to replay against a timeline.
#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub layout: Option<GridMetrics>,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub total_duration: Option<f64>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LaneRef {
    pub kind: TrackKind,
    pub index: usize,
}

/// Pointer position. The vertical part is given as a raw `y`, the centre of
/// a lane, or the new-lane band under a group.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct At {
    pub x: f64,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub lane: Option<LaneRef>,
    #[serde(default)]
    pub band: Option<TrackKind>,
}

impl At {
    pub fn resolve(&self, layout: &GridLayout, band_height: f64) -> Result<Point> {
        let y = match (self.y, self.lane, self.band) {
            (Some(y), None, None) => y,
            (None, Some(lane), None) => layout
                .lane_center_y(lane.kind, lane.index)
                .ok_or_else(|| anyhow!("no {} lane {}", lane.kind, lane.index))?,
            (None, None, Some(kind)) => layout
                .new_lane_band_y(kind, band_height)
                .ok_or_else(|| anyhow!("no {} lanes laid out", kind))?,
            _ => bail!("pointer position needs exactly one of y, lane or band"),
        };
        Ok(Point::new(self.x, y))
    }
}

fn empty_target() -> PointerTarget {
    PointerTarget::Empty
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Down {
        at: At,
        #[serde(default = "empty_target")]
        target: PointerTarget,
    },
    Move {
        at: At,
    },
    Up {
        at: At,
    },
    Cancel,
    Zoom {
        direction: ZoomDirection,
    },
    Scroll {
        left: f64,
    },
    Seek {
        time: f64,
    },
    Delete,
    Undo,
    Redo,
}

pub fn parse_script(json: &str) -> Result<Script> {
    serde_json::from_str(json).context("invalid pointer script")
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline::{ClipId, Timeline};

    #[test]
    fn test_parse_steps() {
        let id = ClipId::new();
        let json = format!(
            r#"{{
                "current_time": 2.5,
                "steps": [
                    {{ "action": "down", "at": {{ "x": 150, "lane": {{ "kind": "video", "index": 0 }} }},
                       "target": {{ "on": "clip", "clip_id": "{id}" }} }},
                    {{ "action": "move", "at": {{ "x": 200, "band": "video" }} }},
                    {{ "action": "up", "at": {{ "x": 200, "y": 10 }} }},
                    {{ "action": "zoom", "direction": "in" }},
                    {{ "action": "undo" }}
                ]
            }}"#
        );
        let script = parse_script(&json).unwrap();
        assert_eq!(script.current_time, 2.5);
        assert_eq!(script.steps.len(), 5);
        assert!(matches!(
            script.steps[0],
            Step::Down {
                target: PointerTarget::Clip { clip_id },
                ..
            } if clip_id == id
        ));
        assert!(matches!(
            script.steps[3],
            Step::Zoom {
                direction: ZoomDirection::In
            }
        ));
    }

    #[test]
    fn test_down_defaults_to_empty_target() {
        let script =
            parse_script(r#"{ "steps": [ { "action": "down", "at": { "x": 1, "y": 2 } } ] }"#)
                .unwrap();
        assert!(matches!(
            script.steps[0],
            Step::Down {
                target: PointerTarget::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_positions() {
        let timeline = Timeline::new();
        let layout = GridLayout::new(&timeline, &Viewport::default());
        let lane = At {
            x: 5.0,
            y: None,
            lane: Some(LaneRef {
                kind: TrackKind::Text,
                index: 0,
            }),
            band: None,
        };
        assert_eq!(lane.resolve(&layout, 24.0).unwrap(), Point::new(5.0, 64.0));

        let missing = At {
            lane: Some(LaneRef {
                kind: TrackKind::Text,
                index: 3,
            }),
            ..lane
        };
        assert!(missing.resolve(&layout, 24.0).is_err());

        let ambiguous = At {
            y: Some(1.0),
            ..lane
        };
        assert!(ambiguous.resolve(&layout, 24.0).is_err());
    }
}
