use serde::{Deserialize, Serialize};
use timeline::timescale::units_to_seconds;
use timeline::{Clip, ClipId, Timeline, TrackKind, Units};

use crate::overlap::EDGE_EPSILON;
use crate::{LaneTarget, LaneTracker, RectSelection};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    Left,
    Right,
}

/// What the pointer went down on, as reported by the host's hit-testing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum PointerTarget {
    Clip { clip_id: ClipId },
    ResizeHandle { clip_id: ClipId, side: ResizeHandle },
    Empty,
}

/// Horizontal travel since pointer-down, holding on to the last finite value.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PointerDelta {
    start_x: f64,
    last_finite: f64,
}

impl PointerDelta {
    pub fn new(start_x: f64) -> Self {
        Self {
            start_x,
            last_finite: 0.0,
        }
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let delta = x - self.start_x;
        if delta.is_finite() {
            self.last_finite = delta;
        }
        self.last_finite
    }

    pub fn last(&self) -> f64 {
        self.last_finite
    }
}

/// Where a dragged clip would land if released now. Never written to the model.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct GhostPreview {
    pub clip_id: ClipId,
    pub kind: TrackKind,
    pub lane: LaneTarget,
    pub position: Units,
    pub duration: Units,
    pub replace_target: Option<ClipId>,
    /// Screen offset of the ghost from the clip's resting place
    pub offset_px: f64,
}

impl GhostPreview {
    pub fn is_replace(&self) -> bool {
        self.replace_target.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveSession {
    pub clip_id: ClipId,
    pub kind: TrackKind,
    pub original_position: Units,
    pub original_lane: usize,
    pub duration: Units,
    pub delta: PointerDelta,
    pub tracker: LaneTracker,
    pub preview: Option<GhostPreview>,
}

impl MoveSession {
    pub fn new(clip: &Clip, start_x: f64) -> Self {
        Self {
            clip_id: clip.id,
            kind: clip.kind(),
            original_position: clip.position,
            original_lane: clip.lane_index,
            duration: clip.duration,
            delta: PointerDelta::new(start_x),
            tracker: LaneTracker::new(clip.kind(), clip.lane_index),
            preview: None,
        }
    }

    /// Requested start for `delta_units` of travel, never before zero.
    pub fn candidate(&self, delta_units: Units) -> Units {
        (self.original_position + delta_units).max(0.0)
    }
}

/// Edge drag on one clip. Neighbour and source limits are captured at press.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeSession {
    pub clip_id: ClipId,
    pub kind: TrackKind,
    pub lane: usize,
    pub side: ResizeHandle,
    pub original_position: Units,
    pub original_duration: Units,
    pub delta: PointerDelta,
    pub activated: bool,
    /// Furthest left the left edge may travel
    pub min_position: Units,
    /// Furthest right the right edge may travel
    pub max_end: Units,
    pub max_duration: Option<Units>,
    /// Source in-point at press; `None` for generated clips
    pub original_start_time: Option<f64>,
    pub preview: Option<GhostPreview>,
}

impl ResizeSession {
    pub fn new(timeline: &Timeline, clip: &Clip, side: ResizeHandle, start_x: f64) -> Self {
        let neighbours: Vec<&Clip> = timeline
            .lane_clips(clip.kind(), clip.lane_index)
            .filter(|c| c.id != clip.id)
            .collect();
        let previous_end = neighbours
            .iter()
            .map(|c| c.end())
            .filter(|end| *end <= clip.position + EDGE_EPSILON)
            .fold(0.0, f64::max);
        let next_start = neighbours
            .iter()
            .map(|c| c.position)
            .filter(|start| *start >= clip.end() - EDGE_EPSILON)
            .fold(f64::INFINITY, f64::min);
        let source_floor = clip
            .leading_source_units()
            .map_or(0.0, |lead| clip.position - lead);

        Self {
            clip_id: clip.id,
            kind: clip.kind(),
            lane: clip.lane_index,
            side,
            original_position: clip.position,
            original_duration: clip.duration,
            delta: PointerDelta::new(start_x),
            activated: false,
            min_position: previous_end.max(source_floor).max(0.0),
            original_start_time: clip.start_time(),
            max_end: next_start,
            max_duration: clip.max_duration(),
            preview: None,
        }
    }

    /// Source in-point matching a resolved left edge. The in-point follows
    /// the edge so trimmed footage can be pulled back later.
    pub fn start_time_for(&self, position: Units) -> Option<f64> {
        if self.side != ResizeHandle::Left {
            return None;
        }
        self.original_start_time
            .map(|start| (start + units_to_seconds(position - self.original_position)).max(0.0))
    }

    /// Resulting `(position, duration)` for `delta_units` of edge travel.
    ///
    /// Returns the original span when the limits leave no room for a clip
    /// of `min_width`.
    pub fn resolve(&self, delta_units: Units, min_width: Units) -> (Units, Units) {
        let original = (self.original_position, self.original_duration);
        let cap = self.max_duration.unwrap_or(f64::INFINITY);
        match self.side {
            ResizeHandle::Right => {
                let upper = (self.max_end - self.original_position).min(cap);
                if upper < min_width {
                    return original;
                }
                let width = (self.original_duration + delta_units).clamp(min_width, upper);
                (self.original_position, width)
            }
            ResizeHandle::Left => {
                let right = self.original_position + self.original_duration;
                let upper = (right - self.min_position).min(cap);
                if upper < min_width {
                    return original;
                }
                let width = (self.original_duration - delta_units).clamp(min_width, upper);
                (right - width, width)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupMember {
    pub clip_id: ClipId,
    pub kind: TrackKind,
    pub lane: usize,
    pub original_position: Units,
    pub duration: Units,
}

/// Drag of a rectangle selection; members keep their own lanes.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiMoveSession {
    pub members: Vec<GroupMember>,
    pub delta: PointerDelta,
    pub previews: Vec<GhostPreview>,
}

impl MultiMoveSession {
    pub fn new(members: Vec<GroupMember>, start_x: f64) -> Self {
        Self {
            members,
            delta: PointerDelta::new(start_x),
            previews: Vec::new(),
        }
    }

    /// Shared travel, limited so the earliest member stops at zero.
    pub fn clamp_delta(&self, delta_units: Units) -> Units {
        let earliest = self
            .members
            .iter()
            .map(|m| m.original_position)
            .fold(f64::INFINITY, f64::min);
        if earliest.is_finite() {
            delta_units.max(-earliest)
        } else {
            delta_units
        }
    }

    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.members.iter().any(|m| m.clip_id == clip_id)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Playhead,
    RectSelect(RectSelection),
    Move(MoveSession),
    Resize(ResizeSession),
    MultiMove(MultiMoveSession),
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playhead => "playhead",
            Self::RectSelect(_) => "rect_select",
            Self::Move(_) => "move",
            Self::Resize(_) => "resize",
            Self::MultiMove(_) => "multi_move",
        }
    }
}
