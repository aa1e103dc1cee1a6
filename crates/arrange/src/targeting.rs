/// Lane targeting: which lane of a track type the pointer is over, including
/// the "create a lane" band under the last lane.
use serde::{Deserialize, Serialize};
use timeline::{ClipId, TrackKind};

use crate::{Point, Rect};

/// Screen area holding the clips of one lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneArea {
    pub lane: usize,
    pub rect: Rect,
}

/// On-screen rectangle of a rendered clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub clip_id: ClipId,
    pub kind: TrackKind,
    pub rect: Rect,
}

/// Geometry of the rendered timeline, supplied by the host.
pub trait LayoutQuery {
    /// Clip-content areas of every lane of `kind`.
    fn lane_areas(&self, kind: TrackKind) -> Vec<LaneArea>;

    /// Every rendered clip rectangle.
    fn clip_rects(&self) -> Vec<ClipRect>;

    /// Whatever lane lies directly under `point`, of any type.
    fn lane_at_point(&self, point: Point) -> Option<(TrackKind, usize)> {
        TrackKind::ALL.into_iter().find_map(|kind| {
            self.lane_areas(kind)
                .into_iter()
                .find(|area| area.rect.contains(point))
                .map(|area| (kind, area.lane))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "lane", rename_all = "snake_case")]
pub enum LaneTarget {
    Existing(usize),
    NewLane,
}

impl LaneTarget {
    pub fn existing(&self) -> Option<usize> {
        match self {
            Self::Existing(lane) => Some(*lane),
            Self::NewLane => None,
        }
    }
}

/// Band directly under the last lane where a drop creates a new lane.
pub fn new_lane_zone(areas: &[LaneArea], zone_height: f64) -> Option<(f64, f64)> {
    let bottom = areas
        .iter()
        .map(|a| a.rect.bottom)
        .fold(f64::NEG_INFINITY, f64::max);
    if !bottom.is_finite() {
        return None;
    }
    Some((bottom, bottom + zone_height))
}

/// Resolve the lane of `kind` under pointer `y`.
///
/// Exact hits win; inside the lane group's vertical span the nearest lane
/// centre is used; below the last lane the new-lane band applies while
/// `can_add` holds. Stale areas for lanes beyond `lane_count` are ignored.
pub fn detect_lane(
    layout: &dyn LayoutQuery,
    kind: TrackKind,
    y: f64,
    lane_count: usize,
    can_add: bool,
    zone_height: f64,
) -> Option<LaneTarget> {
    if !y.is_finite() {
        return None;
    }
    let areas: Vec<LaneArea> = layout
        .lane_areas(kind)
        .into_iter()
        .filter(|a| a.lane < lane_count)
        .collect();
    if areas.is_empty() {
        return None;
    }

    if let Some(hit) = areas.iter().find(|a| a.rect.contains_y(y)) {
        return Some(LaneTarget::Existing(hit.lane));
    }

    let top = areas.iter().map(|a| a.rect.top).fold(f64::INFINITY, f64::min);
    let bottom = areas
        .iter()
        .map(|a| a.rect.bottom)
        .fold(f64::NEG_INFINITY, f64::max);
    if y >= top && y <= bottom {
        return areas
            .iter()
            .min_by(|a, b| {
                let da = (a.rect.center_y() - y).abs();
                let db = (b.rect.center_y() - y).abs();
                da.total_cmp(&db)
            })
            .map(|a| LaneTarget::Existing(a.lane));
    }

    if can_add {
        if let Some((zone_top, zone_bottom)) = new_lane_zone(&areas, zone_height) {
            if y >= zone_top && y < zone_bottom {
                return Some(LaneTarget::NewLane);
            }
        }
    }

    None
}

/// Where the committed lane came from, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSource {
    NewLane,
    LastValid,
    Release,
    HitTest,
    Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneResolution {
    Existing { lane: usize, source: LaneSource },
    Create,
}

/// Remembers the last valid lane seen during a drag; fast pointer moves
/// can briefly report no lane at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneTracker {
    pub kind: TrackKind,
    pub origin_lane: usize,
    last_valid: Option<usize>,
    pending_new_lane: bool,
}

impl LaneTracker {
    pub fn new(kind: TrackKind, origin_lane: usize) -> Self {
        Self {
            kind,
            origin_lane,
            last_valid: None,
            pending_new_lane: false,
        }
    }

    pub fn observe(&mut self, target: Option<LaneTarget>) {
        match target {
            Some(LaneTarget::Existing(lane)) => {
                self.last_valid = Some(lane);
                self.pending_new_lane = false;
            }
            Some(LaneTarget::NewLane) => self.pending_new_lane = true,
            None => {}
        }
    }

    pub fn last_valid(&self) -> Option<usize> {
        self.last_valid
    }

    pub fn pending_new_lane(&self) -> bool {
        self.pending_new_lane
    }

    /// Lane the preview should show for the latest observation.
    pub fn current(&self) -> LaneTarget {
        if self.pending_new_lane {
            LaneTarget::NewLane
        } else {
            LaneTarget::Existing(self.last_valid.unwrap_or(self.origin_lane))
        }
    }

    /// Final lane at release: a new lane when released in (or last seen in)
    /// the new-lane band, then the last recorded lane, then the release
    /// detection, then the element hit-test, then the clip's own lane.
    pub fn resolve(
        &self,
        release: Option<LaneTarget>,
        can_add: bool,
        hit_test: impl FnOnce() -> Option<usize>,
    ) -> LaneResolution {
        let wants_new = match release {
            Some(LaneTarget::NewLane) => true,
            None => self.pending_new_lane,
            Some(LaneTarget::Existing(_)) => false,
        };
        if wants_new && can_add {
            return LaneResolution::Create;
        }
        if let Some(lane) = self.last_valid {
            return LaneResolution::Existing {
                lane,
                source: LaneSource::LastValid,
            };
        }
        if let Some(lane) = release.and_then(|t| t.existing()) {
            return LaneResolution::Existing {
                lane,
                source: LaneSource::Release,
            };
        }
        if let Some(lane) = hit_test() {
            return LaneResolution::Existing {
                lane,
                source: LaneSource::HitTest,
            };
        }
        LaneResolution::Existing {
            lane: self.origin_lane,
            source: LaneSource::Origin,
        }
    }
}
