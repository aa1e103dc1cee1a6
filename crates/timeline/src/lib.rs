use thiserror::Error;

mod clip;
pub use clip::*;
mod lanes;
pub use lanes::*;
mod commands;
pub use commands::*;
pub mod timescale;
pub use timescale::{TimeScale, ZoomDirection, BASE_PX_PER_SECOND};

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("clip not found: {0}")]
    ClipNotFound(ClipId),
    #[error("clip already exists: {0}")]
    ClipExists(ClipId),
    #[error("lane {lane} out of range for {kind} ({count} lanes)")]
    LaneOutOfRange {
        kind: TrackKind,
        lane: usize,
        count: usize,
    },
    #[error("{0} lanes are at capacity")]
    LaneCapReached(TrackKind),
    #[error("last {0} lane still holds clips")]
    LaneNotEmpty(TrackKind),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
}

/// Clip position/duration unit: one unit is one pixel at the 40 px/s reference zoom.
pub type Units = f64;

/// The editable timeline: every clip plus the per-type lane lists.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub lanes: LaneSet,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lane_cap(max_lanes_per_kind: usize) -> Self {
        Self {
            clips: Vec::new(),
            lanes: LaneSet::with_cap(max_lanes_per_kind),
        }
    }

    pub fn find_clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn find_clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn clip_index(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    pub fn clips_of(&self, kind: TrackKind) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(move |c| c.kind() == kind)
    }

    pub fn lane_clips(&self, kind: TrackKind, lane: usize) -> impl Iterator<Item = &Clip> {
        self.clips_of(kind).filter(move |c| c.lane_index == lane)
    }

    pub fn lane_count(&self, kind: TrackKind) -> usize {
        self.lanes.count(kind)
    }

    pub fn can_add_lane(&self, kind: TrackKind) -> bool {
        self.lanes.can_add(kind)
    }

    /// Appends a lane for `kind` and returns its index (the previous lane count).
    pub fn add_lane(&mut self, kind: TrackKind) -> Result<usize, TimelineError> {
        self.lanes.push(kind)
    }

    /// Removes the last lane of `kind` if nothing occupies it.
    pub fn remove_last_lane(&mut self, kind: TrackKind) -> Result<usize, TimelineError> {
        let count = self.lanes.count(kind);
        if count == 0 {
            return Err(TimelineError::LaneOutOfRange {
                kind,
                lane: 0,
                count,
            });
        }
        let last = count - 1;
        if self.lane_clips(kind, last).next().is_some() {
            return Err(TimelineError::LaneNotEmpty(kind));
        }
        self.lanes.pop(kind)
    }

    pub fn insert_clip(&mut self, clip: Clip) -> Result<(), TimelineError> {
        if self.find_clip(clip.id).is_some() {
            return Err(TimelineError::ClipExists(clip.id));
        }
        self.validate_lane(clip.kind(), clip.lane_index)?;
        validate_span(clip.position, clip.duration)?;
        self.clips.push(clip);
        Ok(())
    }

    pub fn validate_lane(&self, kind: TrackKind, lane: usize) -> Result<(), TimelineError> {
        let count = self.lanes.count(kind);
        if lane >= count {
            return Err(TimelineError::LaneOutOfRange { kind, lane, count });
        }
        Ok(())
    }

    /// Furthest clip end across all lanes, in units.
    pub fn end_units(&self) -> Units {
        self.clips.iter().map(Clip::end).fold(0.0, f64::max)
    }
}

pub(crate) fn validate_span(position: Units, duration: Units) -> Result<(), TimelineError> {
    if !position.is_finite() || position < 0.0 {
        return Err(TimelineError::InvalidValue(format!(
            "position must be finite and non-negative, got {}",
            position
        )));
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(TimelineError::InvalidValue(format!(
            "duration must be finite and positive, got {}",
            duration
        )));
    }
    Ok(())
}
