use serde::{Deserialize, Serialize};

use crate::{TimelineError, TrackKind};

pub const DEFAULT_MAX_LANES: usize = 3;

fn default_lanes() -> Vec<usize> {
    vec![0]
}

fn default_max_lanes() -> usize {
    DEFAULT_MAX_LANES
}

/// Dense, zero-based lane lists for each track type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSet {
    #[serde(default = "default_lanes")]
    pub video: Vec<usize>,
    #[serde(default = "default_lanes")]
    pub text: Vec<usize>,
    #[serde(default = "default_lanes")]
    pub sound: Vec<usize>,
    #[serde(default = "default_max_lanes")]
    pub max_lanes_per_kind: usize,
}

impl Default for LaneSet {
    fn default() -> Self {
        Self::with_cap(DEFAULT_MAX_LANES)
    }
}

impl LaneSet {
    pub fn with_cap(max_lanes_per_kind: usize) -> Self {
        Self {
            video: default_lanes(),
            text: default_lanes(),
            sound: default_lanes(),
            max_lanes_per_kind: max_lanes_per_kind.max(1),
        }
    }

    pub fn lanes(&self, kind: TrackKind) -> &[usize] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Text => &self.text,
            TrackKind::Sound => &self.sound,
        }
    }

    fn lanes_mut(&mut self, kind: TrackKind) -> &mut Vec<usize> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Text => &mut self.text,
            TrackKind::Sound => &mut self.sound,
        }
    }

    pub fn count(&self, kind: TrackKind) -> usize {
        self.lanes(kind).len()
    }

    pub fn can_add(&self, kind: TrackKind) -> bool {
        self.count(kind) < self.max_lanes_per_kind
    }

    pub(crate) fn push(&mut self, kind: TrackKind) -> Result<usize, TimelineError> {
        if !self.can_add(kind) {
            return Err(TimelineError::LaneCapReached(kind));
        }
        let lanes = self.lanes_mut(kind);
        let index = lanes.len();
        lanes.push(index);
        tracing::debug!(%kind, lane = index, "lane added");
        Ok(index)
    }

    pub(crate) fn pop(&mut self, kind: TrackKind) -> Result<usize, TimelineError> {
        let lanes = self.lanes_mut(kind);
        let count = lanes.len();
        lanes.pop().ok_or(TimelineError::LaneOutOfRange {
            kind,
            lane: 0,
            count,
        })
    }

    /// Rebuilds the lists so indices are contiguous again after deserialising.
    pub fn normalize(&mut self) {
        for kind in TrackKind::ALL {
            let lanes = self.lanes_mut(kind);
            let count = lanes.len().max(1);
            *lanes = (0..count).collect();
        }
    }
}
