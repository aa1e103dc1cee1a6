use timeline::{apply_batch, apply_mutation, ClipMutation, MutationHistory, Timeline, TimelineError, TrackKind};
use tracing::{debug, warn};

use crate::OverlapPreference;

/// The application side of the engine: owns the model and the playhead.
///
/// The engine reads the timeline freely during a drag and writes to it only
/// at commit, through `add_lane` followed by a single `apply`.
pub trait ArrangeHost {
    fn timeline(&self) -> &Timeline;

    /// Append a lane of `kind`; returns the new lane's index.
    ///
    /// At the lane cap this fails with `TimelineError::LaneCapReached` and
    /// leaves the model untouched. The engine checks for room before it
    /// asks, so a drop at the cap commits without a new lane.
    fn add_lane(&mut self, kind: TrackKind) -> Result<usize, TimelineError>;

    /// Apply one committed mutation set.
    fn apply(&mut self, mutations: Vec<ClipMutation>) -> Result<(), TimelineError>;

    fn seek(&mut self, seconds: f64);

    fn current_time(&self) -> f64;

    /// Content length in seconds, when the host knows it better than the clips do.
    fn total_duration(&self) -> Option<f64>;

    fn overlap_preference(&self) -> OverlapPreference;
}

/// In-memory host with undo history.
#[derive(Debug, Clone, Default)]
pub struct Document {
    timeline: Timeline,
    history: MutationHistory,
    current_time: f64,
    total_duration: Option<f64>,
    preference: OverlapPreference,
    /// Inverses of lanes added since the last commit
    pending_lanes: Vec<ClipMutation>,
    seeks: Vec<f64>,
}

impl Document {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            ..Self::default()
        }
    }

    pub fn with_preference(mut self, preference: OverlapPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn set_preference(&mut self, preference: OverlapPreference) {
        self.preference = preference;
    }

    pub fn set_total_duration(&mut self, total: Option<f64>) {
        self.total_duration = total;
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    /// Every seek requested so far, oldest first.
    pub fn seeks(&self) -> &[f64] {
        &self.seeks
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<(), TimelineError> {
        self.discard_pending_lanes();
        self.history.undo(&mut self.timeline)
    }

    pub fn redo(&mut self) -> Result<(), TimelineError> {
        self.discard_pending_lanes();
        self.history.redo(&mut self.timeline)
    }

    fn discard_pending_lanes(&mut self) {
        while let Some(inverse) = self.pending_lanes.pop() {
            if let Err(err) = apply_mutation(&mut self.timeline, inverse) {
                warn!(error = %err, "could not drop uncommitted lane");
            }
        }
    }
}

impl ArrangeHost for Document {
    fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    fn add_lane(&mut self, kind: TrackKind) -> Result<usize, TimelineError> {
        let inverse = apply_mutation(&mut self.timeline, ClipMutation::AddLane { kind })?;
        self.pending_lanes.push(inverse);
        Ok(self.timeline.lane_count(kind) - 1)
    }

    fn apply(&mut self, mutations: Vec<ClipMutation>) -> Result<(), TimelineError> {
        if mutations.is_empty() && self.pending_lanes.is_empty() {
            return Ok(());
        }
        let count = mutations.len();
        match apply_batch(&mut self.timeline, mutations) {
            Ok(mut inverse) => {
                // Lanes come off after the clips have moved back out of them
                inverse.extend(self.pending_lanes.drain(..).rev());
                self.history.record(inverse);
                debug!(count, "mutation set committed");
                Ok(())
            }
            Err(err) => {
                self.discard_pending_lanes();
                Err(err)
            }
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.current_time = seconds;
        self.seeks.push(seconds);
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn total_duration(&self) -> Option<f64> {
        self.total_duration
    }

    fn overlap_preference(&self) -> OverlapPreference {
        self.preference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline::Clip;

    fn document() -> (Document, timeline::ClipId) {
        let mut timeline = Timeline::new();
        let clip = Clip::text("title", 0, 0.0, 80.0);
        let id = clip.id;
        timeline.insert_clip(clip).unwrap();
        (Document::new(timeline), id)
    }

    #[test]
    fn test_lane_and_move_undo_together() {
        let (mut doc, id) = document();
        let lane = doc.add_lane(TrackKind::Text).unwrap();
        assert_eq!(lane, 1);
        doc.apply(vec![ClipMutation::SetLane { clip_id: id, lane }]).unwrap();
        assert_eq!(doc.timeline().find_clip(id).unwrap().lane_index, 1);

        doc.undo().unwrap();
        assert_eq!(doc.timeline().find_clip(id).unwrap().lane_index, 0);
        assert_eq!(doc.timeline().lane_count(TrackKind::Text), 1);

        doc.redo().unwrap();
        assert_eq!(doc.timeline().lane_count(TrackKind::Text), 2);
        assert_eq!(doc.timeline().find_clip(id).unwrap().lane_index, 1);
    }

    #[test]
    fn test_failed_apply_drops_new_lane() {
        let (mut doc, _) = document();
        doc.add_lane(TrackKind::Video).unwrap();
        let missing = timeline::ClipId::new();
        let result = doc.apply(vec![ClipMutation::Move {
            clip_id: missing,
            position: 10.0,
        }]);
        assert_eq!(result, Err(TimelineError::ClipNotFound(missing)));
        assert_eq!(doc.timeline().lane_count(TrackKind::Video), 1);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_add_lane_at_cap_changes_nothing() {
        let (mut doc, id) = document();
        doc.add_lane(TrackKind::Text).unwrap();
        doc.add_lane(TrackKind::Text).unwrap();
        assert_eq!(
            doc.add_lane(TrackKind::Text),
            Err(TimelineError::LaneCapReached(TrackKind::Text))
        );
        assert_eq!(doc.timeline().lane_count(TrackKind::Text), 3);

        // Only the two lanes that were added ride along with the next commit
        doc.apply(vec![ClipMutation::SetLane { clip_id: id, lane: 2 }]).unwrap();
        doc.undo().unwrap();
        assert_eq!(doc.timeline().lane_count(TrackKind::Text), 1);
    }

    #[test]
    fn test_seek_log() {
        let (mut doc, _) = document();
        doc.seek(1.5);
        doc.seek(2.0);
        assert_eq!(doc.current_time(), 2.0);
        assert_eq!(doc.seeks(), &[1.5, 2.0]);
    }
}
