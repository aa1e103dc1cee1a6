use serde::{Deserialize, Serialize};

use crate::{validate_span, Clip, ClipId, Timeline, TimelineError, TrackKind, Units};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClipMove {
    pub clip_id: ClipId,
    pub position: Units,
}

/// A single edit to the timeline. Applying one returns its inverse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum ClipMutation {
    AddLane {
        kind: TrackKind,
    },
    RemoveLane {
        kind: TrackKind,
    },
    SetLane {
        clip_id: ClipId,
        lane: usize,
    },
    Move {
        clip_id: ClipId,
        position: Units,
    },
    /// `start_time`, when present, moves the source in-point with the left edge
    Resize {
        clip_id: ClipId,
        position: Units,
        duration: Units,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<f64>,
    },
    BatchMove {
        moves: Vec<ClipMove>,
    },
    Remove {
        clip_id: ClipId,
    },
    Insert {
        clip: Clip,
        #[serde(default)]
        index: Option<usize>,
    },
}

impl ClipMutation {
    /// Clips touched by this mutation.
    pub fn clip_ids(&self) -> Vec<ClipId> {
        match self {
            Self::AddLane { .. } | Self::RemoveLane { .. } => Vec::new(),
            Self::SetLane { clip_id, .. }
            | Self::Move { clip_id, .. }
            | Self::Resize { clip_id, .. }
            | Self::Remove { clip_id } => vec![*clip_id],
            Self::BatchMove { moves } => moves.iter().map(|m| m.clip_id).collect(),
            Self::Insert { clip, .. } => vec![clip.id],
        }
    }
}

pub fn apply_mutation(
    timeline: &mut Timeline,
    mutation: ClipMutation,
) -> Result<ClipMutation, TimelineError> {
    match mutation {
        ClipMutation::AddLane { kind } => {
            timeline.add_lane(kind)?;
            Ok(ClipMutation::RemoveLane { kind })
        }
        ClipMutation::RemoveLane { kind } => {
            timeline.remove_last_lane(kind)?;
            Ok(ClipMutation::AddLane { kind })
        }
        ClipMutation::SetLane { clip_id, lane } => set_lane(timeline, clip_id, lane),
        ClipMutation::Move { clip_id, position } => move_clip(timeline, clip_id, position),
        ClipMutation::Resize {
            clip_id,
            position,
            duration,
            start_time,
        } => resize_clip(timeline, clip_id, position, duration, start_time),
        ClipMutation::BatchMove { moves } => batch_move(timeline, moves),
        ClipMutation::Remove { clip_id } => remove_clip(timeline, clip_id),
        ClipMutation::Insert { clip, index } => insert_clip(timeline, clip, index),
    }
}

fn set_lane(
    timeline: &mut Timeline,
    clip_id: ClipId,
    lane: usize,
) -> Result<ClipMutation, TimelineError> {
    let kind = timeline
        .find_clip(clip_id)
        .ok_or(TimelineError::ClipNotFound(clip_id))?
        .kind();
    timeline.validate_lane(kind, lane)?;
    let clip = timeline
        .find_clip_mut(clip_id)
        .ok_or(TimelineError::ClipNotFound(clip_id))?;
    let previous = std::mem::replace(&mut clip.lane_index, lane);
    Ok(ClipMutation::SetLane {
        clip_id,
        lane: previous,
    })
}

fn move_clip(
    timeline: &mut Timeline,
    clip_id: ClipId,
    position: Units,
) -> Result<ClipMutation, TimelineError> {
    let clip = timeline
        .find_clip_mut(clip_id)
        .ok_or(TimelineError::ClipNotFound(clip_id))?;
    validate_span(position, clip.duration)?;
    let previous = std::mem::replace(&mut clip.position, position);
    Ok(ClipMutation::Move {
        clip_id,
        position: previous,
    })
}

fn resize_clip(
    timeline: &mut Timeline,
    clip_id: ClipId,
    position: Units,
    duration: Units,
    start_time: Option<f64>,
) -> Result<ClipMutation, TimelineError> {
    validate_span(position, duration)?;
    if let Some(seconds) = start_time {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TimelineError::InvalidValue(format!(
                "start time must be finite and non-negative, got {}",
                seconds
            )));
        }
    }
    let clip = timeline
        .find_clip_mut(clip_id)
        .ok_or(TimelineError::ClipNotFound(clip_id))?;
    let inverse = ClipMutation::Resize {
        clip_id,
        position: clip.position,
        duration: clip.duration,
        start_time: start_time.and(clip.start_time()),
    };
    clip.position = position;
    clip.duration = duration;
    if let Some(seconds) = start_time {
        clip.set_start_time(seconds);
    }
    Ok(inverse)
}

fn batch_move(
    timeline: &mut Timeline,
    moves: Vec<ClipMove>,
) -> Result<ClipMutation, TimelineError> {
    // Validate everything first so a bad entry leaves the timeline untouched
    for m in &moves {
        let clip = timeline
            .find_clip(m.clip_id)
            .ok_or(TimelineError::ClipNotFound(m.clip_id))?;
        validate_span(m.position, clip.duration)?;
    }

    let mut previous = Vec::with_capacity(moves.len());
    for m in moves {
        if let Some(clip) = timeline.find_clip_mut(m.clip_id) {
            previous.push(ClipMove {
                clip_id: m.clip_id,
                position: std::mem::replace(&mut clip.position, m.position),
            });
        }
    }
    Ok(ClipMutation::BatchMove { moves: previous })
}

fn remove_clip(timeline: &mut Timeline, clip_id: ClipId) -> Result<ClipMutation, TimelineError> {
    let index = timeline
        .clip_index(clip_id)
        .ok_or(TimelineError::ClipNotFound(clip_id))?;
    let clip = timeline.clips.remove(index);
    Ok(ClipMutation::Insert {
        clip,
        index: Some(index),
    })
}

fn insert_clip(
    timeline: &mut Timeline,
    clip: Clip,
    index: Option<usize>,
) -> Result<ClipMutation, TimelineError> {
    let clip_id = clip.id;
    timeline.insert_clip(clip)?;
    if let Some(index) = index {
        // insert_clip appends; move it back to its original slot
        let last = timeline.clips.len() - 1;
        let target = index.min(last);
        if target != last {
            let clip = timeline.clips.remove(last);
            timeline.clips.insert(target, clip);
        }
    }
    Ok(ClipMutation::Remove { clip_id })
}

/// Applies a mutation set all-or-nothing and returns the inverses in undo order.
pub fn apply_batch(
    timeline: &mut Timeline,
    mutations: Vec<ClipMutation>,
) -> Result<Vec<ClipMutation>, TimelineError> {
    let mut inverses = Vec::with_capacity(mutations.len());
    for mutation in mutations {
        match apply_mutation(timeline, mutation) {
            Ok(inverse) => inverses.push(inverse),
            Err(err) => {
                tracing::warn!(error = %err, applied = inverses.len(), "rolling back mutation set");
                while let Some(inverse) = inverses.pop() {
                    if let Err(rollback) = apply_mutation(timeline, inverse) {
                        tracing::warn!(error = %rollback, "rollback step failed");
                    }
                }
                return Err(err);
            }
        }
    }
    inverses.reverse();
    Ok(inverses)
}

#[derive(Debug, Default, Clone)]
pub struct MutationHistory {
    undo_stack: Vec<Vec<ClipMutation>>,
    redo_stack: Vec<Vec<ClipMutation>>,
}

impl MutationHistory {
    pub fn apply(
        &mut self,
        timeline: &mut Timeline,
        mutations: Vec<ClipMutation>,
    ) -> Result<(), TimelineError> {
        if mutations.is_empty() {
            return Ok(());
        }
        let inverse = apply_batch(timeline, mutations)?;
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
        Ok(())
    }

    /// Records inverses for edits that were already applied elsewhere.
    pub fn record(&mut self, inverse: Vec<ClipMutation>) {
        if inverse.is_empty() {
            return;
        }
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<(), TimelineError> {
        let mutations = self
            .undo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("undo stack"))?;
        let inverse = apply_batch(timeline, mutations)?;
        self.redo_stack.push(inverse);
        Ok(())
    }

    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<(), TimelineError> {
        let mutations = self
            .redo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("redo stack"))?;
        let inverse = apply_batch(timeline, mutations)?;
        self.undo_stack.push(inverse);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
