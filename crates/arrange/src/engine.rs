use std::mem;

use serde::Serialize;
use timeline::timescale::total_duration_seconds;
use timeline::{ClipId, ClipMove, ClipMutation, Timeline, TrackKind, Units, ZoomDirection};
use tracing::{debug, info, warn};

use crate::overlap::{evaluate_placement, magnetic_position, EDGE_EPSILON};
use crate::playhead::{self, is_near_playhead, scrub_time};
use crate::targeting::{detect_lane, LaneResolution};
use crate::{
    resolve_replace, ArrangeError, ArrangeHost, CursorHint, DragState, EngineConfig, GhostPreview,
    GroupMember, LaneTarget, LayoutQuery, MoveSession, MultiMoveSession, Occupant, Point,
    PointerTarget, Rect, RectSelection, ReplaceConfirmer, ReplaceDecision, ReplaceRequest,
    ResizeSession, Result, SelectionManager, Viewport,
};

/// What a pointer move produced, for the host to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "feedback", rename_all = "snake_case")]
pub enum MoveFeedback {
    None,
    Seek { time: f64 },
    Ghost { preview: GhostPreview },
    Ghosts { previews: Vec<GhostPreview> },
    Marquee { rect: Rect, selected: usize },
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Nothing was in progress
    NoSession,
    /// The gesture ended where it started
    Unchanged,
    Committed {
        mutations: Vec<ClipMutation>,
        created_lane: Option<usize>,
    },
    /// The replace prompt was dismissed
    Abandoned,
    Scrubbed { time: f64 },
    Selected { count: usize },
}

impl CommitOutcome {
    pub fn mutations(&self) -> &[ClipMutation] {
        match self {
            Self::Committed { mutations, .. } => mutations,
            _ => &[],
        }
    }
}

/// Turns pointer events into clip mutations.
///
/// One drag session at a time lives in `state`; it is taken out at release
/// and consumed exactly once.
#[derive(Debug, Clone, Default)]
pub struct ArrangeEngine {
    config: EngineConfig,
    viewport: Viewport,
    selection: SelectionManager,
    state: DragState,
}

impl ArrangeEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_scroll_left(&mut self, scroll_left: f64) {
        self.viewport.scroll_left = scroll_left.max(0.0);
    }

    /// Step the zoom and return the new pixels-per-second.
    pub fn zoom(&mut self, direction: ZoomDirection) -> f64 {
        self.viewport.scale.zoom(direction);
        let pps = self.viewport.pixels_per_second();
        debug!(pps, percent = self.viewport.scale.percent(), "zoom changed");
        pps
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionManager {
        &mut self.selection
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        !self.state.is_idle()
    }

    /// Ghosts of the session in progress.
    pub fn previews(&self) -> Vec<GhostPreview> {
        match &self.state {
            DragState::Move(session) => session.preview.into_iter().collect(),
            DragState::Resize(session) => session.preview.into_iter().collect(),
            DragState::MultiMove(session) => session.previews.clone(),
            _ => Vec::new(),
        }
    }

    pub fn hover_cursor(&self, host: &dyn ArrangeHost, pointer_x: f64) -> CursorHint {
        playhead::hover_cursor(
            pointer_x,
            &self.viewport,
            host.current_time(),
            self.config.playhead_grab_px,
        )
    }

    pub fn pointer_down(
        &mut self,
        host: &dyn ArrangeHost,
        point: Point,
        target: PointerTarget,
    ) -> Result<()> {
        if !self.state.is_idle() {
            warn!(state = self.state.name(), "pointer down with a session still open; discarding it");
            self.state = DragState::Idle;
        }

        // The playhead sits above clips, so it wins any press near it
        if is_near_playhead(
            point.x,
            &self.viewport,
            host.current_time(),
            self.config.playhead_grab_px,
        ) {
            self.state = DragState::Playhead;
            debug!(x = point.x, "playhead grabbed");
            return Ok(());
        }

        let timeline = host.timeline();
        self.state = match target {
            PointerTarget::Empty => {
                self.selection.clear_selection();
                DragState::RectSelect(RectSelection::new(point))
            }
            PointerTarget::Clip { clip_id } => {
                let clip = timeline
                    .find_clip(clip_id)
                    .ok_or(ArrangeError::ClipMissing(clip_id))?;
                if self.selection.in_rect_selection(clip_id)
                    && self.selection.rect_selection().len() > 1
                {
                    let members = self
                        .selection
                        .rect_selection()
                        .iter()
                        .filter_map(|s| timeline.find_clip(s.clip_id))
                        .map(|c| GroupMember {
                            clip_id: c.id,
                            kind: c.kind(),
                            lane: c.lane_index,
                            original_position: c.position,
                            duration: c.duration,
                        })
                        .collect();
                    DragState::MultiMove(MultiMoveSession::new(members, point.x))
                } else {
                    self.selection.select_clip(clip_id, clip.kind());
                    DragState::Move(MoveSession::new(clip, point.x))
                }
            }
            PointerTarget::ResizeHandle { clip_id, side } => {
                let clip = timeline
                    .find_clip(clip_id)
                    .ok_or(ArrangeError::ClipMissing(clip_id))?;
                self.selection.select_clip(clip_id, clip.kind());
                DragState::Resize(ResizeSession::new(timeline, clip, side, point.x))
            }
        };
        debug!(state = self.state.name(), x = point.x, y = point.y, "pointer down");
        Ok(())
    }

    pub fn pointer_move(
        &mut self,
        host: &mut dyn ArrangeHost,
        layout: &dyn LayoutQuery,
        point: Point,
    ) -> MoveFeedback {
        let Self {
            config,
            viewport,
            selection,
            state,
        } = self;

        match state {
            DragState::Idle => MoveFeedback::None,
            DragState::Playhead => {
                let time = scrub_time(point.x, viewport, total_seconds(&*host));
                host.seek(time);
                MoveFeedback::Seek { time }
            }
            DragState::RectSelect(gesture) => {
                gesture.update(point);
                let rect = gesture.rect();
                let selected = selection.select_in_rect(rect, &layout.clip_rects());
                MoveFeedback::Marquee { rect, selected }
            }
            DragState::Move(session) => {
                let preview = preview_move(config, viewport, host.timeline(), layout, session, point);
                session.preview = Some(preview);
                MoveFeedback::Ghost { preview }
            }
            DragState::Resize(session) => {
                let delta_px = session.delta.update(point.x);
                if !session.activated {
                    if delta_px.abs() < config.resize_activation_px {
                        return MoveFeedback::None;
                    }
                    session.activated = true;
                    debug!(clip = %session.clip_id, side = ?session.side, "resize activated");
                }
                let (position, duration) =
                    session.resolve(viewport.scale.px_to_units(delta_px), config.min_clip_width);
                let preview = GhostPreview {
                    clip_id: session.clip_id,
                    kind: session.kind,
                    lane: LaneTarget::Existing(session.lane),
                    position,
                    duration,
                    replace_target: None,
                    offset_px: viewport.scale.units_to_px(position - session.original_position),
                };
                session.preview = Some(preview);
                MoveFeedback::Ghost { preview }
            }
            DragState::MultiMove(session) => {
                let delta_px = session.delta.update(point.x);
                let previews = plan_group(viewport, host.timeline(), session, delta_px);
                session.previews = previews.clone();
                MoveFeedback::Ghosts { previews }
            }
        }
    }

    /// Finish the gesture and commit at most one mutation set to the host.
    pub async fn pointer_up(
        &mut self,
        host: &mut dyn ArrangeHost,
        layout: &dyn LayoutQuery,
        point: Point,
        confirmer: &dyn ReplaceConfirmer,
    ) -> Result<CommitOutcome> {
        let outcome = match mem::take(&mut self.state) {
            DragState::Idle => CommitOutcome::NoSession,
            DragState::Playhead => CommitOutcome::Scrubbed {
                time: host.current_time(),
            },
            DragState::RectSelect(mut gesture) => {
                gesture.update(point);
                if gesture.is_click() {
                    self.selection.clear_selection();
                    CommitOutcome::Selected { count: 0 }
                } else {
                    let count = self
                        .selection
                        .select_in_rect(gesture.rect(), &layout.clip_rects());
                    CommitOutcome::Selected { count }
                }
            }
            DragState::Move(session) => {
                self.commit_move(host, layout, point, confirmer, session)
                    .await?
            }
            DragState::Resize(session) => self.commit_resize(host, point, session)?,
            DragState::MultiMove(session) => self.commit_group(host, point, session)?,
        };
        Ok(outcome)
    }

    /// Drop the session in progress without touching the model.
    pub fn cancel(&mut self) -> bool {
        let state = mem::take(&mut self.state);
        if state.is_idle() {
            return false;
        }
        debug!(state = state.name(), "drag cancelled");
        true
    }

    /// Forget everything transient: the session and the selection.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.selection.clear_selection();
    }

    /// Remove every selected clip in one mutation set.
    pub fn delete_selection(&mut self, host: &mut dyn ArrangeHost) -> Result<CommitOutcome> {
        let timeline = host.timeline();
        let mutations: Vec<ClipMutation> = self
            .selection
            .selected_ids()
            .into_iter()
            .filter(|id| timeline.find_clip(*id).is_some())
            .map(|clip_id| ClipMutation::Remove { clip_id })
            .collect();
        if mutations.is_empty() {
            return Ok(CommitOutcome::Unchanged);
        }
        host.apply(mutations.clone())?;
        self.selection.clear_selection();
        info!(count = mutations.len(), "selection deleted");
        Ok(CommitOutcome::Committed {
            mutations,
            created_lane: None,
        })
    }

    async fn commit_move(
        &mut self,
        host: &mut dyn ArrangeHost,
        layout: &dyn LayoutQuery,
        point: Point,
        confirmer: &dyn ReplaceConfirmer,
        mut session: MoveSession,
    ) -> Result<CommitOutcome> {
        let kind = session.kind;
        let clip_id = session.clip_id;
        let delta_px = session.delta.update(point.x);
        let candidate = session.candidate(self.viewport.scale.px_to_units(delta_px));

        let timeline = host.timeline();
        if timeline.find_clip(clip_id).is_none() {
            return Err(ArrangeError::ClipMissing(clip_id));
        }
        let lane_count = timeline.lane_count(kind);
        let can_add = has_lane_room(&self.config, timeline, kind);
        let release = detect_lane(
            layout,
            kind,
            point.y,
            lane_count,
            can_add,
            self.config.new_lane_zone_height,
        );
        let hit_test = || {
            layout
                .lane_at_point(point)
                .filter(|(k, lane)| *k == kind && *lane < lane_count)
                .map(|(_, lane)| lane)
        };
        let (lane, create) = match session.tracker.resolve(release, can_add, hit_test) {
            LaneResolution::Create => (lane_count, true),
            LaneResolution::Existing { lane, source } if lane < lane_count => {
                debug!(lane, ?source, "drop lane resolved");
                (lane, false)
            }
            LaneResolution::Existing { lane, .. } => {
                warn!(lane, lane_count, "resolved lane no longer exists; keeping the original");
                (session.original_lane, false)
            }
        };

        let occupants = if create {
            Vec::new()
        } else {
            lane_occupants(timeline, kind, lane, |id| id == clip_id)
        };
        let placement = evaluate_placement(
            &occupants,
            candidate,
            session.duration,
            self.config.overlap_replace_threshold,
        );

        let (position, replaced) = match placement.replace_target() {
            None => (placement.position, None),
            Some(target) => {
                let request = ReplaceRequest {
                    dragged: clip_id,
                    target,
                    kind,
                    lane,
                    position: placement.position,
                    overlap_ratio: placement.max_ratio,
                };
                let preference = host.overlap_preference();
                match resolve_replace(preference, confirmer, request, self.config.confirm_timeout())
                    .await
                {
                    ReplaceDecision::Replace => (placement.position, Some(target)),
                    ReplaceDecision::Reposition => (
                        magnetic_position(&occupants, candidate, session.duration),
                        None,
                    ),
                    ReplaceDecision::Abandon => {
                        info!(clip = %clip_id, "drop abandoned");
                        return Ok(CommitOutcome::Abandoned);
                    }
                }
            }
        };

        let moved = (position - session.original_position).abs() > EDGE_EPSILON;
        if !create && lane == session.original_lane && !moved && replaced.is_none() {
            debug!(clip = %clip_id, "drag ended where it started");
            return Ok(CommitOutcome::Unchanged);
        }

        // The lane has to exist before anything is assigned to it
        let created_lane = if create {
            Some(host.add_lane(kind)?)
        } else {
            None
        };
        let lane = created_lane.unwrap_or(lane);

        let mut mutations = Vec::with_capacity(3);
        if let Some(target) = replaced {
            mutations.push(ClipMutation::Remove { clip_id: target });
        }
        if lane != session.original_lane {
            mutations.push(ClipMutation::SetLane { clip_id, lane });
        }
        if moved {
            mutations.push(ClipMutation::Move { clip_id, position });
        }
        host.apply(mutations.clone())?;

        if let Some(target) = replaced {
            self.selection.forget(target);
        }
        info!(
            clip = %clip_id,
            %kind,
            lane,
            position,
            replaced = ?replaced,
            "move committed"
        );
        Ok(CommitOutcome::Committed {
            mutations,
            created_lane,
        })
    }

    fn commit_resize(
        &mut self,
        host: &mut dyn ArrangeHost,
        point: Point,
        mut session: ResizeSession,
    ) -> Result<CommitOutcome> {
        let delta_px = session.delta.update(point.x);
        if !session.activated && delta_px.abs() < self.config.resize_activation_px {
            return Ok(CommitOutcome::Unchanged);
        }
        if host.timeline().find_clip(session.clip_id).is_none() {
            return Err(ArrangeError::ClipMissing(session.clip_id));
        }

        let (position, duration) = session.resolve(
            self.viewport.scale.px_to_units(delta_px),
            self.config.min_clip_width,
        );
        if (position - session.original_position).abs() <= EDGE_EPSILON
            && (duration - session.original_duration).abs() <= EDGE_EPSILON
        {
            return Ok(CommitOutcome::Unchanged);
        }

        let mutations = vec![ClipMutation::Resize {
            clip_id: session.clip_id,
            position,
            duration,
            start_time: session.start_time_for(position),
        }];
        host.apply(mutations.clone())?;
        info!(clip = %session.clip_id, side = ?session.side, position, duration, "resize committed");
        Ok(CommitOutcome::Committed {
            mutations,
            created_lane: None,
        })
    }

    fn commit_group(
        &mut self,
        host: &mut dyn ArrangeHost,
        point: Point,
        mut session: MultiMoveSession,
    ) -> Result<CommitOutcome> {
        let delta_px = session.delta.update(point.x);
        let previews = plan_group(&self.viewport, host.timeline(), &session, delta_px);
        let moves: Vec<ClipMove> = previews
            .iter()
            .zip(&session.members)
            .filter(|(preview, member)| {
                (preview.position - member.original_position).abs() > EDGE_EPSILON
            })
            .map(|(preview, _)| ClipMove {
                clip_id: preview.clip_id,
                position: preview.position,
            })
            .collect();
        if moves.is_empty() {
            return Ok(CommitOutcome::Unchanged);
        }

        let count = moves.len();
        let mutations = vec![ClipMutation::BatchMove { moves }];
        host.apply(mutations.clone())?;
        info!(count, "group move committed");
        Ok(CommitOutcome::Committed {
            mutations,
            created_lane: None,
        })
    }
}

fn total_seconds(host: &dyn ArrangeHost) -> f64 {
    total_duration_seconds(host.total_duration(), &host.timeline().clips)
}

/// Lanes may be added while both the model and the engine cap allow it.
fn has_lane_room(config: &EngineConfig, timeline: &Timeline, kind: TrackKind) -> bool {
    timeline.can_add_lane(kind) && timeline.lane_count(kind) < config.max_lanes_per_kind
}

fn lane_occupants(
    timeline: &Timeline,
    kind: TrackKind,
    lane: usize,
    exclude: impl Fn(ClipId) -> bool,
) -> Vec<Occupant> {
    timeline
        .lane_clips(kind, lane)
        .filter(|c| !exclude(c.id))
        .map(Occupant::from)
        .collect()
}

fn preview_move(
    config: &EngineConfig,
    viewport: &Viewport,
    timeline: &Timeline,
    layout: &dyn LayoutQuery,
    session: &mut MoveSession,
    point: Point,
) -> GhostPreview {
    let kind = session.kind;
    let delta_px = session.delta.update(point.x);
    let candidate = session.candidate(viewport.scale.px_to_units(delta_px));

    let detected = detect_lane(
        layout,
        kind,
        point.y,
        timeline.lane_count(kind),
        has_lane_room(config, timeline, kind),
        config.new_lane_zone_height,
    );
    session.tracker.observe(detected);
    let lane = session.tracker.current();

    let occupants = match lane {
        LaneTarget::Existing(lane) => lane_occupants(timeline, kind, lane, |id| id == session.clip_id),
        LaneTarget::NewLane => Vec::new(),
    };
    let placement = evaluate_placement(
        &occupants,
        candidate,
        session.duration,
        config.overlap_replace_threshold,
    );
    GhostPreview {
        clip_id: session.clip_id,
        kind,
        lane,
        position: placement.position,
        duration: session.duration,
        replace_target: placement.replace_target(),
        offset_px: delta_px,
    }
}

/// Shared-delta placement of every group member in its own lane. Members
/// are placed in order and later ones avoid earlier ones.
fn plan_group(
    viewport: &Viewport,
    timeline: &Timeline,
    session: &MultiMoveSession,
    delta_px: f64,
) -> Vec<GhostPreview> {
    let delta_units: Units = session.clamp_delta(viewport.scale.px_to_units(delta_px));
    let mut placed: Vec<(TrackKind, usize, Occupant)> = Vec::with_capacity(session.members.len());
    let mut previews = Vec::with_capacity(session.members.len());

    for member in &session.members {
        let mut occupants = lane_occupants(timeline, member.kind, member.lane, |id| {
            session.contains(id)
        });
        occupants.extend(
            placed
                .iter()
                .filter(|(kind, lane, _)| *kind == member.kind && *lane == member.lane)
                .map(|(_, _, occupant)| *occupant),
        );
        let position = magnetic_position(
            &occupants,
            member.original_position + delta_units,
            member.duration,
        );
        placed.push((
            member.kind,
            member.lane,
            Occupant {
                clip_id: member.clip_id,
                position,
                duration: member.duration,
            },
        ));
        previews.push(GhostPreview {
            clip_id: member.clip_id,
            kind: member.kind,
            lane: LaneTarget::Existing(member.lane),
            position,
            duration: member.duration,
            replace_target: None,
            offset_px: delta_px,
        });
    }
    previews
}
