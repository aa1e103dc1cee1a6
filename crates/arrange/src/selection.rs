/// Clip selection for the timeline: one clicked clip, or the set picked by a
/// rectangle drag. The two are mutually exclusive.
use serde::{Deserialize, Serialize};
use timeline::{ClipId, TrackKind};

use crate::{ClipRect, Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedClip {
    pub clip_id: ClipId,
    pub kind: TrackKind,
}

impl SelectedClip {
    pub fn new(clip_id: ClipId, kind: TrackKind) -> Self {
        Self { clip_id, kind }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionManager {
    /// Clip picked by a click
    selected: Option<SelectedClip>,
    /// Clips picked by a rectangle drag, in hit order
    rect_selected: Vec<SelectedClip>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a single clip, dropping any rectangle selection
    pub fn select_clip(&mut self, clip_id: ClipId, kind: TrackKind) {
        self.rect_selected.clear();
        self.selected = Some(SelectedClip::new(clip_id, kind));
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.rect_selected.clear();
    }

    /// Replace the rectangle selection, dropping the single selection
    pub fn set_rect_selection(&mut self, list: Vec<SelectedClip>) {
        self.selected = None;
        self.rect_selected.clear();
        for entry in list {
            if !self.rect_selected.contains(&entry) {
                self.rect_selected.push(entry);
            }
        }
    }

    /// Collect every clip whose rectangle overlaps `rect` into the rectangle selection
    pub fn select_in_rect(&mut self, rect: Rect, clip_rects: &[ClipRect]) -> usize {
        let hits = clip_rects
            .iter()
            .filter(|c| rect.intersects(&c.rect))
            .map(|c| SelectedClip::new(c.clip_id, c.kind))
            .collect();
        self.set_rect_selection(hits);
        self.rect_selected.len()
    }

    /// Drop a clip that no longer exists
    pub fn forget(&mut self, clip_id: ClipId) {
        if self.selected.is_some_and(|s| s.clip_id == clip_id) {
            self.selected = None;
        }
        self.rect_selected.retain(|s| s.clip_id != clip_id);
    }

    pub fn selected_clip(&self) -> Option<SelectedClip> {
        self.selected
    }

    pub fn rect_selection(&self) -> &[SelectedClip] {
        &self.rect_selected
    }

    pub fn has_rect_selection(&self) -> bool {
        !self.rect_selected.is_empty()
    }

    pub fn is_selected(&self, clip_id: ClipId) -> bool {
        self.selected.is_some_and(|s| s.clip_id == clip_id)
            || self.rect_selected.iter().any(|s| s.clip_id == clip_id)
    }

    pub fn in_rect_selection(&self, clip_id: ClipId) -> bool {
        self.rect_selected.iter().any(|s| s.clip_id == clip_id)
    }

    pub fn count(&self) -> usize {
        if self.selected.is_some() {
            1
        } else {
            self.rect_selected.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Every selected clip, whichever mode is active
    pub fn selected_ids(&self) -> Vec<ClipId> {
        match self.selected {
            Some(s) => vec![s.clip_id],
            None => self.rect_selected.iter().map(|s| s.clip_id).collect(),
        }
    }
}

/// Rectangle selection gesture in progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectSelection {
    pub start: Point,
    pub current: Point,
}

impl RectSelection {
    pub fn new(start: Point) -> Self {
        Self {
            start,
            current: start,
        }
    }

    pub fn update(&mut self, current: Point) {
        self.current = current;
    }

    pub fn rect(&self) -> Rect {
        Rect::from_two_points(self.start, self.current)
    }

    /// A press and release without travel is a click, not a marquee
    pub fn is_click(&self) -> bool {
        let rect = self.rect();
        rect.width() < 1.0 && rect.height() < 1.0
    }
}
