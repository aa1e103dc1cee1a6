/// Overlap classification and magnetic positioning within a single lane.
use serde::{Deserialize, Serialize};
use timeline::{Clip, ClipId, Units};

/// Tolerance for treating touching edges as non-overlapping.
pub(crate) const EDGE_EPSILON: f64 = 1e-6;

/// A clip already sitting in the target lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub clip_id: ClipId,
    pub position: Units,
    pub duration: Units,
}

impl Occupant {
    pub fn end(&self) -> Units {
        self.position + self.duration
    }
}

impl From<&Clip> for Occupant {
    fn from(clip: &Clip) -> Self {
        Self {
            clip_id: clip.id,
            position: clip.position,
            duration: clip.duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
    /// Lands exactly where requested and supersedes `target`
    Replace { target: ClipId },
    /// Shifted to the nearest free slot
    Magnetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Units,
    pub disposition: Disposition,
    /// Largest normalized overlap against any occupant
    pub max_ratio: f64,
}

impl Placement {
    pub fn replace_target(&self) -> Option<ClipId> {
        match self.disposition {
            Disposition::Replace { target } => Some(target),
            Disposition::Magnetic => None,
        }
    }

    pub fn is_replace(&self) -> bool {
        self.replace_target().is_some()
    }
}

/// Overlap length normalized by the shorter of the two spans.
pub fn overlap_ratio(start: Units, duration: Units, other_start: Units, other_duration: Units) -> f64 {
    let overlap = ((start + duration).min(other_start + other_duration) - start.max(other_start)).max(0.0);
    let shorter = duration.min(other_duration);
    if shorter <= 0.0 {
        return 0.0;
    }
    overlap / shorter
}

/// Highest overlap ratio against `occupants` and the clip producing it.
pub fn max_overlap(occupants: &[Occupant], requested: Units, duration: Units) -> (f64, Option<ClipId>) {
    let mut best = (0.0, None);
    for occupant in occupants {
        let ratio = overlap_ratio(requested, duration, occupant.position, occupant.duration);
        if ratio > best.0 {
            best = (ratio, Some(occupant.clip_id));
        }
    }
    best
}

fn is_free(occupants: &[Occupant], position: Units, duration: Units) -> bool {
    occupants.iter().all(|o| {
        position + duration <= o.position + EDGE_EPSILON || position >= o.end() - EDGE_EPSILON
    })
}

/// Nearest position to `requested` where `[p, p + duration)` hits no occupant.
///
/// Candidates are the requested slot itself, directly after each occupant
/// and directly before each occupant. The smallest displacement wins; on a
/// tie the earlier candidate in that order is kept.
pub fn magnetic_position(occupants: &[Occupant], requested: Units, duration: Units) -> Units {
    let requested = requested.max(0.0);
    let candidates = std::iter::once(requested)
        .chain(occupants.iter().map(Occupant::end))
        .chain(occupants.iter().map(|o| o.position - duration))
        .filter(|p| *p >= 0.0);

    let mut best: Option<(Units, f64)> = None;
    for candidate in candidates {
        if !is_free(occupants, candidate, duration) {
            continue;
        }
        let displacement = (candidate - requested).abs();
        match best {
            Some((_, best_displacement)) if displacement >= best_displacement => {}
            _ => best = Some((candidate, displacement)),
        }
    }

    best.map(|(p, _)| p).unwrap_or(requested)
}

/// Classify a requested placement: replace when the overlap ratio reaches
/// `threshold`, otherwise slide to the nearest free slot.
pub fn evaluate_placement(
    occupants: &[Occupant],
    requested: Units,
    duration: Units,
    threshold: f64,
) -> Placement {
    let requested = requested.max(0.0);
    let (max_ratio, most_overlapping) = max_overlap(occupants, requested, duration);

    if let Some(target) = most_overlapping.filter(|_| max_ratio >= threshold) {
        return Placement {
            position: requested,
            disposition: Disposition::Replace { target },
            max_ratio,
        };
    }

    Placement {
        position: magnetic_position(occupants, requested, duration),
        disposition: Disposition::Magnetic,
        max_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant(position: Units, duration: Units) -> Occupant {
        Occupant {
            clip_id: ClipId::new(),
            position,
            duration,
        }
    }

    #[test]
    fn test_overlap_ratio_uses_shorter_span() {
        assert_eq!(overlap_ratio(95.0, 20.0, 0.0, 100.0), 0.25);
        assert_eq!(overlap_ratio(20.0, 100.0, 0.0, 100.0), 0.8);
        assert_eq!(overlap_ratio(100.0, 20.0, 0.0, 100.0), 0.0);
        // Fully contained short clip
        assert_eq!(overlap_ratio(10.0, 10.0, 0.0, 100.0), 1.0);
    }

    #[test]
    fn test_snap_after_preceding_clip() {
        let occupants = vec![occupant(0.0, 100.0)];
        let placement = evaluate_placement(&occupants, 95.0, 20.0, 0.3);
        assert_eq!(placement.disposition, Disposition::Magnetic);
        assert_eq!(placement.position, 100.0);
        assert_eq!(placement.max_ratio, 0.25);
    }

    #[test]
    fn test_snap_before_following_clip() {
        let occupants = vec![occupant(100.0, 100.0)];
        // Ends 5 units into the occupant: cheaper to back off than to jump past it
        let placement = evaluate_placement(&occupants, 85.0, 20.0, 0.3);
        assert_eq!(placement.position, 80.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 30 units of a 100 unit clip overlap a 100 unit occupant: exactly 0.3
        let a = occupant(0.0, 100.0);
        let placement = evaluate_placement(&[a], 70.0, 100.0, 0.3);
        assert_eq!(placement.disposition, Disposition::Replace { target: a.clip_id });
        assert_eq!(placement.position, 70.0);

        let below = evaluate_placement(&[a], 70.5, 100.0, 0.3);
        assert_eq!(below.disposition, Disposition::Magnetic);
        assert_eq!(below.position, 100.0);
    }

    #[test]
    fn test_replace_targets_most_overlapping() {
        let a = occupant(0.0, 100.0);
        let b = occupant(150.0, 100.0);
        let placement = evaluate_placement(&[a, b], 60.0, 100.0, 0.3);
        // 40% against a, 10% against b
        assert_eq!(placement.replace_target(), Some(a.clip_id));
    }

    #[test]
    fn test_free_request_is_kept() {
        let occupants = vec![occupant(0.0, 100.0), occupant(300.0, 50.0)];
        let placement = evaluate_placement(&occupants, 150.0, 100.0, 0.3);
        assert_eq!(placement.position, 150.0);
        assert_eq!(placement.max_ratio, 0.0);
    }

    #[test]
    fn test_magnetic_skips_slots_too_small() {
        // Gap [100, 110) cannot hold a 20 unit clip
        let occupants = vec![occupant(0.0, 100.0), occupant(110.0, 100.0)];
        let position = magnetic_position(&occupants, 102.0, 20.0);
        assert_eq!(position, 210.0);
    }

    #[test]
    fn test_negative_request_is_floored() {
        let placement = evaluate_placement(&[], -40.0, 20.0, 0.3);
        assert_eq!(placement.position, 0.0);
    }
}
