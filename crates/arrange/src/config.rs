use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ArrangeError;

/// Tunables for the arrangement engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Overlap ratio at which a drop replaces the occupant (inclusive)
    #[serde(default = "default_replace_threshold")]
    pub overlap_replace_threshold: f64,

    /// Lane cap per track type
    #[serde(default = "default_max_lanes")]
    pub max_lanes_per_kind: usize,

    /// Height of the "create lane" band below the last lane, in screen pixels
    #[serde(default = "default_new_lane_zone_height")]
    pub new_lane_zone_height: f64,

    /// Grab distance around the playhead, in screen pixels
    #[serde(default = "default_playhead_grab_px")]
    pub playhead_grab_px: f64,

    /// Pointer travel before a resize takes effect, in screen pixels
    #[serde(default = "default_resize_activation_px")]
    pub resize_activation_px: f64,

    /// Smallest clip duration a resize may produce, in units
    #[serde(default = "default_min_clip_width")]
    pub min_clip_width: f64,

    /// Upper bound on waiting for a replace confirmation; `None` waits forever
    #[serde(default)]
    pub confirm_timeout_ms: Option<u64>,
}

fn default_replace_threshold() -> f64 {
    0.3
}

fn default_max_lanes() -> usize {
    timeline::DEFAULT_MAX_LANES
}

fn default_new_lane_zone_height() -> f64 {
    24.0
}

fn default_playhead_grab_px() -> f64 {
    8.0
}

fn default_resize_activation_px() -> f64 {
    3.0
}

fn default_min_clip_width() -> f64 {
    20.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overlap_replace_threshold: default_replace_threshold(),
            max_lanes_per_kind: default_max_lanes(),
            new_lane_zone_height: default_new_lane_zone_height(),
            playhead_grab_px: default_playhead_grab_px(),
            resize_activation_px: default_resize_activation_px(),
            min_clip_width: default_min_clip_width(),
            confirm_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ArrangeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ArrangeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ArrangeError> {
        if !(self.overlap_replace_threshold > 0.0 && self.overlap_replace_threshold <= 1.0) {
            return Err(ArrangeError::Config(format!(
                "overlap_replace_threshold must be in (0, 1], got {}",
                self.overlap_replace_threshold
            )));
        }
        if self.max_lanes_per_kind == 0 {
            return Err(ArrangeError::Config(
                "max_lanes_per_kind must be at least 1".to_string(),
            ));
        }
        let non_negative = [
            ("new_lane_zone_height", self.new_lane_zone_height),
            ("playhead_grab_px", self.playhead_grab_px),
            ("resize_activation_px", self.resize_activation_px),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ArrangeError::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if !self.min_clip_width.is_finite() || self.min_clip_width <= 0.0 {
            return Err(ArrangeError::Config(format!(
                "min_clip_width must be positive, got {}",
                self.min_clip_width
            )));
        }
        Ok(())
    }

    pub fn confirm_timeout(&self) -> Option<Duration> {
        self.confirm_timeout_ms.map(Duration::from_millis)
    }
}
