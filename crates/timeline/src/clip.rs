use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{timescale::seconds_to_units, Units};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Track type; every type owns an independent lane list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Text,
    Sound,
}

impl TrackKind {
    pub const ALL: [TrackKind; 3] = [TrackKind::Video, TrackKind::Text, TrackKind::Sound];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Text => "text",
            Self::Sound => "sound",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TrackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "text" => Ok(Self::Text),
            "sound" | "audio" => Ok(Self::Sound),
            other => Err(format!("unknown track type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipPayload {
    Video {
        src: String,
        /// Source in-point in seconds.
        #[serde(default)]
        start_time: f64,
        /// Longest span the source can cover, in units.
        #[serde(default)]
        max_duration: Option<Units>,
    },

    Text {
        text: String,
        #[serde(default = "default_text_color")]
        color: String,
    },

    Sound {
        src: String,
        #[serde(default)]
        start_time: f64,
        #[serde(default)]
        max_duration: Option<Units>,
        #[serde(default = "default_volume")]
        volume: f32,
        #[serde(default)]
        fade_in: f64,
        #[serde(default)]
        fade_out: f64,
    },
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

fn default_volume() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: ClipId,
    #[serde(default)]
    pub lane_index: usize,
    pub position: Units,
    pub duration: Units,
    #[serde(flatten)]
    pub payload: ClipPayload,
}

impl Clip {
    pub fn new(payload: ClipPayload, lane_index: usize, position: Units, duration: Units) -> Self {
        Self {
            id: ClipId::new(),
            lane_index,
            position,
            duration,
            payload,
        }
    }

    pub fn video(src: impl Into<String>, lane_index: usize, position: Units, duration: Units) -> Self {
        Self::new(
            ClipPayload::Video {
                src: src.into(),
                start_time: 0.0,
                max_duration: None,
            },
            lane_index,
            position,
            duration,
        )
    }

    pub fn text(text: impl Into<String>, lane_index: usize, position: Units, duration: Units) -> Self {
        Self::new(
            ClipPayload::Text {
                text: text.into(),
                color: default_text_color(),
            },
            lane_index,
            position,
            duration,
        )
    }

    pub fn sound(src: impl Into<String>, lane_index: usize, position: Units, duration: Units) -> Self {
        Self::new(
            ClipPayload::Sound {
                src: src.into(),
                start_time: 0.0,
                max_duration: None,
                volume: default_volume(),
                fade_in: 0.0,
                fade_out: 0.0,
            },
            lane_index,
            position,
            duration,
        )
    }

    pub fn kind(&self) -> TrackKind {
        match self.payload {
            ClipPayload::Video { .. } => TrackKind::Video,
            ClipPayload::Text { .. } => TrackKind::Text,
            ClipPayload::Sound { .. } => TrackKind::Sound,
        }
    }

    pub fn end(&self) -> Units {
        self.position + self.duration
    }

    /// Source in-point in seconds; `None` for generated clips.
    pub fn start_time(&self) -> Option<f64> {
        match self.payload {
            ClipPayload::Video { start_time, .. } | ClipPayload::Sound { start_time, .. } => {
                Some(start_time.max(0.0))
            }
            ClipPayload::Text { .. } => None,
        }
    }

    /// How far (in units) the left edge may move left before running out of
    /// source. Generated clips have no source and no such limit.
    pub fn leading_source_units(&self) -> Option<Units> {
        self.start_time().map(seconds_to_units)
    }

    /// Moves the source in-point; ignored by generated clips.
    pub fn set_start_time(&mut self, seconds: f64) {
        match &mut self.payload {
            ClipPayload::Video { start_time, .. } | ClipPayload::Sound { start_time, .. } => {
                *start_time = seconds.max(0.0);
            }
            ClipPayload::Text { .. } => {}
        }
    }

    pub fn max_duration(&self) -> Option<Units> {
        match self.payload {
            ClipPayload::Video { max_duration, .. } | ClipPayload::Sound { max_duration, .. } => {
                max_duration.filter(|d| d.is_finite() && *d > 0.0)
            }
            ClipPayload::Text { .. } => None,
        }
    }

    pub fn with_start_time(mut self, seconds: f64) -> Self {
        self.set_start_time(seconds);
        self
    }

    pub fn with_max_duration(mut self, units: Units) -> Self {
        match &mut self.payload {
            ClipPayload::Video { max_duration, .. } | ClipPayload::Sound { max_duration, .. } => {
                *max_duration = Some(units);
            }
            ClipPayload::Text { .. } => {}
        }
        self
    }

    /// Whether `[position, position + duration)` intersects this clip.
    pub fn overlaps(&self, position: Units, duration: Units) -> bool {
        position < self.end() && position + duration > self.position
    }
}
