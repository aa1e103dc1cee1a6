/// Pointer-driven arrangement of clips across lanes: drag, resize, lane
/// targeting, overlap handling, selection and playhead scrubbing.
use thiserror::Error;
use timeline::TimelineError;

mod config;
pub use config::*;

mod geometry;
pub use geometry::*;

pub mod selection;
pub use selection::{RectSelection, SelectedClip, SelectionManager};

pub mod overlap;
pub use overlap::{Disposition, Occupant, Placement};

mod preference;
pub use preference::*;

pub mod targeting;
pub use targeting::{ClipRect, LaneArea, LaneResolution, LaneSource, LaneTarget, LaneTracker, LayoutQuery};

mod layout;
pub use layout::*;

pub mod playhead;
pub use playhead::CursorHint;

mod session;
pub use session::*;

mod host;
pub use host::*;

mod engine;
pub use engine::*;

#[derive(Debug, Error)]
pub enum ArrangeError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("clip vanished during drag: {0}")]
    ClipMissing(timeline::ClipId),
}

pub type Result<T> = std::result::Result<T, ArrangeError>;
