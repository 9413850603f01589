//! Input model: authoring tools and the per-gesture draft state.
//!
//! `Tool` captures what a pointer gesture means. `InputState` is the gesture
//! in progress between pointer-down and pointer-up, carrying the context the
//! reducer needs to produce a preview and to commit on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::RegionId;
use crate::geom::{Point, Rect};

/// Which authoring tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Draw new regions (default).
    #[default]
    Create,
    /// Select, move and resize existing regions.
    Edit,
    /// Draw connectors between regions.
    Arrow,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// The selected region, if any.
    pub selected: Option<RegionId>,
}

/// The gesture in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging out a new region from an anchor corner.
    DrawingRegion {
        anchor: Point,
        current: Point,
    },
    /// Translating the selected region.
    MovingRegion {
        id: RegionId,
        /// Pointer position at the previous event.
        last: Point,
    },
    /// Dragging the bottom-right handle of the selected region.
    ResizingRegion {
        id: RegionId,
        /// Top-left corner, fixed for the whole gesture.
        origin: Point,
    },
    /// Dragging out a connector.
    DrawingArrow {
        start: Point,
        current: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// What the renderer draws for an in-progress gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    Rect(Rect),
    Segment { start: Point, end: Point },
}
