//! Shared numeric constants for the canvas crate.

// ── Regions ─────────────────────────────────────────────────────

/// Minimum width and height of a region, in display pixels.
pub const MIN_REGION_SIZE: f64 = 10.0;

/// Default text given to the label auto-created with region `n` (1-based).
pub const DEFAULT_WORD_PREFIX: &str = "Word";

// ── Hit-testing ─────────────────────────────────────────────────

/// Maximum distance from a region center at which a point snaps to it.
pub const SNAP_RADIUS: f64 = 60.0;

/// Screen-space hit slop in pixels for the resize handle.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Connectors ──────────────────────────────────────────────────

/// Default connector stroke color.
pub const DEFAULT_ARROW_COLOR: &str = "#E53E3E";

/// Default connector stroke thickness in display pixels.
pub const DEFAULT_ARROW_THICKNESS: f64 = 3.0;

/// Warning emitted when an arrow is released away from every region.
pub const ARROW_NEEDS_BLOCK_WARNING: &str = "Arrow must start near a block";

// ── Label flow ──────────────────────────────────────────────────

/// Minimum label box width.
pub const LABEL_MIN_WIDTH: f64 = 60.0;

/// Estimated width of one character of label text.
pub const LABEL_CHAR_WIDTH: f64 = 8.0;

/// Horizontal padding added to the text width.
pub const LABEL_PADDING: f64 = 20.0;

/// Fixed label box height.
pub const LABEL_HEIGHT: f64 = 34.0;

/// Vertical distance between two flow rows.
pub const LABEL_ROW_HEIGHT: f64 = 38.0;

/// Gap between label boxes and around the flow.
pub const LABEL_MARGIN: f64 = 12.0;

// ── Scoring ─────────────────────────────────────────────────────

/// Percentage at or above which an attempt is shown as passed.
pub const PASS_PERCENTAGE: u32 = 60;
