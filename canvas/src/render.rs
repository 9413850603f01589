//! Rendering: turns authoring or placement state into draw calls.
//!
//! Scene assembly is platform-free. It talks to a minimal [`Renderer`] and
//! never mutates application state. The browser backend lives in
//! `web::Canvas2dRenderer`; [`RecordingRenderer`] captures the calls for tests
//! and the CLI.
//!
//! Backend errors propagate through `Renderer::Error`; the scene functions stop
//! at the first failing call.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::convert::Infallible;

use serde::Serialize;

use crate::authoring::AuthoringState;
use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::ConnectorStyle;
use crate::geom::{Point, Rect, Size};
use crate::input::Preview;
use crate::placement::PlacementRuntime;
use crate::transform::{ImageLoad, ImageTransform};

/// Fill and stroke of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RectStyle {
    pub fill: Option<&'static str>,
    pub stroke: &'static str,
    pub line_width: f64,
    pub dashed: bool,
}

pub const REGION_STYLE: RectStyle =
    RectStyle { fill: Some("rgba(66, 153, 225, 0.15)"), stroke: "#3182CE", line_width: 2.0, dashed: false };

pub const SELECTED_REGION_STYLE: RectStyle =
    RectStyle { fill: Some("rgba(30, 144, 255, 0.25)"), stroke: "#1E90FF", line_width: 3.0, dashed: false };

pub const DRAFT_STYLE: RectStyle =
    RectStyle { fill: Some("rgba(30, 144, 255, 0.12)"), stroke: "#1E90FF", line_width: 1.0, dashed: true };

pub const HANDLE_STYLE: RectStyle = RectStyle { fill: Some("#fff"), stroke: "#1E90FF", line_width: 1.0, dashed: false };

pub const LABEL_STYLE: RectStyle = RectStyle { fill: Some("#EDF2F7"), stroke: "#4A5568", line_width: 1.0, dashed: false };

pub const PLACED_LABEL_STYLE: RectStyle =
    RectStyle { fill: Some("#C6F6D5"), stroke: "#2F855A", line_width: 1.0, dashed: false };

pub const DRAGGING_LABEL_STYLE: RectStyle =
    RectStyle { fill: Some("#FEFCBF"), stroke: "#B7791F", line_width: 2.0, dashed: true };

/// Minimal 2D drawing surface.
pub trait Renderer {
    type Error;

    /// Clear a `size` viewport.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn clear(&mut self, size: Size) -> Result<(), Self::Error>;

    /// Draw the decoded image at `url` stretched over `rect`.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn draw_image(&mut self, url: &str, rect: Rect) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Backend-specific.
    fn draw_rect(&mut self, rect: Rect, style: &RectStyle) -> Result<(), Self::Error>;

    /// Draw a line from `start` with an arrowhead at `end`.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn draw_arrow(&mut self, start: Point, end: Point, style: &ConnectorStyle) -> Result<(), Self::Error>;

    /// Draw `text` centered in `rect`.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn draw_text(&mut self, text: &str, rect: Rect) -> Result<(), Self::Error>;
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear { size: Size },
    Image { url: String, rect: Rect },
    Rect { rect: Rect, style: RectStyle },
    Arrow { start: Point, end: Point, style: ConnectorStyle },
    Text { text: String, rect: Rect },
}

/// Renderer that records every call.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub ops: Vec<DrawOp>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    type Error = Infallible;

    fn clear(&mut self, size: Size) -> Result<(), Infallible> {
        self.ops.clear();
        self.ops.push(DrawOp::Clear { size });
        Ok(())
    }

    fn draw_image(&mut self, url: &str, rect: Rect) -> Result<(), Infallible> {
        self.ops.push(DrawOp::Image { url: url.to_owned(), rect });
        Ok(())
    }

    fn draw_rect(&mut self, rect: Rect, style: &RectStyle) -> Result<(), Infallible> {
        self.ops.push(DrawOp::Rect { rect, style: *style });
        Ok(())
    }

    fn draw_arrow(&mut self, start: Point, end: Point, style: &ConnectorStyle) -> Result<(), Infallible> {
        self.ops.push(DrawOp::Arrow { start, end, style: style.clone() });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, rect: Rect) -> Result<(), Infallible> {
        self.ops.push(DrawOp::Text { text: text.to_owned(), rect });
        Ok(())
    }
}

// =============================================================
// Authoring scene
// =============================================================

/// Draw the authoring canvas: image, regions with their words, connectors,
/// selection handle, then the in-progress draft on top.
///
/// # Errors
///
/// Returns the first backend error.
pub fn draw_authoring<R: Renderer>(r: &mut R, state: &AuthoringState) -> Result<(), R::Error> {
    r.clear(state.container)?;

    if let Some(image) = &state.image {
        draw_background(r, &image.url, &image.load, state.transform.as_ref())?;
    }

    for region in state.doc.regions() {
        let selected = state.ui.selected == Some(region.id);
        let rect = region.rect();
        r.draw_rect(rect, if selected { &SELECTED_REGION_STYLE } else { &REGION_STYLE })?;
        if let Some(label) = state.doc.label_for_region(region.id) {
            r.draw_text(&label.text, rect)?;
        }
    }

    for connector in state.doc.connectors() {
        r.draw_arrow(connector.start, connector.end, &connector.style)?;
    }

    if let Some(region) = state.ui.selected.and_then(|id| state.doc.region(id)) {
        let corner = region.rect().bottom_right();
        let side = HANDLE_RADIUS_PX;
        r.draw_rect(Rect::new(corner.x - side / 2.0, corner.y - side / 2.0, side, side), &HANDLE_STYLE)?;
    }

    match state.preview() {
        Some(Preview::Rect(rect)) => r.draw_rect(rect, &DRAFT_STYLE)?,
        Some(Preview::Segment { start, end }) => r.draw_arrow(start, end, &state.arrow_style)?,
        None => {}
    }
    Ok(())
}

// =============================================================
// Placement scene
// =============================================================

/// Draw the student canvas: image, region outlines, connectors, then labels
/// with the dragged one last.
///
/// # Errors
///
/// Returns the first backend error.
pub fn draw_placement<R: Renderer>(r: &mut R, rt: &PlacementRuntime, container: Size) -> Result<(), R::Error> {
    r.clear(container)?;
    draw_background(r, &rt.image().url, &rt.image().load, rt.transform().as_ref())?;

    for (_, rect) in rt.region_rects() {
        r.draw_rect(rect, &REGION_STYLE)?;
    }
    for segment in rt.connector_segments() {
        r.draw_arrow(segment.start, segment.end, &segment.style)?;
    }

    let (dragging, resting): (Vec<_>, Vec<_>) = rt.label_views().into_iter().partition(|v| v.dragging);
    for view in resting.iter().chain(&dragging) {
        let style = if view.dragging {
            &DRAGGING_LABEL_STYLE
        } else if view.is_placed() {
            &PLACED_LABEL_STYLE
        } else {
            &LABEL_STYLE
        };
        r.draw_rect(view.rect, style)?;
        r.draw_text(&view.text, view.rect)?;
    }
    Ok(())
}

/// The image is drawn only once decoded; a pending or failed decode leaves
/// the canvas blank behind the overlays.
fn draw_background<R: Renderer>(
    r: &mut R,
    url: &str,
    load: &ImageLoad,
    transform: Option<&ImageTransform>,
) -> Result<(), R::Error> {
    match (load, transform) {
        (ImageLoad::Ready(_), Some(t)) => r.draw_image(url, t.display_rect()),
        _ => Ok(()),
    }
}
