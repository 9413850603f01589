//! Persisted test representation and the on-save conversion.
//!
//! Authoring works in display space. Saving converts every region corner and
//! connector endpoint to original-image pixels, and connectors additionally to
//! percentages of the original image so they redraw faithfully at any
//! viewport.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::authoring::AuthoringState;
use crate::doc::{Connector, ConnectorStyle, RegionId};
use crate::error::ErrorCode;
use crate::geom::{Point, Rect, Size};
use crate::session::StoreError;
use crate::transform::{self, ImageTransform};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no image has been uploaded")]
    MissingImage,
    #[error("a test needs at least one block")]
    NoRegions,
    #[error("block {0} has no word")]
    EmptyWord(RegionId),
    #[error("persisting test failed: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for SaveError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingImage => "E_MISSING_IMAGE",
            Self::NoRegions => "E_NO_BLOCKS",
            Self::EmptyWord(_) => "E_EMPTY_WORD",
            Self::Store(e) => e.error_code(),
        }
    }
}

/// One authored region with its expected word, in original-image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBlock {
    pub question_id: RegionId,
    pub word: String,
    pub block_coordinates: Rect,
}

/// A connector in original-image pixels, plus percentage coordinates when the
/// image size was known at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArrow {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub rel_start_x: Option<f64>,
    pub rel_start_y: Option<f64>,
    pub rel_end_x: Option<f64>,
    pub rel_end_y: Option<f64>,
    pub image_width: Option<f64>,
    pub image_height: Option<f64>,
    pub style: ConnectorStyle,
}

impl PersistedArrow {
    fn from_connector(connector: &Connector, transform: Option<&ImageTransform>) -> Self {
        let Some(t) = transform else {
            return Self {
                start_x: connector.start.x,
                start_y: connector.start.y,
                end_x: connector.end.x,
                end_y: connector.end.y,
                rel_start_x: None,
                rel_start_y: None,
                rel_end_x: None,
                rel_end_y: None,
                image_width: None,
                image_height: None,
                style: connector.style.clone(),
            };
        };
        let start = t.to_original(connector.start);
        let end = t.to_original(connector.end);
        let rel_start = t.to_percent(start);
        let rel_end = t.to_percent(end);
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            rel_start_x: Some(rel_start.x),
            rel_start_y: Some(rel_start.y),
            rel_end_x: Some(rel_end.x),
            rel_end_y: Some(rel_end.y),
            image_width: Some(t.original_width),
            image_height: Some(t.original_height),
            style: connector.style.clone(),
        }
    }

    /// Endpoints in original-image pixels for an image of `original` size.
    ///
    /// Percentages win when all four are present; otherwise the stored pixel
    /// coordinates are used as-is.
    #[must_use]
    pub fn endpoints(&self, original: Size) -> (Point, Point) {
        match (self.rel_start_x, self.rel_start_y, self.rel_end_x, self.rel_end_y) {
            (Some(sx), Some(sy), Some(ex), Some(ey)) => (
                transform::from_percent(Point::new(sx, sy), original),
                transform::from_percent(Point::new(ex, ey), original),
            ),
            _ => (Point::new(self.start_x, self.start_y), Point::new(self.end_x, self.end_y)),
        }
    }

    /// The image size recorded at save time, if any.
    #[must_use]
    pub fn image_size(&self) -> Option<Size> {
        match (self.image_width, self.image_height) {
            (Some(w), Some(h)) => Some(Size::new(w, h)).filter(|s| s.is_positive()),
            _ => None,
        }
    }
}

/// The persisted picture-matching test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTest {
    pub image_url: String,
    pub blocks: Vec<PersistedBlock>,
    pub has_arrow: bool,
    pub arrow: Option<PersistedArrow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrows: Vec<PersistedArrow>,
}

impl PersistedTest {
    /// Every stored connector, preferring the multi-arrow list.
    #[must_use]
    pub fn all_arrows(&self) -> Vec<&PersistedArrow> {
        if self.arrows.is_empty() {
            self.arrow.iter().collect()
        } else {
            self.arrows.iter().collect()
        }
    }

    /// Original image size as recorded by any saved connector.
    #[must_use]
    pub fn recorded_image_size(&self) -> Option<Size> {
        self.all_arrows().into_iter().find_map(PersistedArrow::image_size)
    }
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Convert the authoring state to its persisted form.
///
/// Each block's `word` is its label text with surrounding whitespace trimmed;
/// that trimmed word is what students see and are scored against. The
/// author's label text is left as typed, so editing a multi-word label never
/// loses a space mid-keystroke.
///
/// # Errors
///
/// Returns [`SaveError`] when no image was uploaded, there are no regions, or
/// a region's word is blank.
pub fn to_persisted(state: &AuthoringState) -> Result<PersistedTest, SaveError> {
    let image = state.image.as_ref().ok_or(SaveError::MissingImage)?;
    if state.doc.region_count() == 0 {
        return Err(SaveError::NoRegions);
    }
    let transform = state.transform.as_ref();

    let mut blocks = Vec::with_capacity(state.doc.region_count());
    for region in state.doc.regions() {
        let word = state
            .doc
            .label_for_region(region.id)
            .map(|l| l.text.trim())
            .filter(|w| !w.is_empty())
            .ok_or(SaveError::EmptyWord(region.id))?;
        let rect = transform.map_or(region.rect(), |t| t.rect_to_original(&region.rect()));
        blocks.push(PersistedBlock { question_id: region.id, word: word.to_owned(), block_coordinates: rect });
    }

    let arrows: Vec<PersistedArrow> = state
        .doc
        .connectors()
        .map(|c| PersistedArrow::from_connector(c, transform))
        .collect();
    debug!(blocks = blocks.len(), arrows = arrows.len(), scaled = transform.is_some(), "test converted for save");

    Ok(PersistedTest {
        image_url: image.url.clone(),
        blocks,
        has_arrow: !arrows.is_empty(),
        arrow: arrows.first().cloned(),
        arrows,
    })
}
