#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

use crate::geom::{Point, Rect, Size};

/// Mapping between an image's native pixel space and the display viewport.
///
/// The image is fitted inside the container without ever upscaling and
/// centered on both axes. `scale` is always in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    pub original_width: f64,
    pub original_height: f64,
    pub display_x: f64,
    pub display_y: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub scale: f64,
}

impl ImageTransform {
    /// Fit an `image` into a `container`.
    ///
    /// Returns `None` when either size has a non-positive or non-finite
    /// dimension; callers treat that the same as a missing image.
    #[must_use]
    pub fn compute(image: Size, container: Size) -> Option<Self> {
        if !image.is_positive() || !container.is_positive() {
            return None;
        }
        let scale = (container.width / image.width)
            .min(container.height / image.height)
            .min(1.0);
        let display_width = image.width * scale;
        let display_height = image.height * scale;
        Some(Self {
            original_width: image.width,
            original_height: image.height,
            display_x: (container.width - display_width) / 2.0,
            display_y: (container.height - display_height) / 2.0,
            display_width,
            display_height,
            scale,
        })
    }

    /// Native image size.
    #[must_use]
    pub fn original_size(&self) -> Size {
        Size::new(self.original_width, self.original_height)
    }

    /// The image's on-screen rectangle.
    #[must_use]
    pub fn display_rect(&self) -> Rect {
        Rect::new(self.display_x, self.display_y, self.display_width, self.display_height)
    }

    /// Convert a display-space point to original-image pixels.
    #[must_use]
    pub fn to_original(&self, display: Point) -> Point {
        Point {
            x: (display.x - self.display_x) / self.scale,
            y: (display.y - self.display_y) / self.scale,
        }
    }

    /// Convert an original-image point to display space.
    #[must_use]
    pub fn to_display(&self, original: Point) -> Point {
        Point {
            x: original.x * self.scale + self.display_x,
            y: original.y * self.scale + self.display_y,
        }
    }

    /// Convert a display-space rect by mapping both corners independently.
    #[must_use]
    pub fn rect_to_original(&self, display: &Rect) -> Rect {
        let tl = self.to_original(display.top_left());
        let br = self.to_original(display.bottom_right());
        Rect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y)
    }

    /// Convert an original-image rect to display space, corner by corner.
    #[must_use]
    pub fn rect_to_display(&self, original: &Rect) -> Rect {
        let tl = self.to_display(original.top_left());
        let br = self.to_display(original.bottom_right());
        Rect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y)
    }

    /// Express an original-image point as a percentage (0-100) of the image size.
    #[must_use]
    pub fn to_percent(&self, original: Point) -> Point {
        Point {
            x: original.x / self.original_width * 100.0,
            y: original.y / self.original_height * 100.0,
        }
    }
}

/// Map a percentage point (0-100) back to pixels of an image of `original`
/// size. Inverse of [`ImageTransform::to_percent`].
#[must_use]
pub fn from_percent(percent: Point, original: Size) -> Point {
    Point::new(percent.x / 100.0 * original.width, percent.y / 100.0 * original.height)
}

/// Outcome of decoding the background image.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageLoad {
    /// Decode has been requested but not resolved yet.
    #[default]
    Pending,
    /// Decode finished; carries the natural image size.
    Ready(Size),
    /// Decode failed. The session continues without a background image.
    Failed(String),
}

impl ImageLoad {
    /// The natural size, once decoded.
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        match self {
            Self::Ready(size) => Some(*size),
            Self::Pending | Self::Failed(_) => None,
        }
    }
}

/// The uploaded background image and its decode state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub url: String,
    pub load: ImageLoad,
}

impl ImageSource {
    #[must_use]
    pub fn pending(url: impl Into<String>) -> Self {
        Self { url: url.into(), load: ImageLoad::Pending }
    }

    /// Transform for `container`, available only once the image is decoded.
    #[must_use]
    pub fn transform_for(&self, container: Size) -> Option<ImageTransform> {
        self.load
            .size()
            .and_then(|size| ImageTransform::compute(size, container))
    }
}
