//! Browser bindings: a `Canvas2D` [`Renderer`], async image decode, and the
//! engines that own a canvas element.
//!
//! This is the only module that touches `web_sys`. Everything here delegates to
//! the platform-free core; fallible `Canvas2D` calls propagate `JsValue`.

use std::collections::HashMap;
use std::f64::consts::PI;

use tracing::{info, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::authoring::{Action, AuthoringCore, Event};
use crate::config::MatchConfig;
use crate::doc::ConnectorStyle;
use crate::geom::{Point, Rect, Size};
use crate::persist::PersistedTest;
use crate::placement::{DropOutcome, PlacementRuntime};
use crate::render::{self, RectStyle, Renderer};
use crate::transform::ImageLoad;

/// Arrowhead length in display pixels.
const ARROW_SIZE: f64 = 12.0;

/// Arrowhead half-angle in radians (~30°).
const ARROW_ANGLE: f64 = PI / 6.0;

/// Dash segment length for dashed outlines.
const DASH_PX: f64 = 4.0;

const LABEL_FONT: &str = "14px sans-serif";
const TEXT_COLOR: &str = "#1A202C";

// =============================================================
// Renderer
// =============================================================

/// [`Renderer`] over a 2D canvas context.
pub struct Canvas2dRenderer {
    ctx: CanvasRenderingContext2d,
    dpr: f64,
    images: HashMap<String, HtmlImageElement>,
}

impl Canvas2dRenderer {
    /// Acquire the `2d` context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: &HtmlCanvasElement, dpr: f64) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { ctx, dpr, images: HashMap::new() })
    }

    /// Register a decoded image so `draw_image` can find it by URL.
    pub fn add_image(&mut self, url: &str, image: HtmlImageElement) {
        self.images.insert(url.to_owned(), image);
    }

    pub fn set_dpr(&mut self, dpr: f64) {
        self.dpr = dpr;
    }

    fn set_dashed(&self, dashed: bool) -> Result<(), JsValue> {
        let pattern = js_sys::Array::new();
        if dashed {
            pattern.push(&DASH_PX.into());
            pattern.push(&DASH_PX.into());
        }
        self.ctx.set_line_dash(&pattern)
    }
}

impl Renderer for Canvas2dRenderer {
    type Error = JsValue;

    fn clear(&mut self, size: Size) -> Result<(), JsValue> {
        self.ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0)?;
        self.ctx.clear_rect(0.0, 0.0, size.width, size.height);
        Ok(())
    }

    fn draw_image(&mut self, url: &str, rect: Rect) -> Result<(), JsValue> {
        let Some(image) = self.images.get(url) else {
            return Ok(());
        };
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.width, rect.height)
    }

    fn draw_rect(&mut self, rect: Rect, style: &RectStyle) -> Result<(), JsValue> {
        self.ctx.save();
        if let Some(fill) = style.fill {
            self.ctx.set_fill_style_str(fill);
            self.ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
        }
        self.set_dashed(style.dashed)?;
        self.ctx.set_stroke_style_str(style.stroke);
        self.ctx.set_line_width(style.line_width);
        self.ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
        self.ctx.restore();
        Ok(())
    }

    fn draw_arrow(&mut self, start: Point, end: Point, style: &ConnectorStyle) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        ctx.save();
        ctx.set_stroke_style_str(&style.color);
        ctx.set_fill_style_str(&style.color);
        ctx.set_line_width(style.thickness);

        ctx.begin_path();
        ctx.move_to(start.x, start.y);
        ctx.line_to(end.x, end.y);
        ctx.stroke();

        let angle = (end.y - start.y).atan2(end.x - start.x);
        ctx.begin_path();
        ctx.move_to(end.x, end.y);
        ctx.line_to(end.x - ARROW_SIZE * (angle - ARROW_ANGLE).cos(), end.y - ARROW_SIZE * (angle - ARROW_ANGLE).sin());
        ctx.line_to(end.x - ARROW_SIZE * (angle + ARROW_ANGLE).cos(), end.y - ARROW_SIZE * (angle + ARROW_ANGLE).sin());
        ctx.close_path();
        ctx.fill();

        ctx.restore();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, rect: Rect) -> Result<(), JsValue> {
        let center = rect.center();
        self.ctx.save();
        self.ctx.set_font(LABEL_FONT);
        self.ctx.set_fill_style_str(TEXT_COLOR);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.fill_text_with_max_width(text, center.x, center.y, rect.width)?;
        self.ctx.restore();
        Ok(())
    }
}

// =============================================================
// Image decode
// =============================================================

/// Load and decode `url`. Failure is reported as [`ImageLoad::Failed`],
/// never as an error.
pub async fn decode_image(url: &str) -> (ImageLoad, Option<HtmlImageElement>) {
    let image = match HtmlImageElement::new() {
        Ok(image) => image,
        Err(e) => return (ImageLoad::Failed(format!("{e:?}")), None),
    };
    image.set_cross_origin(Some("anonymous"));
    image.set_src(url);
    match JsFuture::from(image.decode()).await {
        Ok(_) => {
            let size = Size::new(f64::from(image.natural_width()), f64::from(image.natural_height()));
            info!(%url, width = size.width, height = size.height, "image decoded");
            (ImageLoad::Ready(size), Some(image))
        }
        Err(e) => {
            warn!(%url, error = ?e, "image decode failed");
            (ImageLoad::Failed(format!("{e:?}")), None)
        }
    }
}

// =============================================================
// Engines
// =============================================================

/// Authoring canvas. Wraps [`AuthoringCore`] and owns the canvas element.
pub struct Engine {
    renderer: Canvas2dRenderer,
    pub core: AuthoringCore,
}

impl Engine {
    /// Bind a new authoring engine to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: &HtmlCanvasElement, dpr: f64, config: MatchConfig) -> Result<Self, JsValue> {
        Ok(Self { renderer: Canvas2dRenderer::new(canvas, dpr)?, core: AuthoringCore::new(config) })
    }

    /// Apply `action` and redraw when anything visible changed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<Event>, JsValue> {
        let events = self.core.dispatch(action);
        if !events.is_empty() {
            self.render()?;
        }
        Ok(events)
    }

    /// Upload `url` as the background and decode it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing fails; decode failure is an event, not an error.
    pub async fn load_image(&mut self, url: &str) -> Result<Vec<Event>, JsValue> {
        let mut events = self.dispatch(Action::UploadImage { url: url.to_owned() })?;
        let (load, element) = decode_image(url).await;
        if let Some(element) = element {
            self.renderer.add_image(url, element);
        }
        events.extend(self.dispatch(Action::ImageDecoded(load))?);
        Ok(events)
    }

    /// Resize the viewport and device pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Result<Vec<Event>, JsValue> {
        self.renderer.set_dpr(dpr);
        self.dispatch(Action::SetContainer(Size::new(width_css, height_css)))
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        render::draw_authoring(&mut self.renderer, &self.core.state)
    }
}

/// Student canvas. Wraps a [`PlacementRuntime`].
pub struct StudentEngine {
    renderer: Canvas2dRenderer,
    container: Size,
    pub runtime: PlacementRuntime,
}

impl StudentEngine {
    /// Bind a student engine for `test` to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: &HtmlCanvasElement, dpr: f64, test: &PersistedTest, config: MatchConfig) -> Result<Self, JsValue> {
        Ok(Self {
            renderer: Canvas2dRenderer::new(canvas, dpr)?,
            container: Size::default(),
            runtime: PlacementRuntime::new(test, config),
        })
    }

    /// Decode the test image; the session continues if it fails.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub async fn load_image(&mut self) -> Result<(), JsValue> {
        let url = self.runtime.image().url.clone();
        let (load, element) = decode_image(&url).await;
        if let Some(element) = element {
            self.renderer.add_image(&url, element);
        }
        self.runtime.set_image(load);
        self.render()
    }

    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Result<(), JsValue> {
        self.renderer.set_dpr(dpr);
        self.container = Size::new(width_css, height_css);
        self.runtime.set_container(self.container);
        self.render()
    }

    /// Start dragging whichever label is under `pointer`, topmost first.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn on_pointer_down(&mut self, pointer: Point) -> Result<bool, JsValue> {
        let hit = self
            .runtime
            .label_views()
            .into_iter()
            .rev()
            .find(|v| v.rect.contains(pointer))
            .map(|v| v.id);
        let Some(label) = hit else {
            return Ok(false);
        };
        let started = self.runtime.begin_drag(label, pointer);
        self.render()?;
        Ok(started)
    }

    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn on_pointer_move(&mut self, pointer: Point) -> Result<(), JsValue> {
        self.runtime.drag_to(pointer);
        self.render()
    }

    /// # Errors
    ///
    /// Returns `Err` if drawing fails.
    pub fn on_pointer_up(&mut self, pointer: Point) -> Result<Option<DropOutcome>, JsValue> {
        let outcome = self.runtime.end_drag(pointer);
        self.render()?;
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        render::draw_placement(&mut self.renderer, &self.runtime, self.container)
    }
}
