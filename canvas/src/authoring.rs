//! Authoring state machine: the author-side reducer.
//!
//! DESIGN
//! ======
//! All authoring behavior flows through [`reduce`], a pure transition from
//! `(AuthoringState, Action)` to `(AuthoringState, Vec<Event>)`. Hosts feed it
//! pointer and command actions one at a time; the returned events tell them
//! what changed (for persistence hooks, notifications and repaint). Rendering
//! reads the state and the derived [`AuthoringState::preview`], never the
//! other way around.
//!
//! During authoring every region and connector coordinate is in display
//! space. Conversion to original-image space happens only on save.
//!
//! Display coordinates are relative to `frame`, the last transform that
//! resolved. A pending re-upload drops `transform` to `None` but keeps the
//! frame, so a later decode still reprojects from the space the regions were
//! drawn in. Reprojection never clamps; the minimum size applies only to
//! create and resize.

#[cfg(test)]
#[path = "authoring_test.rs"]
mod authoring_test;

use tracing::{debug, info, warn};

use crate::config::MatchConfig;
use crate::consts::{ARROW_NEEDS_BLOCK_WARNING, DEFAULT_WORD_PREFIX, HANDLE_RADIUS_PX};
use crate::doc::{Connector, ConnectorId, ConnectorStyle, DocStore, Label, LabelId, Region, RegionId};
use crate::geom::{Point, Rect, Size};
use crate::input::{InputState, Preview, Tool, UiState};
use crate::snap;
use crate::transform::{ImageLoad, ImageSource, ImageTransform};

/// Commands accepted by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTool(Tool),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Select(Option<RegionId>),
    MoveRegion { id: RegionId, dx: f64, dy: f64 },
    ResizeRegion { id: RegionId, width: f64, height: f64 },
    RenameLabel { id: LabelId, text: String },
    DeleteRegion(RegionId),
    DeleteConnector(ConnectorId),
    DeleteSelected,
    SetArrowStyle(ConnectorStyle),
    CancelDraft,
    Reset,
    UploadImage { url: String },
    ImageDecoded(ImageLoad),
    SetContainer(Size),
}

/// Changes reported back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RegionCreated(Region),
    LabelCreated(Label),
    RegionUpdated(Region),
    LabelUpdated(Label),
    RegionDeleted { region: Region, labels: Vec<Label>, connectors: Vec<Connector> },
    ConnectorCreated(Connector),
    ConnectorDeleted(Connector),
    SelectionChanged(Option<RegionId>),
    TransformChanged(Option<ImageTransform>),
    /// Recoverable, user-visible problem with the last gesture.
    Warning(String),
    /// Informational notification (e.g. the image could not be decoded).
    Notice(String),
    RenderNeeded,
}

/// Everything the authoring canvas knows.
#[derive(Debug, Clone, Default)]
pub struct AuthoringState {
    pub doc: DocStore,
    pub ui: UiState,
    pub input: InputState,
    pub image: Option<ImageSource>,
    pub container: Size,
    pub transform: Option<ImageTransform>,
    pub arrow_style: ConnectorStyle,
    pub config: MatchConfig,
    /// Transform the current display coordinates are expressed in.
    frame: Option<ImageTransform>,
    next_id: u64,
}

impl AuthoringState {
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self { arrow_style: config.arrow_style.clone(), config, next_id: 1, ..Self::default() }
    }

    /// The in-progress gesture as something drawable.
    #[must_use]
    pub fn preview(&self) -> Option<Preview> {
        match self.input {
            InputState::DrawingRegion { anchor, current } => {
                Some(Preview::Rect(Rect::from_corners(anchor, current, self.config.min_region_size)))
            }
            InputState::DrawingArrow { start, current } => Some(Preview::Segment { start, end: current }),
            InputState::Idle | InputState::MovingRegion { .. } | InputState::ResizingRegion { .. } => None,
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn select(&mut self, id: Option<RegionId>, events: &mut Vec<Event>) {
        if self.ui.selected != id {
            self.ui.selected = id;
            events.push(Event::SelectionChanged(id));
        }
    }

    fn recompute_transform(&mut self, events: &mut Vec<Event>) {
        let next = self
            .image
            .as_ref()
            .and_then(|image| image.transform_for(self.container));
        if next == self.transform {
            return;
        }
        if let Some(new) = next {
            if let Some(old) = self.frame.filter(|old| *old != new && old.original_size() == new.original_size()) {
                self.reproject(&old, &new, events);
            }
            self.frame = Some(new);
        }
        self.transform = next;
        events.push(Event::TransformChanged(next));
    }

    fn reproject(&mut self, old: &ImageTransform, new: &ImageTransform, events: &mut Vec<Event>) {
        let region_ids: Vec<RegionId> = self.doc.regions().map(|r| r.id).collect();
        for id in region_ids {
            let Some(region) = self.doc.region_mut(id) else {
                continue;
            };
            region.set_rect(new.rect_to_display(&old.rect_to_original(&region.rect())));
            events.push(Event::RegionUpdated(region.clone()));
        }
        let connectors: Vec<Connector> = self.doc.connectors().cloned().collect();
        for mut connector in connectors {
            connector.start = new.to_display(old.to_original(connector.start));
            connector.end = new.to_display(old.to_original(connector.end));
            self.doc.insert_connector(connector);
        }
    }
}

/// Apply one action. Pure: the only effects are the returned state and events.
#[must_use]
pub fn reduce(mut state: AuthoringState, action: Action) -> (AuthoringState, Vec<Event>) {
    let mut events = Vec::new();
    match action {
        Action::SetTool(tool) => {
            let had_draft = !state.input.is_idle();
            state.input = InputState::Idle;
            if state.ui.tool != tool || had_draft {
                state.ui.tool = tool;
                events.push(Event::RenderNeeded);
            }
        }
        Action::PointerDown(pt) => pointer_down(&mut state, pt, &mut events),
        Action::PointerMove(pt) => pointer_move(&mut state, pt, &mut events),
        Action::PointerUp(pt) => pointer_up(&mut state, pt, &mut events),
        Action::Select(id) => {
            let id = id.filter(|id| state.doc.region(*id).is_some());
            state.select(id, &mut events);
            events.push(Event::RenderNeeded);
        }
        Action::MoveRegion { id, dx, dy } => {
            if let Some(region) = state.doc.region_mut(id) {
                region.set_rect(region.rect().translate(dx, dy));
                events.push(Event::RegionUpdated(region.clone()));
                events.push(Event::RenderNeeded);
            }
        }
        Action::ResizeRegion { id, width, height } => {
            let min = state.config.min_region_size;
            if let Some(region) = state.doc.region_mut(id) {
                let rect = Rect::new(region.x, region.y, width.max(min), height.max(min));
                *region = Region::from_rect(id, rect);
                events.push(Event::RegionUpdated(region.clone()));
                events.push(Event::RenderNeeded);
            }
        }
        Action::RenameLabel { id, text } => {
            if state.doc.rename_label(id, text) {
                if let Some(label) = state.doc.label(id) {
                    events.push(Event::LabelUpdated(label.clone()));
                }
                events.push(Event::RenderNeeded);
            }
        }
        Action::DeleteRegion(id) => delete_region(&mut state, id, &mut events),
        Action::DeleteSelected => {
            if let Some(id) = state.ui.selected {
                delete_region(&mut state, id, &mut events);
            }
        }
        Action::DeleteConnector(id) => {
            if let Some(connector) = state.doc.remove_connector(id) {
                info!(connector = %id, "connector deleted");
                events.push(Event::ConnectorDeleted(connector));
                events.push(Event::RenderNeeded);
            }
        }
        Action::SetArrowStyle(style) => state.arrow_style = style,
        Action::CancelDraft => {
            if !state.input.is_idle() {
                state.input = InputState::Idle;
                events.push(Event::RenderNeeded);
            }
        }
        Action::Reset => {
            state.doc.clear();
            state.input = InputState::Idle;
            state.select(None, &mut events);
            info!("authoring canvas reset");
            events.push(Event::RenderNeeded);
        }
        Action::UploadImage { url } => {
            info!(%url, "image uploaded; awaiting decode");
            state.image = Some(ImageSource::pending(url));
            state.recompute_transform(&mut events);
            events.push(Event::RenderNeeded);
        }
        Action::ImageDecoded(load) => {
            let Some(image) = state.image.as_mut() else {
                return (state, events);
            };
            if let ImageLoad::Failed(reason) = &load {
                warn!(url = %image.url, %reason, "image decode failed; continuing without background");
                events.push(Event::Notice(format!("Image failed to load: {reason}")));
            }
            image.load = load;
            state.recompute_transform(&mut events);
            events.push(Event::RenderNeeded);
        }
        Action::SetContainer(size) => {
            state.container = size;
            state.recompute_transform(&mut events);
            events.push(Event::RenderNeeded);
        }
    }
    (state, events)
}

// =============================================================
// Pointer gestures
// =============================================================

fn pointer_down(state: &mut AuthoringState, pt: Point, events: &mut Vec<Event>) {
    if !state.input.is_idle() {
        return;
    }
    let hit = snap::region_at(pt, state.doc.regions()).map(|r| r.id);
    match state.ui.tool {
        Tool::Create => {
            if let Some(id) = hit {
                state.select(Some(id), events);
            } else {
                state.input = InputState::DrawingRegion { anchor: pt, current: pt };
            }
        }
        Tool::Edit => {
            let on_handle = state
                .ui
                .selected
                .and_then(|id| state.doc.region(id))
                .filter(|r| snap::resize_handle_hit(pt, &r.rect(), HANDLE_RADIUS_PX))
                .map(|r| (r.id, r.rect().top_left()));
            if let Some((id, origin)) = on_handle {
                state.input = InputState::ResizingRegion { id, origin };
            } else if let Some(id) = hit {
                state.select(Some(id), events);
                state.input = InputState::MovingRegion { id, last: pt };
            } else {
                state.select(None, events);
            }
        }
        Tool::Arrow => {
            if hit.is_none() {
                state.input = InputState::DrawingArrow { start: pt, current: pt };
            }
        }
    }
    events.push(Event::RenderNeeded);
}

fn pointer_move(state: &mut AuthoringState, pt: Point, events: &mut Vec<Event>) {
    let min = state.config.min_region_size;
    match &mut state.input {
        InputState::Idle => return,
        InputState::DrawingRegion { current, .. } | InputState::DrawingArrow { current, .. } => {
            *current = pt;
        }
        InputState::MovingRegion { id, last } => {
            let (dx, dy) = (pt.x - last.x, pt.y - last.y);
            *last = pt;
            if let Some(region) = state.doc.region_mut(*id) {
                region.set_rect(region.rect().translate(dx, dy));
                events.push(Event::RegionUpdated(region.clone()));
            }
        }
        InputState::ResizingRegion { id, origin } => {
            let rect = Rect::new(origin.x, origin.y, (pt.x - origin.x).max(min), (pt.y - origin.y).max(min));
            if let Some(region) = state.doc.region_mut(*id) {
                *region = Region::from_rect(*id, rect);
                events.push(Event::RegionUpdated(region.clone()));
            }
        }
    }
    events.push(Event::RenderNeeded);
}

fn pointer_up(state: &mut AuthoringState, pt: Point, events: &mut Vec<Event>) {
    match std::mem::take(&mut state.input) {
        InputState::Idle => return,
        InputState::DrawingRegion { anchor, .. } => commit_region(state, anchor, pt, events),
        InputState::DrawingArrow { start, .. } => commit_arrow(state, start, pt, events),
        InputState::MovingRegion { .. } | InputState::ResizingRegion { .. } => {}
    }
    events.push(Event::RenderNeeded);
}

fn commit_region(state: &mut AuthoringState, anchor: Point, end: Point, events: &mut Vec<Event>) {
    let n = state.doc.region_count() + 1;
    let raw = state.alloc_id();
    let region = Region::from_rect(RegionId(raw), Rect::from_corners(anchor, end, state.config.min_region_size));
    let label = Label { id: LabelId(raw), region_id: Some(region.id), text: format!("{DEFAULT_WORD_PREFIX} {n}") };
    debug!(region = %region.id, x = region.x, y = region.y, w = region.width, h = region.height, "region committed");

    state.doc.insert_region(region.clone());
    state.doc.insert_label(label.clone());
    events.push(Event::RegionCreated(region));
    events.push(Event::LabelCreated(label));
}

fn commit_arrow(state: &mut AuthoringState, start: Point, end: Point, events: &mut Vec<Event>) {
    let radius = state.config.snap_radius;
    let Some(start_region) = snap::nearest_region(start, state.doc.regions(), radius) else {
        debug!(x = start.x, y = start.y, "arrow rejected: no region near start");
        events.push(Event::Warning(ARROW_NEEDS_BLOCK_WARNING.to_owned()));
        return;
    };
    let start_anchor = (start_region.id, start_region.center());
    let end_anchor = snap::nearest_region(end, state.doc.regions(), radius).map(|r| (r.id, r.center()));

    let connector = Connector {
        id: ConnectorId(state.alloc_id()),
        start: start_anchor.1,
        end: end_anchor.map_or(end, |(_, center)| center),
        start_region: Some(start_anchor.0),
        end_region: end_anchor.map(|(id, _)| id),
        style: state.arrow_style.clone(),
    };
    debug!(connector = %connector.id, start = %start_anchor.0, "connector committed");
    state.doc.insert_connector(connector.clone());
    events.push(Event::ConnectorCreated(connector));
}

fn delete_region(state: &mut AuthoringState, id: RegionId, events: &mut Vec<Event>) {
    let cascade = state.doc.delete_region(id);
    let Some(region) = cascade.region else {
        return;
    };
    info!(
        region = %id,
        labels = cascade.labels.len(),
        connectors = cascade.connectors.len(),
        "region deleted"
    );
    if matches!(state.input, InputState::MovingRegion { id: active, .. } | InputState::ResizingRegion { id: active, .. } if active == id)
    {
        state.input = InputState::Idle;
    }
    if state.ui.selected == Some(id) {
        state.select(None, events);
    }
    events.push(Event::RegionDeleted { region, labels: cascade.labels, connectors: cascade.connectors });
    events.push(Event::RenderNeeded);
}

// =============================================================
// Host wrapper
// =============================================================

/// Owns an [`AuthoringState`] and applies actions in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct AuthoringCore {
    pub state: AuthoringState,
}

impl AuthoringCore {
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self { state: AuthoringState::new(config) }
    }

    /// Apply one action atomically and return the resulting events.
    pub fn dispatch(&mut self, action: Action) -> Vec<Event> {
        let (next, events) = reduce(std::mem::take(&mut self.state), action);
        self.state = next;
        events
    }

    // --- Queries ---

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.state.ui.tool
    }

    #[must_use]
    pub fn selection(&self) -> Option<RegionId> {
        self.state.ui.selected
    }

    #[must_use]
    pub fn preview(&self) -> Option<Preview> {
        self.state.preview()
    }

    #[must_use]
    pub fn doc(&self) -> &DocStore {
        &self.state.doc
    }

    #[must_use]
    pub fn transform(&self) -> Option<ImageTransform> {
        self.state.transform
    }
}
