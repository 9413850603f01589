//! Student-side placement runtime.
//!
//! DESIGN
//! ======
//! The runtime rehydrates regions in original-image pixels from a persisted
//! test and keeps them there. Every display rect (regions, the unplaced label
//! flow, placed labels, connectors) is derived from the current transform on
//! request, so a viewport change never leaves stale coordinates behind.
//!
//! The only mutable session state is the placement map (region → label) and
//! the drag in progress.
//!
//! OCCUPIED REGIONS
//! ================
//! Dropping a label on a region that already holds another label follows
//! [`OccupiedPolicy`]: `Evict` (default) binds the new label and sends the
//! previous occupant back to the flow; `Reject` leaves the map untouched.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MatchConfig;
use crate::doc::{ConnectorStyle, Label, LabelId, Region, RegionId};
use crate::geom::{Point, Rect, Size};
use crate::persist::{PersistedArrow, PersistedTest};
use crate::scoring::{self, ScoreReport};
use crate::snap;
use crate::transform::{ImageLoad, ImageSource, ImageTransform};

/// Region → label currently occupying it.
pub type PlacementMap = BTreeMap<RegionId, LabelId>;

/// What happens when a label is dropped on an occupied region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupiedPolicy {
    /// Bind the dropped label; the previous occupant returns to the flow.
    #[default]
    Evict,
    /// Keep the previous occupant; the dropped label goes back where it was.
    Reject,
}

/// Result of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    Placed { region: RegionId, evicted: Option<LabelId> },
    Rejected { region: RegionId },
    /// The label overlapped no region and is back in the unplaced flow.
    Unplaced,
}

/// A label as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelView {
    pub id: LabelId,
    pub text: String,
    pub rect: Rect,
    pub placed_in: Option<RegionId>,
    pub dragging: bool,
}

impl LabelView {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.placed_in.is_some()
    }
}

/// A persisted connector projected into display space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorSegment {
    pub start: Point,
    pub end: Point,
    pub style: ConnectorStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    label: LabelId,
    /// Pointer offset from the label's top-left corner at grab time.
    grab: Point,
    rect: Rect,
}

pub struct PlacementRuntime {
    image: ImageSource,
    /// Regions in original-image pixels, in persisted order.
    regions: Vec<Region>,
    expected: BTreeMap<RegionId, String>,
    /// Labels in unplaced-flow order.
    labels: Vec<Label>,
    arrows: Vec<PersistedArrow>,
    recorded_size: Option<Size>,
    container: Size,
    transform: Option<ImageTransform>,
    placements: PlacementMap,
    drag: Option<DragState>,
    config: MatchConfig,
}

impl PlacementRuntime {
    /// Rehydrate a persisted test. Each block yields one region and one label
    /// sharing its `question_id`. A repeated `question_id` keeps only its
    /// first block.
    #[must_use]
    pub fn new(test: &PersistedTest, config: MatchConfig) -> Self {
        let mut regions = Vec::with_capacity(test.blocks.len());
        let mut expected = BTreeMap::new();
        let mut labels = Vec::with_capacity(test.blocks.len());
        for block in &test.blocks {
            if expected.contains_key(&block.question_id) {
                warn!(question_id = %block.question_id, word = %block.word, "duplicate question id; block dropped");
                continue;
            }
            let rect = block.block_coordinates;
            regions.push(Region { id: block.question_id, x: rect.x, y: rect.y, width: rect.width, height: rect.height });
            expected.insert(block.question_id, block.word.clone());
            labels.push(Label { id: LabelId(block.question_id.0), region_id: None, text: block.word.clone() });
        }
        Self {
            image: ImageSource::pending(test.image_url.clone()),
            regions,
            expected,
            labels,
            arrows: test.all_arrows().into_iter().cloned().collect(),
            recorded_size: test.recorded_image_size(),
            container: Size::default(),
            transform: None,
            placements: PlacementMap::new(),
            drag: None,
            config,
        }
    }

    // --- Viewport ---

    /// Resolve the background image decode.
    pub fn set_image(&mut self, load: ImageLoad) {
        if let ImageLoad::Failed(reason) = &load {
            warn!(url = %self.image.url, %reason, "image decode failed; continuing without background");
        }
        self.image.load = load;
        self.recompute_transform();
    }

    /// Update the container size (responsive resize).
    pub fn set_container(&mut self, size: Size) {
        self.container = size;
        self.recompute_transform();
    }

    fn recompute_transform(&mut self) {
        let size = self
            .image
            .load
            .size()
            .or(self.recorded_size)
            .or_else(|| self.content_extent());
        self.transform = size.and_then(|s| ImageTransform::compute(s, self.container));
    }

    /// Smallest image size that contains every region; used when the real
    /// size is unknown so the layout still fits the viewport.
    fn content_extent(&self) -> Option<Size> {
        let extent = self.regions.iter().fold(Size::default(), |acc, r| {
            Size::new(acc.width.max(r.x + r.width), acc.height.max(r.y + r.height))
        });
        Some(extent).filter(|s| s.is_positive())
    }

    #[must_use]
    pub fn transform(&self) -> Option<ImageTransform> {
        self.transform
    }

    #[must_use]
    pub fn image(&self) -> &ImageSource {
        &self.image
    }

    // --- Derived geometry ---

    /// Every region's rect in current display space, in persisted order.
    #[must_use]
    pub fn region_rects(&self) -> Vec<(RegionId, Rect)> {
        let Some(t) = self.transform else {
            return Vec::new();
        };
        self.regions
            .iter()
            .map(|r| (r.id, t.rect_to_display(&r.rect())))
            .collect()
    }

    fn region_rect(&self, id: RegionId) -> Option<Rect> {
        let t = self.transform?;
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| t.rect_to_display(&r.rect()))
    }

    fn label_size(&self, label: &Label) -> Size {
        let layout = &self.config.label_layout;
        Size::new(layout.width_for(&label.text), layout.height)
    }

    /// Flow layout of every label not bound to a region.
    #[must_use]
    pub fn unplaced_layout(&self) -> Vec<(LabelId, Rect)> {
        let Some(t) = self.transform else {
            return Vec::new();
        };
        let layout = &self.config.label_layout;
        let image = t.display_rect();
        let limit = (self.container.width - layout.margin).min(image.right());
        let start_x = image.x.max(layout.margin);

        let mut x = start_x;
        let mut y = image.bottom() + layout.margin;
        let mut out = Vec::new();
        for label in self.labels.iter().filter(|l| !self.is_placed(l.id)) {
            let size = self.label_size(label);
            if x > start_x && x + size.width > limit {
                x = start_x;
                y += layout.row_height;
            }
            out.push((label.id, Rect::new(x, y, size.width, size.height)));
            x += size.width + layout.margin;
        }
        out
    }

    /// Every label with its current display rect.
    #[must_use]
    pub fn label_views(&self) -> Vec<LabelView> {
        let flow: BTreeMap<LabelId, Rect> = self.unplaced_layout().into_iter().collect();
        let placed_in: BTreeMap<LabelId, RegionId> = self.placements.iter().map(|(r, l)| (*l, *r)).collect();

        self.labels
            .iter()
            .filter_map(|label| {
                let region = placed_in.get(&label.id).copied();
                let dragging = self.drag.filter(|d| d.label == label.id);
                let rect = match (dragging, region) {
                    (Some(drag), _) => Some(drag.rect),
                    (None, Some(region)) => self
                        .region_rect(region)
                        .map(|r| r.center_box(self.label_size(label))),
                    (None, None) => flow.get(&label.id).copied(),
                }?;
                Some(LabelView {
                    id: label.id,
                    text: label.text.clone(),
                    rect,
                    placed_in: region,
                    dragging: dragging.is_some(),
                })
            })
            .collect()
    }

    /// Persisted connectors redrawn for the current viewport.
    #[must_use]
    pub fn connector_segments(&self) -> Vec<ConnectorSegment> {
        let Some(t) = self.transform else {
            return Vec::new();
        };
        self.arrows
            .iter()
            .map(|arrow| {
                let (start, end) = arrow.endpoints(t.original_size());
                ConnectorSegment { start: t.to_display(start), end: t.to_display(end), style: arrow.style.clone() }
            })
            .collect()
    }

    // --- Drag and drop ---

    /// Grab `label` at `pointer`. Replaces any drag in progress.
    pub fn begin_drag(&mut self, label: LabelId, pointer: Point) -> bool {
        let Some(rect) = self
            .label_views()
            .into_iter()
            .find(|v| v.id == label)
            .map(|v| v.rect)
        else {
            return false;
        };
        self.drag = Some(DragState { label, grab: Point::new(pointer.x - rect.x, pointer.y - rect.y), rect });
        true
    }

    /// Move the dragged label with the pointer.
    pub fn drag_to(&mut self, pointer: Point) {
        if let Some(drag) = self.drag.as_mut() {
            drag.rect.x = pointer.x - drag.grab.x;
            drag.rect.y = pointer.y - drag.grab.y;
        }
    }

    /// Release the drag at `pointer` and resolve the drop.
    pub fn end_drag(&mut self, pointer: Point) -> Option<DropOutcome> {
        self.drag_to(pointer);
        let drag = self.drag.take()?;
        Some(self.drop_label(drag.label, drag.rect))
    }

    /// Abandon the drag; the label returns to where it was.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Resolve dropping `label` with its box at `rect` (display space).
    ///
    /// The first region, in persisted order, whose display rect overlaps
    /// `rect` receives the label.
    pub fn drop_label(&mut self, label: LabelId, rect: Rect) -> DropOutcome {
        if !self.labels.iter().any(|l| l.id == label) {
            return DropOutcome::Unplaced;
        }
        let Some(region) = snap::first_overlap(&rect, self.region_rects()) else {
            self.unbind(label);
            debug!(%label, "label dropped outside every region");
            return DropOutcome::Unplaced;
        };
        self.place(label, region)
    }

    /// Bind `label` to `region` directly, as a drop onto it would.
    ///
    /// Unknown ids leave the map untouched and report `Unplaced`.
    pub fn place(&mut self, label: LabelId, region: RegionId) -> DropOutcome {
        if !self.labels.iter().any(|l| l.id == label) || !self.regions.iter().any(|r| r.id == region) {
            warn!(%label, %region, "placement references an unknown label or region");
            return DropOutcome::Unplaced;
        }
        let outcome = match self.placements.get(&region).copied() {
            Some(occupant) if occupant == label => DropOutcome::Placed { region, evicted: None },
            Some(_) if self.config.occupied_policy == OccupiedPolicy::Reject => DropOutcome::Rejected { region },
            occupant => {
                self.unbind(label);
                self.placements.insert(region, label);
                DropOutcome::Placed { region, evicted: occupant }
            }
        };
        debug!(%label, %region, ?outcome, "label placed");
        outcome
    }

    fn unbind(&mut self, label: LabelId) {
        self.placements.retain(|_, l| *l != label);
    }

    // --- Session state ---

    #[must_use]
    pub fn is_placed(&self, label: LabelId) -> bool {
        self.placements.values().any(|l| *l == label)
    }

    #[must_use]
    pub fn placements(&self) -> &PlacementMap {
        &self.placements
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Regions in original-image pixels.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Percentage of labels placed: `mapped regions / label count * 100`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = self.placements.len() as f64 / self.labels.len() as f64 * 100.0;
        pct
    }

    /// Submission is enabled only once every label is placed.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.labels.is_empty() && self.placements.len() >= self.labels.len()
    }

    /// Clear every placement and any drag.
    pub fn reset(&mut self) {
        self.placements.clear();
        self.drag = None;
    }

    /// Permute the unplaced-flow order.
    pub fn shuffle_labels<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.labels.shuffle(rng);
    }

    /// Score the current placements.
    #[must_use]
    pub fn score(&self) -> ScoreReport {
        let expected = self
            .regions
            .iter()
            .filter_map(|r| self.expected.get(&r.id).map(|w| (r.id, w.as_str())));
        scoring::score(expected, &self.labels, &self.placements, self.config.pass_percentage)
    }
}
