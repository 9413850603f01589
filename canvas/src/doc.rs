//! Document model: regions, labels, connectors, and the in-memory store.
//!
//! Regions are the rectangles an author draws over the picture. Each region is
//! normally paired with one label whose text is the word the student must drop
//! on it. Connectors are illustrative arrows between points, optionally
//! anchored to region centers.
//!
//! Cross-references are plain ids, never borrows. `DocStore` keeps one
//! insertion-ordered id map per collection, so iteration follows creation
//! order and a cascade delete is a couple of map removals.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ARROW_COLOR, DEFAULT_ARROW_THICKNESS, MIN_REGION_SIZE};
use crate::geom::{Point, Rect};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a region. Persisted as the block's `question_id`.
    RegionId
);
entity_id!(
    /// Identifier of a label.
    LabelId
);
entity_id!(
    /// Identifier of a connector.
    ConnectorId
);

/// A rectangular target area bound to one expected word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// Build a region from a rect, clamping both dimensions to the minimum size.
    #[must_use]
    pub fn from_rect(id: RegionId, rect: Rect) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            width: rect.width.max(MIN_REGION_SIZE),
            height: rect.height.max(MIN_REGION_SIZE),
        }
    }

    /// Move and resize to `rect` as given, without the minimum-size clamp.
    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        self.rect().center()
    }
}

/// A draggable text unit, optionally bound to the region it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub region_id: Option<RegionId>,
    pub text: String,
}

/// Stroke style of a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStyle {
    pub color: String,
    pub thickness: f64,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self { color: DEFAULT_ARROW_COLOR.to_owned(), thickness: DEFAULT_ARROW_THICKNESS }
    }
}

/// A directed segment from `start` to `end`. Illustrative only; never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub start: Point,
    pub end: Point,
    pub start_region: Option<RegionId>,
    pub end_region: Option<RegionId>,
    pub style: ConnectorStyle,
}

impl Connector {
    /// Whether either endpoint is anchored to `region`.
    #[must_use]
    pub fn references(&self, region: RegionId) -> bool {
        self.start_region == Some(region) || self.end_region == Some(region)
    }
}

/// Everything removed by a single [`DocStore::delete_region`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    pub region: Option<Region>,
    pub labels: Vec<Label>,
    pub connectors: Vec<Connector>,
}

/// In-memory store of the authored entities.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    regions: IndexMap<RegionId, Region>,
    labels: IndexMap<LabelId, Label>,
    connectors: IndexMap<ConnectorId, Connector>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Regions ---

    /// Insert or replace a region. Replacing keeps its original position in
    /// creation order.
    pub fn insert_region(&mut self, region: Region) {
        self.regions.insert(region.id, region);
    }

    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    /// Regions in creation order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Remove a region together with its bound labels and every connector
    /// anchored to it. Unrelated entities are untouched.
    pub fn delete_region(&mut self, id: RegionId) -> Cascade {
        let Some(region) = self.regions.shift_remove(&id) else {
            return Cascade::default();
        };

        let label_ids: Vec<LabelId> = self
            .labels
            .values()
            .filter(|l| l.region_id == Some(id))
            .map(|l| l.id)
            .collect();
        let labels = label_ids
            .iter()
            .filter_map(|lid| self.labels.shift_remove(lid))
            .collect();

        let connector_ids: Vec<ConnectorId> = self
            .connectors
            .values()
            .filter(|c| c.references(id))
            .map(|c| c.id)
            .collect();
        let connectors = connector_ids
            .iter()
            .filter_map(|cid| self.connectors.shift_remove(cid))
            .collect();

        Cascade { region: Some(region), labels, connectors }
    }

    // --- Labels ---

    pub fn insert_label(&mut self, label: Label) {
        self.labels.insert(label.id, label);
    }

    #[must_use]
    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    /// Labels in creation order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    /// The first label bound to `region`, if any.
    #[must_use]
    pub fn label_for_region(&self, region: RegionId) -> Option<&Label> {
        self.labels.values().find(|l| l.region_id == Some(region))
    }

    /// Replace a label's text. Returns false if the label doesn't exist.
    pub fn rename_label(&mut self, id: LabelId, text: String) -> bool {
        let Some(label) = self.labels.get_mut(&id) else {
            return false;
        };
        label.text = text;
        true
    }

    // --- Connectors ---

    pub fn insert_connector(&mut self, connector: Connector) {
        self.connectors.insert(connector.id, connector);
    }

    /// Connectors in creation order.
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    pub fn remove_connector(&mut self, id: ConnectorId) -> Option<Connector> {
        self.connectors.shift_remove(&id)
    }

    // --- Bulk ---

    /// Remove every region, label and connector.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.labels.clear();
        self.connectors.clear();
    }
}
