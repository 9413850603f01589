//! Hit-testing and snapping against regions.
//!
//! All functions take regions as an iterator so they work equally on the
//! authoring store (display space) and on runtime rects re-derived from the
//! current transform. Iteration order decides ties: the first candidate wins.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::doc::Region;
use crate::geom::{Point, Rect};

/// The region whose center is closest to `point`, if that distance is at most
/// `radius`. Equidistant regions resolve to the earliest one in iteration order.
#[must_use]
pub fn nearest_region<'a, I>(point: Point, regions: I, radius: f64) -> Option<&'a Region>
where
    I: IntoIterator<Item = &'a Region>,
{
    let mut best: Option<(&Region, f64)> = None;
    for region in regions {
        let dist = point.distance_to(region.center());
        if dist > radius {
            continue;
        }
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((region, dist));
        }
    }
    best.map(|(region, _)| region)
}

/// The first region containing `point` (edges inclusive).
#[must_use]
pub fn region_at<'a, I>(point: Point, regions: I) -> Option<&'a Region>
where
    I: IntoIterator<Item = &'a Region>,
{
    regions.into_iter().find(|r| r.rect().contains(point))
}

/// The first `(key, rect)` pair whose rect strictly overlaps `target`.
#[must_use]
pub fn first_overlap<K, I>(target: &Rect, candidates: I) -> Option<K>
where
    I: IntoIterator<Item = (K, Rect)>,
{
    candidates
        .into_iter()
        .find(|(_, rect)| rect.intersects(target))
        .map(|(key, _)| key)
}

/// Whether `point` is on the bottom-right resize handle of `rect`.
#[must_use]
pub fn resize_handle_hit(point: Point, rect: &Rect, radius: f64) -> bool {
    point.distance_to(rect.bottom_right()) <= radius
}
