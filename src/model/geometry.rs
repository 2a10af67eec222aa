//! Axis-aligned box geometry and hit testing.
//!
//! Boxes live in image coordinates in corner form `[x1, y1, x2, y2]` with
//! `x1 <= x2` and `y1 <= y2`. Every constructor canonicalizes, so a `BBox`
//! built from arbitrary corners (a drag in any direction, a detector reply,
//! a recovery entry) always satisfies the ordering.

use serde::{Deserialize, Serialize};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned box in canonical corner form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl BBox {
    /// Build a box from two arbitrary corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x1: p1.x.min(p2.x),
            y1: p1.y.min(p2.y),
            x2: p1.x.max(p2.x),
            y2: p1.y.max(p2.y),
        }
    }

    /// Build a box from COCO `[x, y, width, height]`.
    ///
    /// Negative extents are folded back into canonical form.
    pub fn from_xywh(xywh: [f32; 4]) -> Self {
        let [x, y, w, h] = xywh;
        Self::from_corners(Point::new(x, y), Point::new(x + w, y + h))
    }

    /// Corner form `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// COCO form `[x, y, width, height]`.
    pub fn to_xywh(&self) -> [f32; 4] {
        [self.x1, self.y1, self.width(), self.height()]
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Zero-area boxes may exist mid-drag but are never committed.
    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x1 && point.x <= self.x2 && point.y >= self.y1 && point.y <= self.y2
    }
}

impl From<[f32; 4]> for BBox {
    fn from(corners: [f32; 4]) -> Self {
        normalize_box(corners)
    }
}

impl From<BBox> for [f32; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.corners()
    }
}

/// Canonicalize `[x1, y1, x2, y2]` given in any corner order.
pub fn normalize_box(corners: [f32; 4]) -> BBox {
    let [x1, y1, x2, y2] = corners;
    BBox::from_corners(Point::new(x1, y1), Point::new(x2, y2))
}

/// Whether a press at `start` released at `end` counts as a drag.
pub fn is_drag(start: Point, end: Point, threshold: f32) -> bool {
    start.distance_to(&end) > threshold
}

/// Index of the smallest box containing `point`.
///
/// Among boxes of equal area the first in iteration order wins, which lets
/// small boxes nested inside larger ones stay selectable.
pub fn hit_test<'a>(point: &Point, boxes: impl IntoIterator<Item = &'a BBox>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, bbox) in boxes.into_iter().enumerate() {
        if !bbox.contains(point) {
            continue;
        }
        let area = bbox.area();
        if best.is_none_or(|(_, best_area)| area < best_area) {
            best = Some((index, area));
        }
    }
    best.map(|(index, _)| index)
}
