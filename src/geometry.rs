//! Geometry primitives shared by the region model and the hit tests.
//!
//! Coordinates are `f32` and carry no unit: a point is either in image space
//! (unscaled photo pixels) or in view space (image space times the display
//! scale). Callers keep track of which one they hold.

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
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
        distance(*self, *other)
    }

    /// Midpoint between this point and another.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// This point shifted by a delta.
    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// This point with both coordinates multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the box
    pub width: f32,
    /// Height of the box
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Get the bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Smallest box covering the centers of a set of point markers, grown by the
/// marker half-size on every side so the markers themselves fit.
///
/// Returns `None` for an empty set.
pub fn bounding_box<'a, I>(points: I, marker_half_size: f32) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a Point>,
{
    let mut iter = points.into_iter().peekable();
    iter.peek()?;

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for p in iter {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(BoundingBox::new(
        min_x - marker_half_size,
        min_y - marker_half_size,
        (max_x - min_x) + 2.0 * marker_half_size,
        (max_y - min_y) + 2.0 * marker_half_size,
    ))
}

/// Even-odd ray casting test for an ordered polygon.
///
/// An edge `(i, j)` (with `j` the previous vertex, wrapping) counts when it
/// straddles the test y-coordinate, half-open on the lower end, and at least
/// one of its endpoints lies at or left of the test x. Its intersection with
/// the horizontal through the test point then toggles the parity when it lies
/// strictly left of the test x.
///
/// Polygons with fewer than 3 points never contain anything. Self-intersecting
/// polygons give the even-odd answer, which is rarely what a user expects.
pub fn point_in_polygon(points: &[Point], test: Point) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut odd_nodes = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = points[i];
        let pj = points[j];
        let straddles = (pi.y < test.y && pj.y >= test.y) || (pj.y < test.y && pi.y >= test.y);
        if straddles && (pi.x <= test.x || pj.x <= test.x) {
            let x_cross = pi.x + (test.y - pi.y) / (pj.y - pi.y) * (pj.x - pi.x);
            if x_cross < test.x {
                odd_nodes = !odd_nodes;
            }
        }
        j = i;
    }

    odd_nodes
}

/// Scale that fits an image into the available area without cropping.
///
/// Degenerate image sizes yield a scale of 1.0.
pub fn fit_scale(image_size: (f32, f32), available: (f32, f32)) -> f32 {
    let (iw, ih) = image_size;
    let (aw, ah) = available;
    if iw <= 0.0 || ih <= 0.0 {
        return 1.0;
    }
    (aw / iw).min(ah / ih)
}

// ============================================================================
// Tests
// ============================================================================
