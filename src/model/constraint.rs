//! Shape constraints and the move resolver.
//!
//! Rectangle and ellipse regions keep four points in rotational order, so for
//! a moved index `i` the neighbours are `(i + 3) % 4` and `(i + 1) % 4` and the
//! opposite point is `(i + 2) % 4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// How the points of a region may move relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    /// Free polygon: every point moves on its own
    #[default]
    Polygon,
    /// Axis-aligned rectangle
    Rectangle,
    /// Ellipse described by the four extremes of its bounding box
    Ellipse,
}

impl Constraint {
    /// Name used in the `constraint` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::Polygon => "polygon",
            Constraint::Rectangle => "rectangle",
            Constraint::Ellipse => "ellipse",
        }
    }

    /// Whether the region has a fixed set of four points.
    pub fn is_fixed_cardinality(&self) -> bool {
        !matches!(self, Constraint::Polygon)
    }

    /// Get all constraints.
    pub fn all() -> &'static [Constraint] {
        &[Constraint::Polygon, Constraint::Rectangle, Constraint::Ellipse]
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Constraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "polygon" => Ok(Constraint::Polygon),
            "rectangle" => Ok(Constraint::Rectangle),
            "ellipse" => Ok(Constraint::Ellipse),
            other => Err(format!("unknown constraint '{}'", other)),
        }
    }
}

/// Resolve a drag of point `moved` to `to` under a constraint.
///
/// Returns the new four points; the input is left untouched. `moved` is taken
/// modulo 4.
pub fn resolve_move(
    constraint: Constraint,
    points: [Point; 4],
    moved: usize,
    to: Point,
) -> [Point; 4] {
    let moved = moved % 4;
    let previous = (moved + 3) % 4;
    let next = (moved + 1) % 4;
    let opposite = (moved + 2) % 4;
    let mut out = points;

    match constraint {
        Constraint::Polygon => {
            out[moved] = to;
        }
        Constraint::Rectangle => {
            if moved % 2 == 0 {
                out[previous].x = to.x;
                out[next].y = to.y;
            } else {
                out[previous].y = to.y;
                out[next].x = to.x;
            }
            out[moved] = to;
        }
        Constraint::Ellipse => {
            if moved % 2 == 0 {
                // Top/bottom extreme: slides vertically only
                let middle = (points[opposite].y - to.y) / 2.0 + to.y;
                out[moved].y = to.y;
                out[previous].y = middle;
                out[next].y = middle;
            } else {
                // Left/right extreme: slides horizontally only
                let middle = (points[opposite].x - to.x) / 2.0 + to.x;
                out[moved].x = to.x;
                out[previous].x = middle;
                out[next].x = middle;
            }
        }
    }

    out
}

/// Starting corners of a new rectangle region, in view space.
pub fn default_rectangle() -> [Point; 4] {
    [
        Point::new(100.0, 30.0),
        Point::new(300.0, 30.0),
        Point::new(300.0, 150.0),
        Point::new(100.0, 150.0),
    ]
}

/// Starting extremes of a new ellipse region (top, right, bottom, left), in
/// view space.
pub fn default_ellipse() -> [Point; 4] {
    [
        Point::new(300.0, 50.0),
        Point::new(400.0, 110.0),
        Point::new(300.0, 170.0),
        Point::new(200.0, 110.0),
    ]
}
