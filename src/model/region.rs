//! Region ("detail") data model.
//!
//! A region is an ordered list of points plus a shape constraint. Indices are
//! always contiguous (0..N-1): inserting or removing a point shifts every later
//! index by one. Because polygon points can be inserted anywhere, the order in
//! which points were added diverges from index order, so an insertion log is
//! kept alongside for undo.

use crate::constants::{CONSTRAINED_POINT_COUNT, DEFAULT_MAX_DRAG_DISTANCE, MIN_REGION_POINTS};
use crate::geometry::{self, BoundingBox, Point};

use super::constraint::{self, Constraint, resolve_move};
use super::error::EditError;

/// Unique identifier of a region within its document.
pub type RegionTag = u32;

/// Limits applied to point drags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragLimits {
    /// A single update moving a point at least this far is ignored as noise
    pub max_drag_distance: f32,
}

impl Default for DragLimits {
    fn default() -> Self {
        Self {
            max_drag_distance: DEFAULT_MAX_DRAG_DISTANCE,
        }
    }
}

/// Result of an accepted `move_point` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The point (and its constrained neighbours) moved
    Moved,
    /// The jump exceeded the drag limit; nothing changed
    Rejected,
}

/// Editable metadata of a region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionInfo {
    pub title: String,
    pub description: String,
    /// Zoom into the region during playback
    pub zoom: bool,
    /// Points can no longer be moved or deleted
    pub locked: bool,
}

/// Shape to draw for a region.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    /// Closed polygon through the points in index order
    Polygon(Vec<Point>),
    /// Axis-aligned ellipse inscribed in the points' bounding box
    Ellipse {
        center: Point,
        radius_x: f32,
        radius_y: f32,
    },
}

/// A user-drawn annotated area on a photo.
#[derive(Debug, Clone)]
pub struct Region {
    tag: RegionTag,
    constraint: Constraint,
    points: Vec<Point>,
    /// Indices in the order the points were added (most recent last)
    insertion_log: Vec<usize>,
    pub title: String,
    pub description: String,
    pub zoom: bool,
    pub locked: bool,
}

/// Equality covers the shape and metadata; the insertion log is editing
/// history and is not compared.
impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.constraint == other.constraint
            && self.points == other.points
            && self.title == other.title
            && self.description == other.description
            && self.zoom == other.zoom
            && self.locked == other.locked
    }
}

impl Region {
    /// Create an empty region. Only polygons start empty; use
    /// [`Region::rectangle`] and [`Region::ellipse`] for constrained shapes.
    pub fn new(tag: RegionTag, constraint: Constraint) -> Self {
        Self {
            tag,
            constraint,
            points: Vec::new(),
            insertion_log: Vec::new(),
            title: String::new(),
            description: String::new(),
            zoom: false,
            locked: false,
        }
    }

    /// Create a region from existing points, e.g. when loading a document.
    ///
    /// Rectangle and ellipse regions must receive exactly four points.
    pub fn with_points(
        tag: RegionTag,
        constraint: Constraint,
        points: Vec<Point>,
    ) -> Result<Self, EditError> {
        if constraint.is_fixed_cardinality() && points.len() != CONSTRAINED_POINT_COUNT {
            return Err(EditError::invalid(format!(
                "{} region {} needs {} points, got {}",
                constraint,
                tag,
                CONSTRAINED_POINT_COUNT,
                points.len()
            )));
        }
        let mut region = Self::new(tag, constraint);
        region.insertion_log = (0..points.len()).collect();
        region.points = points;
        Ok(region)
    }

    /// New rectangle region at the default starting position (view space).
    pub fn rectangle(tag: RegionTag) -> Self {
        let mut region = Self::new(tag, Constraint::Rectangle);
        region.points = constraint::default_rectangle().to_vec();
        region.insertion_log = (0..CONSTRAINED_POINT_COUNT).collect();
        region
    }

    /// New ellipse region at the default starting position (view space).
    pub fn ellipse(tag: RegionTag) -> Self {
        let mut region = Self::new(tag, Constraint::Ellipse);
        region.points = constraint::default_ellipse().to_vec();
        region.insertion_log = (0..CONSTRAINED_POINT_COUNT).collect();
        region
    }

    pub fn tag(&self) -> RegionTag {
        self.tag
    }

    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    /// Points in index order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the region has enough points to be drawn and persisted.
    pub fn is_valid(&self) -> bool {
        self.points.len() >= MIN_REGION_POINTS
    }

    /// Snapshot of the editable metadata.
    pub fn info(&self) -> RegionInfo {
        RegionInfo {
            title: self.title.clone(),
            description: self.description.clone(),
            zoom: self.zoom,
            locked: self.locked,
        }
    }

    /// Replace the editable metadata. Allowed on locked regions so they can
    /// be unlocked again.
    pub fn apply_info(&mut self, info: RegionInfo) {
        self.title = info.title;
        self.description = info.description;
        self.zoom = info.zoom;
        self.locked = info.locked;
    }

    fn ensure_unlocked(&self) -> Result<(), EditError> {
        if self.locked {
            return Err(EditError::Locked { tag: self.tag });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index >= self.points.len() {
            return Err(EditError::invalid(format!(
                "point {} out of range for region {} ({} points)",
                index,
                self.tag,
                self.points.len()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Point operations
    // ========================================================================

    /// Insert a point at `at`, or append it when `at` is `None`.
    ///
    /// Returns the index the point landed at.
    pub fn add_point(&mut self, location: Point, at: Option<usize>) -> Result<usize, EditError> {
        self.ensure_unlocked()?;
        if self.constraint.is_fixed_cardinality() {
            return Err(EditError::invalid(format!(
                "cannot add points to {} region {}",
                self.constraint, self.tag
            )));
        }
        if !location.is_finite() {
            return Err(EditError::invalid(format!(
                "cannot add non-finite point to region {}",
                self.tag
            )));
        }
        let index = at.unwrap_or(self.points.len());
        if index > self.points.len() {
            return Err(EditError::invalid(format!(
                "insert position {} out of range for region {} ({} points)",
                index,
                self.tag,
                self.points.len()
            )));
        }

        self.insert_at(index, location);
        Ok(index)
    }

    /// Move a point, letting the constraint adjust its neighbours.
    pub fn move_point(
        &mut self,
        index: usize,
        to: Point,
        limits: &DragLimits,
    ) -> Result<MoveOutcome, EditError> {
        self.ensure_unlocked()?;
        self.check_index(index)?;

        let from = self.points[index];
        if !to.is_finite() || geometry::distance(from, to) >= limits.max_drag_distance {
            log::debug!(
                "Region {}: ignored jump of point {} from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                self.tag,
                index,
                from.x,
                from.y,
                to.x,
                to.y
            );
            return Ok(MoveOutcome::Rejected);
        }

        match <[Point; 4]>::try_from(self.points.as_slice()) {
            Ok(corners) if self.constraint.is_fixed_cardinality() => {
                let resolved = resolve_move(self.constraint, corners, index, to);
                self.points.copy_from_slice(&resolved);
            }
            _ => self.points[index] = to,
        }
        Ok(MoveOutcome::Moved)
    }

    /// Remove a polygon point; later indices shift down by one.
    pub fn remove_point(&mut self, index: usize) -> Result<Point, EditError> {
        self.ensure_unlocked()?;
        if self.constraint.is_fixed_cardinality() {
            return Err(EditError::invalid(format!(
                "cannot remove points from {} region {}",
                self.constraint, self.tag
            )));
        }
        self.check_index(index)?;
        Ok(self.remove_at(index))
    }

    /// Remove the most recently added point, wherever it sits in index order.
    pub fn undo_last_point(&mut self) -> Result<Point, EditError> {
        self.ensure_unlocked()?;
        if self.constraint.is_fixed_cardinality() {
            return Err(EditError::invalid(format!(
                "cannot remove points from {} region {}",
                self.constraint, self.tag
            )));
        }
        let Some(&index) = self.insertion_log.last() else {
            return Err(EditError::invalid(format!(
                "region {} has no point to undo",
                self.tag
            )));
        };
        Ok(self.remove_at(index))
    }

    /// Move the whole region by a delta.
    pub fn translate(&mut self, dx: f32, dy: f32) -> Result<(), EditError> {
        self.ensure_unlocked()?;
        if !dx.is_finite() || !dy.is_finite() {
            return Err(EditError::invalid(format!(
                "cannot move region {} by a non-finite offset",
                self.tag
            )));
        }
        for p in &mut self.points {
            *p = p.offset(dx, dy);
        }
        Ok(())
    }

    fn insert_at(&mut self, index: usize, location: Point) {
        for logged in &mut self.insertion_log {
            if *logged >= index {
                *logged += 1;
            }
        }
        self.insertion_log.push(index);
        self.points.insert(index, location);
    }

    fn remove_at(&mut self, index: usize) -> Point {
        self.insertion_log.retain(|&logged| logged != index);
        for logged in &mut self.insertion_log {
            if *logged > index {
                *logged -= 1;
            }
        }
        self.points.remove(index)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Check if a location falls inside the region's polygon.
    pub fn contains(&self, location: Point) -> bool {
        self.is_valid() && geometry::point_in_polygon(&self.points, location)
    }

    /// Closest point within `radius` of `location`.
    pub fn nearest_point(&self, location: Point, radius: f32) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, geometry::distance(*p, location)))
            .filter(|(_, d)| *d < radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Edge midpoints offered for inserting a new polygon point. Entry `i`
    /// sits between points `i` and `i + 1` (wrapping), so touching it inserts
    /// at `i + 1`.
    pub fn virtual_points(&self) -> Vec<Point> {
        if self.constraint != Constraint::Polygon || !self.is_valid() {
            return Vec::new();
        }
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].midpoint(&self.points[(i + 1) % n]))
            .collect()
    }

    /// Box covering the point markers.
    pub fn bounding_box(&self, marker_half_size: f32) -> Option<BoundingBox> {
        geometry::bounding_box(&self.points, marker_half_size)
    }

    /// Shape to render, or `None` while the region is too small to draw.
    pub fn outline(&self) -> Option<Outline> {
        if !self.is_valid() {
            return None;
        }
        match self.constraint {
            Constraint::Ellipse => {
                let bbox = self.bounding_box(0.0)?;
                Some(Outline::Ellipse {
                    center: bbox.center(),
                    radius_x: bbox.width / 2.0,
                    radius_y: bbox.height / 2.0,
                })
            }
            Constraint::Polygon | Constraint::Rectangle => {
                Some(Outline::Polygon(self.points.clone()))
            }
        }
    }

    /// Copy of this region with every point multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Region {
        let mut region = self.clone();
        for p in &mut region.points {
            *p = p.scaled(factor);
        }
        region
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Region {
        Region::with_points(
            100,
            Constraint::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(5.0, 10.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_add_point_append_and_insert() {
        let mut region = Region::new(100, Constraint::Polygon);
        assert_eq!(region.add_point(Point::new(0.0, 0.0), None).unwrap(), 0);
        assert_eq!(region.add_point(Point::new(10.0, 0.0), None).unwrap(), 1);
        assert_eq!(region.add_point(Point::new(10.0, 10.0), None).unwrap(), 2);
        assert_eq!(region.add_point(Point::new(5.0, -5.0), Some(1)).unwrap(), 1);

        assert_eq!(
            region.points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(5.0, -5.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ]
        );
        assert!(region.add_point(Point::new(0.0, 0.0), Some(9)).is_err());
    }

    #[test]
    fn test_undo_follows_insertion_order() {
        let mut region = triangle();
        region.add_point(Point::new(5.0, -5.0), Some(1)).unwrap();
        region.add_point(Point::new(20.0, 20.0), None).unwrap();
        region.add_point(Point::new(-1.0, 5.0), Some(0)).unwrap();

        // Most recent first, regardless of where they were inserted
        assert_eq!(region.undo_last_point().unwrap(), Point::new(-1.0, 5.0));
        assert_eq!(region.undo_last_point().unwrap(), Point::new(20.0, 20.0));
        assert_eq!(region.undo_last_point().unwrap(), Point::new(5.0, -5.0));
        assert_eq!(region, triangle());

        assert_eq!(region.undo_last_point().unwrap(), Point::new(5.0, 10.0));
        assert_eq!(region.undo_last_point().unwrap(), Point::new(10.0, 0.0));
        assert_eq!(region.undo_last_point().unwrap(), Point::new(0.0, 0.0));
        assert!(matches!(
            region.undo_last_point(),
            Err(EditError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_undo_after_remove() {
        let mut region = triangle();
        region.add_point(Point::new(5.0, -5.0), Some(1)).unwrap();
        region.add_point(Point::new(7.0, 7.0), Some(3)).unwrap();
        // Remove the first inserted extra point; the log must forget it
        region.remove_point(1).unwrap();
        assert_eq!(region.undo_last_point().unwrap(), Point::new(7.0, 7.0));
        assert_eq!(region, triangle());
    }

    #[test]
    fn test_remove_point_reindexes() {
        let mut region = triangle();
        region.add_point(Point::new(0.0, 10.0), None).unwrap();
        let removed = region.remove_point(1).unwrap();
        assert_eq!(removed, Point::new(10.0, 0.0));
        assert_eq!(region.point(1), Some(Point::new(5.0, 10.0)));
        assert_eq!(region.point(2), Some(Point::new(0.0, 10.0)));
        assert!(region.remove_point(3).is_err());
    }

    #[test]
    fn test_constrained_cardinality() {
        let mut rect = Region::rectangle(100);
        assert_eq!(rect.len(), 4);
        assert!(rect.add_point(Point::new(0.0, 0.0), None).is_err());
        assert!(rect.remove_point(0).is_err());
        assert!(rect.undo_last_point().is_err());
        assert_eq!(rect.len(), 4);

        assert!(Region::with_points(1, Constraint::Ellipse, vec![Point::new(0.0, 0.0)]).is_err());
    }

    #[test]
    fn test_locked_region_is_immutable() {
        let mut region = triangle();
        region.locked = true;
        let before = region.clone();
        let limits = DragLimits::default();

        for index in 0..4 {
            let target = Point::new(index as f32, 1.0);
            assert_eq!(
                region.move_point(index, target, &limits),
                Err(EditError::Locked { tag: 100 })
            );
            assert_eq!(region.remove_point(index), Err(EditError::Locked { tag: 100 }));
        }
        assert_eq!(region.translate(5.0, 5.0), Err(EditError::Locked { tag: 100 }));
        assert_eq!(region.undo_last_point(), Err(EditError::Locked { tag: 100 }));
        assert_eq!(region.points(), before.points());
    }

    #[test]
    fn test_move_point_rejects_long_jumps() {
        let mut region = triangle();
        let limits = DragLimits {
            max_drag_distance: 50.0,
        };
        assert_eq!(
            region.move_point(0, Point::new(100.0, 0.0), &limits).unwrap(),
            MoveOutcome::Rejected
        );
        assert_eq!(region.point(0), Some(Point::new(0.0, 0.0)));
        assert_eq!(
            region.move_point(0, Point::new(-3.0, 4.0), &limits).unwrap(),
            MoveOutcome::Moved
        );
        assert_eq!(region.point(0), Some(Point::new(-3.0, 4.0)));
    }

    #[test]
    fn test_non_finite_coordinates_refused() {
        let mut region = triangle();
        let limits = DragLimits::default();
        for target in [
            Point::new(f32::NAN, 0.0),
            Point::new(0.0, f32::INFINITY),
            Point::new(f32::NEG_INFINITY, f32::NAN),
        ] {
            assert_eq!(
                region.move_point(0, target, &limits).unwrap(),
                MoveOutcome::Rejected
            );
            assert!(matches!(
                region.add_point(target, None),
                Err(EditError::InvalidOperation { .. })
            ));
        }
        assert!(region.translate(f32::NAN, 1.0).is_err());
        assert!(region.translate(1.0, f32::INFINITY).is_err());
        assert_eq!(region, triangle());
    }

    #[test]
    fn test_move_rectangle_corner() {
        let mut rect = Region::rectangle(100);
        rect.move_point(2, Point::new(320.0, 170.0), &DragLimits::default())
            .unwrap();
        assert_eq!(
            rect.points(),
            &[
                Point::new(100.0, 30.0),
                Point::new(320.0, 30.0),
                Point::new(320.0, 170.0),
                Point::new(100.0, 170.0),
            ]
        );
    }

    #[test]
    fn test_contains_and_nearest() {
        let region = triangle();
        assert!(region.contains(Point::new(5.0, 3.0)));
        assert!(!region.contains(Point::new(50.0, 3.0)));
        assert_eq!(region.nearest_point(Point::new(9.0, 1.0), 20.0), Some(1));
        assert_eq!(region.nearest_point(Point::new(90.0, 90.0), 20.0), None);

        let mut two = Region::new(1, Constraint::Polygon);
        two.add_point(Point::new(0.0, 0.0), None).unwrap();
        two.add_point(Point::new(10.0, 10.0), None).unwrap();
        assert!(!two.contains(Point::new(5.0, 5.0)));
        assert!(two.outline().is_none());
    }

    #[test]
    fn test_virtual_points() {
        let region = triangle();
        assert_eq!(
            region.virtual_points(),
            vec![
                Point::new(5.0, 0.0),
                Point::new(7.5, 5.0),
                Point::new(2.5, 5.0)
            ]
        );
        assert!(Region::rectangle(1).virtual_points().is_empty());
    }

    #[test]
    fn test_ellipse_outline() {
        let ellipse = Region::ellipse(100);
        assert_eq!(
            ellipse.outline(),
            Some(Outline::Ellipse {
                center: Point::new(300.0, 110.0),
                radius_x: 100.0,
                radius_y: 60.0,
            })
        );
    }

    #[test]
    fn test_scaled_and_info() {
        let mut region = triangle();
        region.apply_info(RegionInfo {
            title: "Tower".to_string(),
            description: "West side".to_string(),
            zoom: true,
            locked: false,
        });
        let half = region.scaled(0.5);
        assert_eq!(half.point(1), Some(Point::new(5.0, 0.0)));
        assert_eq!(half.info(), region.info());
        assert_eq!(half.scaled(2.0), region);
    }
}
