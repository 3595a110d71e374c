//! Edit session: turns touch events into region edits.
//!
//! The session owns view-space copies of a document's regions. Touches are
//! handled in three steps (began, moved, ended) and each step reports a
//! [`TouchOutcome`] so the caller knows what to redraw. Regions go back to
//! image space on [`EditSession::commit`].

use std::collections::BTreeMap;

use crate::config::XiaConfig;
use crate::document::{Document, DocumentError, tag_after};
use crate::geometry::{self, BoundingBox, Point};
use crate::model::{
    Constraint, DragLimits, EditError, MoveOutcome, Outline, Region, RegionInfo, RegionTag,
};
use crate::store::DocumentStore;

/// What the current touch is doing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    /// No touch in progress
    Idle,
    /// Dragging one point of a region
    Point { tag: RegionTag, index: usize },
    /// Dragging a whole region; `last` is the previous touch location
    Region { tag: RegionTag, last: Point },
    /// The touch started on empty space
    Missed,
}

/// Result of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Nothing changed
    Ignored,
    /// A point was created and is now being dragged
    PointAdded { tag: RegionTag, index: usize },
    /// An existing point was grabbed
    PointGrabbed { tag: RegionTag, index: usize },
    PointMoved { tag: RegionTag, index: usize },
    /// The drag update jumped too far and was dropped
    DragRejected { tag: RegionTag, index: usize },
    /// A region became the active one
    RegionSelected { tag: RegionTag },
    RegionMoved { tag: RegionTag },
    /// The touch that moved something was lifted
    DragEnded { tag: RegionTag },
    /// A touch on empty space cleared the selection
    Deselected,
}

impl TouchOutcome {
    /// Whether the display must be refreshed.
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, TouchOutcome::Ignored | TouchOutcome::DragRejected { .. })
    }
}

/// Editing state for one open document.
#[derive(Debug)]
pub struct EditSession {
    document: Document,
    /// Regions in view space
    regions: BTreeMap<RegionTag, Region>,
    scale: f32,
    active: Option<RegionTag>,
    creating: bool,
    drag: DragState,
    dirty: bool,
    hit_radius: f32,
    marker_half_size: f32,
    limits: DragLimits,
}

impl EditSession {
    /// Open a document for editing at the given display scale.
    pub fn open(document: Document, scale: f32, config: &XiaConfig) -> Result<Self, EditError> {
        if document.is_read_only() {
            return Err(EditError::ReadOnly);
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EditError::invalid(format!("invalid display scale {}", scale)));
        }

        let regions = document
            .regions()
            .map(|region| (region.tag(), region.scaled(scale)))
            .collect();
        log::debug!(
            "Opened edit session with {} regions at scale {:.3}",
            document.region_count(),
            scale
        );

        Ok(Self {
            document,
            regions,
            scale,
            active: None,
            creating: false,
            drag: DragState::Idle,
            dirty: false,
            hit_radius: config.editing.hit_radius,
            marker_half_size: config.editing.marker_half_size,
            limits: config.editing.drag_limits(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Regions in view space, in tag order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region(&self, tag: RegionTag) -> Option<&Region> {
        self.regions.get(&tag)
    }

    pub fn active_tag(&self) -> Option<RegionTag> {
        self.active
    }

    /// Whether a polygon is being drawn point by point.
    pub fn is_creating(&self) -> bool {
        self.creating
    }

    /// Whether there are edits not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Shape to draw for a region.
    pub fn outline(&self, tag: RegionTag) -> Option<Outline> {
        self.regions.get(&tag)?.outline()
    }

    /// Insertion handles for a region; empty unless it is an unlocked polygon.
    pub fn virtual_points(&self, tag: RegionTag) -> Vec<Point> {
        match self.regions.get(&tag) {
            Some(region) if !region.locked => region.virtual_points(),
            _ => Vec::new(),
        }
    }

    /// Frame around a region's point markers.
    pub fn selection_frame(&self, tag: RegionTag) -> Option<BoundingBox> {
        self.regions.get(&tag)?.bounding_box(self.marker_half_size)
    }

    fn region_mut(&mut self, tag: RegionTag) -> Result<&mut Region, EditError> {
        self.regions
            .get_mut(&tag)
            .ok_or(EditError::RegionNotFound { tag })
    }

    fn active_or_err(&self) -> Result<RegionTag, EditError> {
        self.active
            .ok_or_else(|| EditError::invalid("no region is selected"))
    }

    fn next_tag(&self) -> Result<RegionTag, EditError> {
        let document_next = self.document.next_tag()?;
        match self.regions.keys().max() {
            Some(&max) => Ok(document_next.max(tag_after(max)?)),
            None => Ok(document_next),
        }
    }

    // ========================================================================
    // Region lifecycle
    // ========================================================================

    /// Start a new region and make it active.
    ///
    /// Polygons start empty and enter creation mode, where touches add
    /// points. Rectangles and ellipses start at their default position.
    pub fn begin_region(&mut self, constraint: Constraint) -> Result<RegionTag, EditError> {
        let tag = self.next_tag()?;
        if self.creating {
            // An unfinished polygon is closed or discarded first
            self.close_creation();
        }

        let region = match constraint {
            Constraint::Polygon => Region::new(tag, constraint),
            Constraint::Rectangle => Region::rectangle(tag),
            Constraint::Ellipse => Region::ellipse(tag),
        };
        self.regions.insert(tag, region);
        self.active = Some(tag);
        self.creating = constraint == Constraint::Polygon;
        self.drag = DragState::Idle;
        self.dirty = true;

        log::info!("Started {} region {}", constraint, tag);
        Ok(tag)
    }

    /// Leave creation mode. Returns the tag if the region was kept, `None`
    /// when it had fewer than three points and was discarded.
    pub fn finish_creation(&mut self) -> Result<Option<RegionTag>, EditError> {
        if !self.creating {
            return Err(EditError::invalid("no region is being created"));
        }
        Ok(self.close_creation())
    }

    fn close_creation(&mut self) -> Option<RegionTag> {
        self.creating = false;
        self.drag = DragState::Idle;

        let tag = self.active?;
        if self.regions.get(&tag).is_some_and(Region::is_valid) {
            log::info!("Finished region {}", tag);
            Some(tag)
        } else {
            self.regions.remove(&tag);
            self.active = None;
            log::info!("Discarded region {} with fewer than 3 points", tag);
            None
        }
    }

    /// Delete a region. Locked regions must be unlocked first.
    pub fn delete_region(&mut self, tag: RegionTag) -> Result<Region, EditError> {
        if self.region_mut(tag)?.locked {
            return Err(EditError::Locked { tag });
        }
        let region = self
            .regions
            .remove(&tag)
            .ok_or(EditError::RegionNotFound { tag })?;

        if self.active == Some(tag) {
            self.active = None;
            self.creating = false;
        }
        self.drag = DragState::Idle;
        self.dirty = true;
        log::info!("Deleted region {}", tag);
        Ok(region)
    }

    /// Update title, description and flags of a region.
    pub fn set_region_info(&mut self, tag: RegionTag, info: RegionInfo) -> Result<(), EditError> {
        self.region_mut(tag)?.apply_info(info);
        self.dirty = true;
        Ok(())
    }

    // ========================================================================
    // Point edits
    // ========================================================================

    /// Remove the most recently added point of the active region.
    pub fn undo_last_point(&mut self) -> Result<Point, EditError> {
        let tag = self.active_or_err()?;
        let point = self.region_mut(tag)?.undo_last_point()?;
        self.after_point_removed(tag);
        Ok(point)
    }

    /// Remove a point of the active region.
    pub fn remove_point(&mut self, index: usize) -> Result<Point, EditError> {
        let tag = self.active_or_err()?;
        let point = self.region_mut(tag)?.remove_point(index)?;
        self.after_point_removed(tag);
        Ok(point)
    }

    /// Outside creation mode a region that drops below three points is gone.
    fn after_point_removed(&mut self, tag: RegionTag) {
        self.drag = DragState::Idle;
        self.dirty = true;
        if self.creating {
            return;
        }
        if self.regions.get(&tag).is_some_and(|r| !r.is_valid()) {
            self.regions.remove(&tag);
            if self.active == Some(tag) {
                self.active = None;
            }
            log::info!("Region {} dropped below 3 points and was deleted", tag);
        }
    }

    // ========================================================================
    // Touch handling
    // ========================================================================

    /// A finger touched the view.
    pub fn touch_began(&mut self, location: Point) -> TouchOutcome {
        self.drag = DragState::Idle;
        if self.creating {
            self.touch_began_creating(location)
        } else {
            self.touch_began_editing(location)
        }
    }

    fn touch_began_creating(&mut self, location: Point) -> TouchOutcome {
        let Some(tag) = self.active else {
            self.creating = false;
            return TouchOutcome::Ignored;
        };
        let hit_radius = self.hit_radius;
        let Some(region) = self.regions.get(&tag) else {
            self.creating = false;
            return TouchOutcome::Ignored;
        };
        if region.locked {
            return TouchOutcome::Ignored;
        }

        if let Some(index) = nearest(&region.virtual_points(), location, hit_radius) {
            return self.insert_point(tag, location, Some(index + 1));
        }
        if let Some(index) = region.nearest_point(location, hit_radius) {
            self.drag = DragState::Point { tag, index };
            log::debug!("Grabbed point {} of region {}", index, tag);
            return TouchOutcome::PointGrabbed { tag, index };
        }
        if region.contains(location) {
            self.drag = DragState::Region { tag, last: location };
            return TouchOutcome::RegionSelected { tag };
        }
        if region.constraint() == Constraint::Polygon {
            return self.insert_point(tag, location, None);
        }
        TouchOutcome::Ignored
    }

    fn touch_began_editing(&mut self, location: Point) -> TouchOutcome {
        if let Some(tag) = self.active {
            if let Some(region) = self.regions.get(&tag).filter(|r| !r.locked) {
                if let Some(index) = region.nearest_point(location, self.hit_radius) {
                    self.drag = DragState::Point { tag, index };
                    log::debug!("Grabbed point {} of region {}", index, tag);
                    return TouchOutcome::PointGrabbed { tag, index };
                }
                if let Some(index) = nearest(&region.virtual_points(), location, self.hit_radius) {
                    return self.insert_point(tag, location, Some(index + 1));
                }
            }
        }

        // Topmost region under the touch; later tags are drawn on top
        let touched = self
            .regions
            .values()
            .rev()
            .find(|region| region.contains(location))
            .map(|region| (region.tag(), region.locked));

        match touched {
            Some((tag, locked)) => {
                self.active = Some(tag);
                if !locked {
                    self.drag = DragState::Region { tag, last: location };
                }
                log::debug!("Selected region {} (locked: {})", tag, locked);
                TouchOutcome::RegionSelected { tag }
            }
            None => {
                self.drag = DragState::Missed;
                TouchOutcome::Ignored
            }
        }
    }

    fn insert_point(&mut self, tag: RegionTag, location: Point, at: Option<usize>) -> TouchOutcome {
        let Ok(region) = self.region_mut(tag) else {
            return TouchOutcome::Ignored;
        };
        match region.add_point(location, at) {
            Ok(index) => {
                self.drag = DragState::Point { tag, index };
                self.dirty = true;
                log::debug!("Added point {} to region {}", index, tag);
                TouchOutcome::PointAdded { tag, index }
            }
            Err(e) => {
                log::debug!("Could not add point to region {}: {}", tag, e);
                TouchOutcome::Ignored
            }
        }
    }

    /// The finger moved.
    pub fn touch_moved(&mut self, location: Point) -> TouchOutcome {
        match self.drag {
            DragState::Point { tag, index } => {
                let limits = self.limits;
                let Ok(region) = self.region_mut(tag) else {
                    return TouchOutcome::Ignored;
                };
                match region.move_point(index, location, &limits) {
                    Ok(MoveOutcome::Moved) => {
                        self.dirty = true;
                        TouchOutcome::PointMoved { tag, index }
                    }
                    Ok(MoveOutcome::Rejected) => TouchOutcome::DragRejected { tag, index },
                    Err(e) => {
                        log::debug!("Point drag refused: {}", e);
                        TouchOutcome::Ignored
                    }
                }
            }
            DragState::Region { tag, last } => {
                let Ok(region) = self.region_mut(tag) else {
                    return TouchOutcome::Ignored;
                };
                match region.translate(location.x - last.x, location.y - last.y) {
                    Ok(()) => {
                        self.drag = DragState::Region { tag, last: location };
                        self.dirty = true;
                        TouchOutcome::RegionMoved { tag }
                    }
                    Err(e) => {
                        log::debug!("Region drag refused: {}", e);
                        TouchOutcome::Ignored
                    }
                }
            }
            DragState::Idle | DragState::Missed => TouchOutcome::Ignored,
        }
    }

    /// The finger was lifted.
    pub fn touch_ended(&mut self, _location: Point) -> TouchOutcome {
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        match drag {
            DragState::Point { tag, .. } | DragState::Region { tag, .. } => {
                TouchOutcome::DragEnded { tag }
            }
            DragState::Missed if self.active.is_some() => {
                log::debug!("Touch on empty space, deselected region");
                self.active = None;
                TouchOutcome::Deselected
            }
            DragState::Missed | DragState::Idle => TouchOutcome::Ignored,
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the regions back into the document in image space. Regions with
    /// fewer than three points are left out.
    pub fn commit(&mut self) -> &Document {
        let factor = 1.0 / self.scale;
        self.document
            .replace_regions(self.regions.values().map(|region| region.scaled(factor)));
        &self.document
    }

    /// Commit and persist. On failure the session stays dirty and nothing in
    /// memory is lost.
    pub fn save(&mut self, store: &DocumentStore, id: &str) -> Result<(), DocumentError> {
        self.commit();
        store.save(id, &self.document)?;
        self.dirty = false;
        Ok(())
    }

    /// Commit and hand back the document.
    pub fn into_document(mut self) -> Document {
        self.commit();
        self.document
    }
}

/// Index of the candidate closest to `location` within `radius`.
fn nearest(candidates: &[Point], location: Point, radius: f32) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, p)| (i, geometry::distance(*p, location)))
        .filter(|(_, d)| *d < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
