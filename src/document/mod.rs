//! Annotation document: the typed view of a photo's XML sidecar.
//!
//! Loading always goes through [`normalize`] first, so every typed field is
//! present. Region coordinates are kept in image space here; the editor
//! converts them to view space.

mod error;
mod normalize;
mod path;
mod xml;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use crate::constants::{DEFAULT_READONLY_CODE, FIRST_REGION_TAG, MIN_REGION_POINTS};
use crate::geometry::{self, BoundingBox, Point};
use crate::model::{Constraint, EditError, Outline, Region, RegionTag};

pub use error::DocumentError;
pub use normalize::{ROOT, Repair, normalize};
pub use path::{format_path, parse_coordinate, parse_path};
pub use xml::XmlElement;

/// Read-only protection of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnly {
    /// Regions cannot be edited while set
    pub enabled: bool,
    /// Code required to lift the protection
    pub code: String,
}

impl Default for ReadOnly {
    fn default() -> Self {
        Self {
            enabled: false,
            code: DEFAULT_READONLY_CODE.to_string(),
        }
    }
}

/// A `detail` element that could not be turned into a [`Region`].
///
/// It is kept verbatim and written back on save so a bad coordinate never
/// destroys the user's data.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRegion {
    /// Tag, when it could be read
    pub tag: Option<RegionTag>,
    pub reason: String,
    pub element: XmlElement,
}

/// One stop of the guided slideshow.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStep {
    pub tag: RegionTag,
    /// Image-space box around the region's points
    pub frame: BoundingBox,
    pub outline: Outline,
    pub points: Vec<Point>,
    pub title: String,
    pub description: String,
    pub zoom: bool,
}

/// Regions prepared for replay, in tag order.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    /// Whether region outlines are visible when playback starts
    pub show_details: bool,
    pub steps: Vec<PlaybackStep>,
}

impl Playback {
    /// Step touched at `location` (image space): inside the region or within
    /// `hit_radius` of one of its points. Later steps win, as they are drawn
    /// on top.
    pub fn step_at(&self, location: Point, hit_radius: f32) -> Option<&PlaybackStep> {
        self.steps.iter().rev().find(|step| {
            geometry::point_in_polygon(&step.points, location)
                || step
                    .points
                    .iter()
                    .any(|p| geometry::distance(*p, location) < hit_radius)
        })
    }
}

/// Typed annotation document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub creator: String,
    pub rights: String,
    pub description: String,
    pub readonly: ReadOnly,
    pub image_title: String,
    pub image_description: String,
    /// Default visibility of region outlines
    pub show_details: bool,
    regions: BTreeMap<RegionTag, Region>,
    rejected: Vec<RejectedRegion>,
    /// Unknown top-level elements, preserved on save
    extra: Vec<XmlElement>,
}

impl Default for Document {
    fn default() -> Self {
        Self::blank()
    }
}

/// Top-level elements mapped to typed fields.
const KNOWN_ELEMENTS: [&str; 7] = [
    "title",
    "creator",
    "rights",
    "description",
    "readonly",
    "image",
    "details",
];

/// Tags in a file must be positive and leave room for one more region.
fn tag_in_range(tag: RegionTag) -> bool {
    tag > 0 && tag < RegionTag::MAX
}

/// The tag following `tag`, refused once the tag space is used up.
pub(crate) fn tag_after(tag: RegionTag) -> Result<RegionTag, EditError> {
    tag.checked_add(1)
        .ok_or_else(|| EditError::invalid("no region tags left"))
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true"))
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

impl Document {
    /// A document with no regions and empty metadata.
    pub fn blank() -> Self {
        Self {
            title: String::new(),
            creator: String::new(),
            rights: String::new(),
            description: String::new(),
            readonly: ReadOnly::default(),
            image_title: String::new(),
            image_description: String::new(),
            show_details: true,
            regions: BTreeMap::new(),
            rejected: Vec::new(),
            extra: Vec::new(),
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parse and normalize a document.
    pub fn from_xml_str(xml: &str) -> Result<Self, DocumentError> {
        Self::from_xml_str_with_repairs(xml).map(|(doc, _)| doc)
    }

    /// Parse and normalize a document, also returning the repairs applied.
    pub fn from_xml_str_with_repairs(xml: &str) -> Result<(Self, Vec<Repair>), DocumentError> {
        let mut root = XmlElement::parse(xml)?;
        let repairs = normalize(&mut root)?;
        let document = Self::from_normalized(root);
        Ok((document, repairs))
    }

    /// Build the typed document from a tree that went through [`normalize`].
    fn from_normalized(root: XmlElement) -> Self {
        let text = |name: &str| {
            root.child(name)
                .map(|e| e.text.trim().to_string())
                .unwrap_or_default()
        };

        let mut doc = Self::blank();
        doc.title = text("title");
        doc.creator = text("creator");
        doc.rights = text("rights");
        doc.description = text("description");

        if let Some(readonly) = root.child("readonly") {
            doc.readonly = ReadOnly {
                enabled: parse_flag(Some(readonly.text.as_str())),
                code: readonly.attr("code").unwrap_or_default().to_string(),
            };
        }
        if let Some(image) = root.child("image") {
            doc.image_title = image.attr("title").unwrap_or_default().to_string();
            doc.image_description = image.attr("desctription").unwrap_or_default().to_string();
        }
        if let Some(details) = root.child("details") {
            doc.show_details = details.attr("show") != Some("false");
            for element in details.children_named("detail") {
                doc.load_detail(element);
            }
        }

        doc.extra = root
            .children
            .into_iter()
            .filter(|c| !KNOWN_ELEMENTS.contains(&c.name.as_str()))
            .collect();
        doc
    }

    fn load_detail(&mut self, element: &XmlElement) {
        let tag = element.attr("tag").and_then(|t| t.trim().parse::<RegionTag>().ok());
        match self.region_from_element(tag, element) {
            Ok(Some(region)) => {
                self.regions.insert(region.tag(), region);
            }
            Ok(None) => {}
            Err(reason) => {
                log::warn!("Setting aside detail {:?}: {}", tag, reason);
                self.rejected.push(RejectedRegion {
                    tag: tag.filter(|t| tag_in_range(*t)),
                    reason,
                    element: element.clone(),
                });
            }
        }
    }

    /// `Ok(None)` means the detail is too small to keep and is dropped.
    fn region_from_element(
        &self,
        tag: Option<RegionTag>,
        element: &XmlElement,
    ) -> Result<Option<Region>, String> {
        let tag = tag.ok_or_else(|| "missing or invalid tag".to_string())?;
        if !tag_in_range(tag) {
            return Err(format!("tag {} is out of range", tag));
        }
        if self.regions.contains_key(&tag) {
            return Err(format!("duplicate tag {}", tag));
        }
        let constraint: Constraint = element.attr("constraint").unwrap_or_default().parse()?;
        let points =
            parse_path(element.attr("path").unwrap_or_default()).map_err(|e| e.to_string())?;

        if points.len() < MIN_REGION_POINTS {
            log::warn!("Dropping detail {} with only {} points", tag, points.len());
            return Ok(None);
        }

        let mut region = Region::with_points(tag, constraint, points).map_err(|e| e.to_string())?;
        region.title = element.attr("title").unwrap_or_default().to_string();
        region.description = element.text.trim().to_string();
        region.zoom = parse_flag(element.attr("zoom"));
        region.locked = parse_flag(element.attr("locked"));
        Ok(Some(region))
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Build the XML tree. Regions with fewer than three points are skipped.
    pub fn to_xml(&self) -> XmlElement {
        let mut details = XmlElement::new("details").with_attr("show", flag(self.show_details));
        for region in self.regions.values() {
            if !region.is_valid() {
                log::debug!("Skipping region {} with {} points", region.tag(), region.len());
                continue;
            }
            details.children.push(
                XmlElement::new("detail")
                    .with_attr("tag", region.tag().to_string())
                    .with_attr("zoom", flag(region.zoom))
                    .with_attr("title", region.title.as_str())
                    .with_attr("locked", flag(region.locked))
                    .with_attr("constraint", region.constraint().as_str())
                    .with_attr("path", format_path(region.points()))
                    .with_text(region.description.as_str()),
            );
        }
        details
            .children
            .extend(self.rejected.iter().map(|r| r.element.clone()));

        let mut root = XmlElement::new(ROOT)
            .with_child(XmlElement::new("title").with_text(self.title.as_str()))
            .with_child(XmlElement::new("creator").with_text(self.creator.as_str()))
            .with_child(XmlElement::new("rights").with_text(self.rights.as_str()))
            .with_child(XmlElement::new("description").with_text(self.description.as_str()))
            .with_child(
                XmlElement::new("readonly")
                    .with_attr("code", self.readonly.code.as_str())
                    .with_text(flag(self.readonly.enabled)),
            )
            .with_child(
                XmlElement::new("image")
                    .with_attr("title", self.image_title.as_str())
                    .with_attr("desctription", self.image_description.as_str()),
            )
            .with_child(details);
        root.children.extend(self.extra.iter().cloned());
        root
    }

    /// Serialize to an XML string with declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        self.to_xml().to_xml_string()
    }

    // ========================================================================
    // Regions
    // ========================================================================

    pub fn is_read_only(&self) -> bool {
        self.readonly.enabled
    }

    /// Regions in tag order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region(&self, tag: RegionTag) -> Option<&Region> {
        self.regions.get(&tag)
    }

    pub fn region_mut(&mut self, tag: RegionTag) -> Option<&mut Region> {
        self.regions.get_mut(&tag)
    }

    /// Details that failed to load and are carried through unchanged.
    pub fn rejected(&self) -> &[RejectedRegion] {
        &self.rejected
    }

    /// Tag for a new region: one above the highest tag in use, including
    /// rejected details, or the seed tag for an empty document.
    pub fn next_tag(&self) -> Result<RegionTag, EditError> {
        let max = self
            .regions
            .keys()
            .copied()
            .chain(self.rejected.iter().filter_map(|r| r.tag))
            .max();
        match max {
            Some(max) => tag_after(max),
            None => Ok(FIRST_REGION_TAG),
        }
    }

    /// Insert or replace a region, returning the previous one with that tag.
    pub fn insert_region(&mut self, region: Region) -> Option<Region> {
        self.regions.insert(region.tag(), region)
    }

    pub fn remove_region(&mut self, tag: RegionTag) -> Result<Region, EditError> {
        self.regions
            .remove(&tag)
            .ok_or(EditError::RegionNotFound { tag })
    }

    /// Replace every region, dropping those too small to keep.
    pub fn replace_regions(&mut self, regions: impl IntoIterator<Item = Region>) {
        self.regions = regions
            .into_iter()
            .filter(|region| {
                let keep = region.is_valid();
                if !keep {
                    log::debug!("Dropping region {} with {} points", region.tag(), region.len());
                }
                keep
            })
            .map(|region| (region.tag(), region))
            .collect();
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Valid regions in tag order, ready for the slideshow.
    pub fn playback(&self) -> Playback {
        let steps = self
            .regions
            .values()
            .filter_map(|region| {
                Some(PlaybackStep {
                    tag: region.tag(),
                    frame: region.bounding_box(0.0)?,
                    outline: region.outline()?,
                    points: region.points().to_vec(),
                    title: region.title.clone(),
                    description: region.description.clone(),
                    zoom: region.zoom,
                })
            })
            .collect();
        Playback {
            show_details: self.show_details,
            steps,
        }
    }
}
