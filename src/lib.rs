//! xia - photo annotation core
//!
//! Regions ("details") drawn on a photo as polygons, rectangles or ellipses,
//! the XML sidecar they are stored in, and the touch-driven editing session
//! that connects a UI to both.

pub mod config;
pub mod constants;
pub mod document;
pub mod editor;
pub mod geometry;
pub mod model;
pub mod store;

pub use config::{ConfigError, XiaConfig};
pub use document::{Document, DocumentError, Playback, PlaybackStep};
pub use editor::{EditSession, SharedSession, TouchOutcome};
pub use geometry::{BoundingBox, Point};
pub use model::{Constraint, EditError, Region, RegionInfo, RegionTag};
pub use store::{DocumentEntry, DocumentStore};
