//! Global constants for the xia annotation core

/// Hit radius for grabbing a region point while editing (view units)
pub const DEFAULT_EDIT_HIT_RADIUS: f32 = 20.0;

/// Hit radius used when touching regions during playback (view units)
pub const DEFAULT_PLAYBACK_HIT_RADIUS: f32 = 40.0;

/// A single drag update further than this is treated as input noise
pub const DEFAULT_MAX_DRAG_DISTANCE: f32 = 200.0;

/// Half the size of an on-screen point marker (markers are 10x10)
pub const DEFAULT_MARKER_HALF_SIZE: f32 = 5.0;

/// Tag given to the first region of a document
pub const FIRST_REGION_TAG: u32 = 100;

/// Minimum number of points for a region to be drawable and persisted
pub const MIN_REGION_POINTS: usize = 3;

/// Rectangle and ellipse regions always carry exactly this many points
pub const CONSTRAINED_POINT_COUNT: usize = 4;

/// Unlock code written with a backfilled `readonly` element
pub const DEFAULT_READONLY_CODE: &str = "1234";

/// Extension of the photo half of a document pair
pub const IMAGE_EXTENSION: &str = "jpg";

/// Extension of the sidecar half of a document pair
pub const XML_EXTENSION: &str = "xml";
