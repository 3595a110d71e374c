//! Region model: points under a shape constraint.

mod constraint;
mod error;
mod region;

pub use constraint::{Constraint, default_ellipse, default_rectangle, resolve_move};
pub use error::EditError;
pub use region::{DragLimits, MoveOutcome, Outline, Region, RegionInfo, RegionTag};
