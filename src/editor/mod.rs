//! Touch-driven editing on top of the region model.

mod session;
mod shared;


pub use session::{EditSession, TouchOutcome};
pub use shared::SharedSession;
