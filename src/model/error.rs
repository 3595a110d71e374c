//! Error types for region editing operations.

use thiserror::Error;

use super::region::RegionTag;

/// Errors returned by region and edit-session operations.
///
/// Every variant describes a refused operation: the model is left exactly as
/// it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// No region with this tag exists
    #[error("Region not found: {tag}")]
    RegionNotFound {
        /// The missing region tag
        tag: RegionTag,
    },

    /// The region is locked and can only be viewed
    #[error("Region {tag} is locked")]
    Locked {
        /// Tag of the locked region
        tag: RegionTag,
    },

    /// The whole document is read-only
    #[error("Document is read-only")]
    ReadOnly,

    /// The operation does not apply in the current state
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation was refused
        message: String,
    },
}

impl EditError {
    /// Create an invalid operation error with a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
