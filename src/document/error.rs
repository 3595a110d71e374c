//! Error types for document loading, parsing and persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, repairing or writing a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document file could not be read
    #[error("Failed to load document {path:?}: {source}")]
    Load {
        /// File that failed to load
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML that does not describe a document
    #[error("Malformed document: {message}")]
    Malformed {
        /// Description of the problem
        message: String,
    },

    /// A coordinate in a `path` attribute is not a number
    #[error("Invalid coordinate '{value}'")]
    CoordinateParse {
        /// The offending text
        value: String,
    },

    /// The document could not be written; the in-memory copy is intact
    #[error("Failed to save document {path:?}: {source}")]
    Persistence {
        /// File that failed to save
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No document pair with this id exists
    #[error("Document not found: {id}")]
    NotFound {
        /// The missing document id
        id: String,
    },

    /// Other I/O error (directory listing, deletion)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The photo could not be inspected
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl DocumentError {
    /// Create a malformed document error with a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a coordinate parse error for the given text.
    pub fn coordinate(value: impl Into<String>) -> Self {
        Self::CoordinateParse {
            value: value.into(),
        }
    }
}
