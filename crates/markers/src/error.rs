use crate::marker::MarkerId;
use thiserror::Error;

/// Result type for marker operations
pub type Result<T> = std::result::Result<T, MarkerError>;

/// Errors raised by the marker store and its table collaborators
#[derive(Error, Debug)]
pub enum MarkerError {
    /// The marker table rejected or failed the call
    #[error("Marker table error: {0}")]
    TableError(String),

    /// The table handed back an id that is already in the collection
    #[error("Duplicate marker id: {0}")]
    DuplicateId(MarkerId),

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl MarkerError {
    /// Create a table error
    pub fn table(msg: impl Into<String>) -> Self {
        Self::TableError(msg.into())
    }
}
