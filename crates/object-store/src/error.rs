//! Error types for the object storage capability.

use crate::location::ObjectLocation;

/// Errors that can occur when talking to object storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist
    #[error("object not found: {0}")]
    NotFound(ObjectLocation),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A URL that does not point at an object we know how to address
    #[error("unrecognized object location: {0}")]
    InvalidLocation(String),

    /// Failed to produce a signature
    #[error("signing failed: {0}")]
    Signing(String),

    /// An upload was refused by the policy it was submitted under
    #[error("upload rejected by policy: {0}")]
    PolicyViolation(String),
}

impl StoreError {
    /// Whether this error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }

    /// Attach the location to backend errors, classifying `NotFound` by variant.
    pub(crate) fn at(err: object_store::Error, location: &ObjectLocation) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StoreError::NotFound(location.clone()),
            other => StoreError::ObjectStore(other),
        }
    }
}

/// Result type alias for object storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
