//! Error types for gallery ingestion, importance ranking and hue queries

use thiserror::Error;

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, GalleryError>;

/// Every failure a gallery operation can surface to its caller.
///
/// A failed hue extraction is deliberately absent: it degrades to hue 0
/// and is only counted (see `gallery::metrics`).
#[derive(Error, Debug)]
pub enum GalleryError {
    /// Input rejected before any side effect
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Owner or image reference does not exist
    #[error("{what} not found")]
    NotFound { what: String },

    /// The owner already has the maximum number of important images
    #[error("At most {limit} images can be marked important")]
    CapacityExceeded { limit: usize },

    /// Object store or gallery store could not complete the request
    #[error("{service} failure: {message}")]
    Upstream {
        service: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GalleryError {
    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a not-found error for the named resource
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an upstream error with its underlying cause
    pub fn upstream<E>(service: &'static str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream {
            service,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an upstream error that has no underlying cause
    pub fn upstream_message(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
            source: None,
        }
    }

    /// HTTP-class status code the boundary reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GalleryError::Validation { .. } => 400,
            GalleryError::NotFound { .. } => 404,
            GalleryError::CapacityExceeded { .. } => 400,
            GalleryError::Upstream { .. } => 500,
        }
    }

    /// Check whether the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<rusqlite::Error> for GalleryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::upstream("gallery store", err.to_string(), err)
    }
}

impl From<std::io::Error> for GalleryError {
    fn from(err: std::io::Error) -> Self {
        Self::upstream("filesystem", err.to_string(), err)
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(err: serde_json::Error) -> Self {
        Self::upstream("serialization", err.to_string(), err)
    }
}

impl From<tokio::task::JoinError> for GalleryError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::upstream("worker", format!("Task join error: {}", err), err)
    }
}
