//! Facial-landmark extraction backend interface
//!
//! One capability interface with two implementations selected by
//! configuration: a local extraction executable and a long-lived container
//! running the same tool against a volume-mounted view of the input root.

pub mod container;
pub mod local;

pub use container::ContainerBackend;
pub use local::LocalProcessBackend;

use crate::models::action_units::AuTableError;
use crate::models::AuTable;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Extraction backend errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Backend executable or container cannot be reached at all.
    /// Fatal to the owning session; other sessions continue.
    #[error("extraction backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend ran but exited non-zero. Frame-scoped.
    #[error("extraction failed (exit {code:?}): {stderr}")]
    BackendFailed { code: Option<i32>, stderr: String },

    /// Backend exited cleanly but produced no result file. Frame-scoped.
    #[error("backend produced no result file at {0}")]
    MissingResult(PathBuf),

    /// Result file exists but cannot be parsed. Frame-scoped.
    #[error("malformed backend output: {0}")]
    MalformedOutput(#[from] AuTableError),

    /// Extraction exceeded the configured bound. Frame-scoped.
    #[error("extraction timed out after {0:?}")]
    TimedOut(Duration),

    /// I/O error around the invocation. Frame-scoped.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Whether this error should terminate the owning session's worker
    /// rather than just dropping the frame.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ExtractionError::BackendUnavailable(_))
    }
}

/// Capability interface over the extraction strategies
#[async_trait]
pub trait FeatureExtraction: Send + Sync {
    /// Extract the per-image action-unit table for `image`.
    ///
    /// Implementations scope their temporary output directory to this call:
    /// created before the invocation, removed on every exit path.
    async fn extract(&self, image: &Path) -> Result<AuTable, ExtractionError>;
}

/// File stem of an image path, used to locate `<stem>.csv` in the backend's
/// output directory.
pub(crate) fn image_stem(image: &Path) -> Result<String, ExtractionError> {
    image
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .ok_or_else(|| {
            ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("image path has no usable file stem: {}", image.display()),
            ))
        })
}
