//! Errors reported by session operations.

use thiserror::Error;

use crate::detect::DetectError;
use crate::format::FormatError;
use crate::state::{CacheError, StoreError};
use crate::storage::StorageError;

/// Why a session operation did not happen.
///
/// Whatever the variant, the annotation list, scene metadata and category
/// registry are exactly as they were before the call.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation needs an open image
    #[error("No image loaded")]
    NoImage,

    /// Saving needs a save directory
    #[error("No save directory selected")]
    NoSaveDirectory,

    /// Update/delete needs a selected annotation
    #[error("No annotation selected")]
    NoSelection,

    /// A detection request is still pending
    #[error("Another operation is in progress")]
    OperationInProgress,

    /// Completion was reported but nothing was started
    #[error("No operation is pending")]
    NothingPending,

    /// Drawn box has zero width or height
    #[error("Box has zero area")]
    DegenerateBox,

    /// Stepping needs an opened folder
    #[error("Not browsing a folder")]
    NotInSequence,

    /// Document or category map could not be parsed or built
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Save directory or image folder failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Detector request failed
    #[error(transparent)]
    Detect(#[from] DetectError),

    /// Recovery cache failed on an explicit cache operation
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoSelection => SessionError::NoSelection,
            StoreError::DegenerateBox => SessionError::DegenerateBox,
        }
    }
}
