//! Cache-related error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the store layer and cache constructors.
///
/// Public cache operations never surface these: `TieredCache` degrades every
/// store failure to a logged miss or no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache directory could not be created.
    #[error("failed to create cache directory {}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while touching the disk tier.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encode or decode failed.
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;
