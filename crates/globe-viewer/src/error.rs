//! Error types for the globe viewer.

use std::fmt;
use std::path::PathBuf;

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Errors that can occur while mounting the viewer, loading catalogs,
/// or checking for updates.
#[derive(Debug)]
pub enum ViewerError {
    /// No primary window exists to mount the viewer into.
    MissingMountPoint,
    /// The mount point has no drawable area.
    EmptyMountPoint {
        /// Logical width of the mount point.
        width: f32,
        /// Logical height of the mount point.
        height: f32,
    },
    /// A catalog file could not be read.
    CatalogIo {
        /// The catalog file path.
        path: PathBuf,
        /// The error message.
        message: String,
    },
    /// A catalog file could not be parsed.
    CatalogParse {
        /// The catalog file path.
        path: PathBuf,
        /// The error message.
        message: String,
    },
    /// A catalog failed validation.
    InvalidCatalog {
        /// Description of what was invalid.
        detail: String,
    },
    /// The update check request failed.
    UpdateCheck {
        /// The manifest URL.
        url: String,
        /// The error message.
        message: String,
    },
    /// A version string could not be parsed.
    InvalidVersion {
        /// The offending version string.
        version: String,
    },
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::MissingMountPoint => write!(f, "no primary window to mount the viewer"),
            ViewerError::EmptyMountPoint { width, height } => {
                write!(f, "mount point has no drawable area ({width}x{height})")
            }
            ViewerError::CatalogIo { path, message } => {
                write!(f, "failed to read catalog {}: {message}", path.display())
            }
            ViewerError::CatalogParse { path, message } => {
                write!(f, "failed to parse catalog {}: {message}", path.display())
            }
            ViewerError::InvalidCatalog { detail } => write!(f, "invalid catalog: {detail}"),
            ViewerError::UpdateCheck { url, message } => {
                write!(f, "update check against {url} failed: {message}")
            }
            ViewerError::InvalidVersion { version } => {
                write!(f, "invalid version string '{version}'")
            }
        }
    }
}

impl std::error::Error for ViewerError {}
