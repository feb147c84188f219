//! Error types for tiling.

use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur while tiling a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilerError {
    /// Reading or writing a file failed.
    Io { path: PathBuf, message: String },
    /// An OBJ or MTL file could not be parsed.
    Parse {
        path: PathBuf,
        line: usize,
        detail: String,
    },
    /// The model has no geometry to tile.
    EmptyMesh { path: PathBuf },
    /// The tiler configuration is unusable.
    InvalidConfig { detail: String },
}

impl TilerError {
    pub(crate) fn io(path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for TilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Parse { path, line, detail } => {
                write!(f, "{}:{line}: {detail}", path.display())
            }
            Self::EmptyMesh { path } => write!(f, "{} has no faces", path.display()),
            Self::InvalidConfig { detail } => write!(f, "invalid configuration: {detail}"),
        }
    }
}

impl std::error::Error for TilerError {}

/// Result type for tiling operations.
pub type TilerResult<T> = Result<T, TilerError>;
