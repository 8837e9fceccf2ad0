//! Error type shared by the library modules

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },
    #[error("image error on {path}: {source}", path = path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no images to build a mosaic from in {}", .0.display())]
    EmptyMosaic(PathBuf),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("invalid series pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot add images to {0} after its HTML has been written")]
    ClosedContainer(String),
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
