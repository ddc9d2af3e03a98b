use std::path::PathBuf;
use thiserror::Error;

/// `InvalidUrl`, `Fetch`, `Http` and `FileSystem` abort a run. The remaining
/// variants are logged by the unit of work that produced them and only show
/// up as CSS diagnostics or in the final report.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to fetch stylesheet {url}: {reason}")]
    StylesheetFetch { url: String, reason: String },

    #[error("Failed to resolve @import {url}: {reason}")]
    ImportResolution { url: String, reason: String },

    #[error("Failed to download asset {url}: {reason}")]
    AssetDownload { url: String, reason: String },

    #[error("File system error at {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MirrorError {
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::FileSystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
