use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Trawler operations
#[derive(Error, Debug)]
pub enum TrawlerError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for Trawler operations
pub type Result<T> = std::result::Result<T, TrawlerError>;

impl TrawlerError {
    /// Wrap a file-open failure with the offending path
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrawlerError::Open {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        TrawlerError::Corrupt(msg.into())
    }
}
