use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("toolkit package `{package}` is not available and could not be installed")]
    DependencyMissing { package: String },

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("no exported `{pattern}` file found in {}", .dir.display())]
    OutputNotFound { dir: PathBuf, pattern: String },

    #[error("{} is too small ({size} bytes, need at least {min} bytes)", .path.display())]
    Undersized { path: PathBuf, size: u64, min: u64 },

    #[error("fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("assets directory does not exist: {}", .0.display())]
    MissingAssetsDir(PathBuf),

    #[error("all {attempted} download sources failed")]
    SourcesExhausted { attempted: usize },

    #[error("i/o error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AcquireError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AcquireError::Io { path: path.into(), source }
    }
}
