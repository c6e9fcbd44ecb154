use std::path::{Path, PathBuf};

use crate::error::AcquireError;
use crate::Result;

pub mod download;
pub mod toolkit;

pub const MIB: u64 = 1024 * 1024;

/// Exports smaller than this are treated as a failed conversion.
pub const MIN_EXPORT_BYTES: u64 = MIB;

/// A downloaded file must be strictly larger than this to count.
pub const MIN_DOWNLOAD_BYTES: u64 = 4 * MIB;

/// A model file sitting on local disk, not yet staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

impl Artifact {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)
            .map_err(|e| AcquireError::io(&path, e))?
            .len();
        Ok(Self { path, size })
    }
}

/// Directory `path` lives in; `.` for bare file names.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

pub(crate) fn require_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(AcquireError::MissingAssetsDir(dir.to_path_buf()))
    }
}
