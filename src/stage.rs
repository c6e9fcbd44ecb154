//! Placing an acquired artifact at the path the app loads it from.
//!
//! Any previous occupant of the destination is renamed to `<dest>.backup`
//! first. There is no rollback: if the copy fails after the backup was made,
//! the destination is left missing or truncated.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::acquire::{parent_dir, require_dir};
use crate::error::AcquireError;
use crate::Result;

pub const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub size: u64,
}

pub fn backup_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

pub fn stage_artifact(source: &Path, dest: &Path) -> Result<Staged> {
    require_dir(parent_dir(dest))?;

    if same_file(source, dest) {
        // Already in place; backing it up would move the only copy aside.
        debug!(path = %dest.display(), "artifact already at destination");
        let size = fs::metadata(dest).map_err(|e| AcquireError::io(dest, e))?.len();
        return Ok(Staged { path: dest.to_path_buf(), backup: None, size });
    }

    let backup = if dest.exists() {
        let backup = backup_path(dest);
        // rename does not replace an existing file on Windows
        if backup.exists() {
            fs::remove_file(&backup).map_err(|e| AcquireError::io(&backup, e))?;
        }
        info!(from = %dest.display(), to = %backup.display(), "backing up existing artifact");
        fs::rename(dest, &backup).map_err(|e| AcquireError::io(dest, e))?;
        Some(backup)
    } else {
        None
    };

    debug!(source = %source.display(), dest = %dest.display(), "copying artifact");
    fs::copy(source, dest).map_err(|e| AcquireError::io(dest, e))?;
    preserve_mtime(source, dest)?;

    let size = fs::metadata(dest).map_err(|e| AcquireError::io(dest, e))?.len();
    Ok(Staged { path: dest.to_path_buf(), backup, size })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// fs::copy keeps permissions; carry the modification time over as well.
fn preserve_mtime(source: &Path, dest: &Path) -> Result<()> {
    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| AcquireError::io(source, e))?;
    let file = fs::OpenOptions::new()
        .write(true)
        .open(dest)
        .map_err(|e| AcquireError::io(dest, e))?;
    file.set_modified(modified).map_err(|e| AcquireError::io(dest, e))
}
