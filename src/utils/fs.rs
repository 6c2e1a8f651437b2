//! File helpers

use crate::Result;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` through a sibling temporary file and a rename
///
/// The parent directory is created when missing. A reader never observes a
/// partially written file: it sees either the previous content or the new one.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(path);
    tokio::fs::write(&temp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
