//! Filesystem helpers shared by the backends.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::traits::{StorageError, StorageResult};

/// Recursively collect regular files under `dir`.
///
/// Hidden directories (`.staging`) are only descended into when `include_hidden_dirs`
/// is set. Hidden files are always returned; callers decide what they mean.
pub async fn collect_files(dir: &Path, include_hidden_dirs: bool) -> StorageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending_dirs = vec![dir.to_path_buf()];

    while let Some(current) = pending_dirs.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::IoError(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');

            if file_type.is_dir() {
                if !hidden || include_hidden_dirs {
                    pending_dirs.push(entry.path());
                }
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Remove a file, treating "already gone" as success. Returns whether a file was removed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Flush file contents to disk.
pub async fn sync_file(path: &Path) -> io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path).await?;
    file.sync_all().await
}

/// Make a file readable by everyone (owner keeps write access).
pub async fn make_world_readable(path: &Path) -> StorageResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
    }

    #[cfg(not(unix))]
    {
        let metadata = fs::metadata(path).await?;
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions).await?;
        }
    }

    Ok(())
}
