//! Shared path layout for storage backends.
//!
//! Public layout: `{root}/{collection}/{subfolder}/{display name}` where the collection
//! is chosen from the media category. All backends use these helpers so listings agree.

use smartshare_core::constants::{PENDING_MARKER_SUFFIX, UNNAMED_FILE};
use smartshare_core::MediaCategory;
use std::path::{Component, Path, PathBuf};

use crate::traits::{StorageError, StorageResult};

/// How many `name (n).ext` candidates are tried before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 1000;

const MAX_NAME_LEN: usize = 255;

/// Public directory for a category and subfolder.
pub fn collection_dir(
    root: &Path,
    category: MediaCategory,
    subfolder: &str,
) -> StorageResult<PathBuf> {
    let collection = category.collection().ok_or_else(|| {
        StorageError::InvalidKey(format!("No collection for category {}", category))
    })?;

    smartshare_core::config::validate_subfolder(subfolder)
        .map_err(|e| StorageError::InvalidKey(e.to_string()))?;

    let subfolder = Path::new(subfolder.trim());
    if subfolder
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(format!(
            "Subfolder resolves outside its collection: {}",
            subfolder.display()
        )));
    }

    Ok(root.join(collection).join(subfolder))
}

/// Reduce a display name to a single safe path component.
pub fn sanitize_display_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim().to_string();

    if cleaned.is_empty() {
        UNNAMED_FILE.to_string()
    } else {
        cleaned
    }
}

/// Candidate name for the given attempt: `photo.jpg`, `photo (1).jpg`, `photo (2).jpg`, ...
pub fn candidate_name(display_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return display_name.to_string();
    }

    match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", display_name, attempt),
    }
}

/// Hidden marker that keeps `entry` pending: `{dir}/.{name}.pending`.
pub fn pending_marker_path(entry: &Path) -> PathBuf {
    let name = entry
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    entry.with_file_name(format!(".{}{}", name, PENDING_MARKER_SUFFIX))
}

/// Whether a file name is a pending marker.
pub fn is_pending_marker(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(PENDING_MARKER_SUFFIX)
}

/// Public path a pending marker commits to: `{dir}/.{name}.pending` -> `{dir}/{name}`.
pub fn entry_path_for_marker(marker: &Path) -> Option<PathBuf> {
    let name = marker.file_name()?.to_str()?;
    let public = name
        .strip_prefix('.')?
        .strip_suffix(PENDING_MARKER_SUFFIX)
        .filter(|n| !n.is_empty())?;
    Some(marker.with_file_name(public))
}

/// Path relative to `root`, `/`-separated.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
