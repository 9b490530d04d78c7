use crate::files::{collect_files, make_world_readable, remove_if_exists, sync_file};
use crate::keys::{
    candidate_name, collection_dir, entry_path_for_marker, is_pending_marker,
    pending_marker_path, relative_path, sanitize_display_name, MAX_NAME_ATTEMPTS,
};
use crate::traits::{
    EntryWriter, ListScope, NewEntry, SharedStorage, StorageError, StorageResult, StoredEntry,
};
use crate::StorageBackend;
use async_trait::async_trait;
use smartshare_core::{PublishRecord, TargetRef};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Shared storage that writes entries into a hidden marker file beside their public name.
///
/// A pending entry's bytes live in `.{name}.pending` in the destination directory, so
/// the public name never exists until `finalize` renames the marker onto it. Works on
/// filesystems without hard links; the rename is the commit point.
#[derive(Clone)]
pub struct PendingMarkerStorage {
    root: PathBuf,
}

impl PendingMarkerStorage {
    /// Create a new PendingMarkerStorage instance
    ///
    /// # Arguments
    /// * `root` - Root directory of the shared media collections
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(PendingMarkerStorage { root })
    }

    /// Claim a unique name in `dir` by creating its marker with `create_new`.
    ///
    /// A candidate is free when neither its marker nor its public file exists.
    /// Returns the marker path.
    async fn claim_entry(&self, dir: &Path, display_name: &str) -> StorageResult<PathBuf> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let public = dir.join(candidate_name(display_name, attempt));
            let marker = pending_marker_path(&public);

            match create_new(&marker).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CreateFailed(format!(
                        "Failed to create pending marker {}: {}",
                        marker.display(),
                        e
                    )))
                }
            }

            match fs::try_exists(&public).await {
                Ok(false) => return Ok(marker),
                Ok(true) => {
                    let _ = remove_if_exists(&marker).await;
                }
                Err(e) => {
                    let _ = remove_if_exists(&marker).await;
                    return Err(StorageError::CreateFailed(format!(
                        "Failed to check {}: {}",
                        public.display(),
                        e
                    )));
                }
            }
        }

        Err(StorageError::CreateFailed(format!(
            "No free name for {} in {}",
            display_name,
            dir.display()
        )))
    }

    fn target_for(&self, path: &Path) -> TargetRef {
        TargetRef::new(path, relative_path(&self.root, path))
    }
}

async fn create_new(path: &Path) -> io::Result<()> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map(|_| ())
}

#[async_trait]
impl SharedStorage for PendingMarkerStorage {
    async fn create_entry(&self, entry: &NewEntry) -> StorageResult<PublishRecord> {
        let dir = collection_dir(&self.root, entry.category, &entry.subfolder)?;
        let display_name = sanitize_display_name(&entry.display_name);

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::CreateFailed(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let marker = self.claim_entry(&dir, &display_name).await?;

        tracing::debug!(
            path = %marker.display(),
            mime = %entry.mime_type,
            "Pending entry created"
        );

        Ok(PublishRecord {
            id: Uuid::new_v4(),
            category: entry.category,
            display_name,
            mime_type: entry.mime_type.clone(),
            subfolder: entry.subfolder.clone(),
            pending: true,
            entry_path: marker,
        })
    }

    async fn open_writer(&self, record: &PublishRecord) -> StorageResult<EntryWriter> {
        if !record.pending {
            return Err(StorageError::WriteFailed(format!(
                "Entry {} is already visible",
                record.entry_path.display()
            )));
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&record.entry_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    StorageError::NotFound(record.entry_path.display().to_string())
                }
                _ => StorageError::WriteFailed(format!(
                    "Failed to open entry {}: {}",
                    record.entry_path.display(),
                    e
                )),
            })?;

        Ok(Box::pin(file))
    }

    async fn finalize(&self, record: &mut PublishRecord) -> StorageResult<TargetRef> {
        if !record.pending {
            return Ok(self.target_for(&record.entry_path));
        }

        let start = std::time::Instant::now();
        let marker = record.entry_path.clone();
        let public = entry_path_for_marker(&marker).ok_or_else(|| {
            StorageError::FinalizeFailed(format!("Not a pending marker: {}", marker.display()))
        })?;

        sync_file(&marker).await.map_err(|e| {
            StorageError::FinalizeFailed(format!(
                "Failed to sync entry {}: {}",
                marker.display(),
                e
            ))
        })?;

        // rename replaces an existing file, so a name taken since the claim aborts the commit.
        match fs::try_exists(&public).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(StorageError::FinalizeFailed(format!(
                    "{} was created by another writer before commit",
                    public.display()
                )))
            }
            Err(e) => {
                return Err(StorageError::FinalizeFailed(format!(
                    "Failed to check {}: {}",
                    public.display(),
                    e
                )))
            }
        }

        fs::rename(&marker, &public).await.map_err(|e| {
            StorageError::FinalizeFailed(format!(
                "Failed to commit {} to {}: {}",
                marker.display(),
                public.display(),
                e
            ))
        })?;

        record.pending = false;
        record.entry_path = public;
        let target = self.target_for(&record.entry_path);

        tracing::info!(
            path = %record.entry_path.display(),
            key = %target.relative_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pending entry finalized"
        );

        Ok(target)
    }

    async fn delete_entry(&self, record: &PublishRecord) -> StorageResult<()> {
        let removed = remove_if_exists(&record.entry_path).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete entry {}: {}",
                record.entry_path.display(),
                e
            ))
        })?;

        if removed {
            tracing::info!(
                path = %record.entry_path.display(),
                pending = record.pending,
                "Entry deleted"
            );
        }

        Ok(())
    }

    async fn list_entries(&self, scope: ListScope) -> StorageResult<Vec<StoredEntry>> {
        let mut entries = Vec::new();

        for path in collect_files(&self.root, false).await? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let pending = is_pending_marker(&name);
            let public = if pending {
                if scope == ListScope::Visible {
                    continue;
                }
                match entry_path_for_marker(&path) {
                    Some(public) => public,
                    None => continue,
                }
            } else if name.starts_with('.') {
                continue;
            } else {
                path.clone()
            };

            let size_bytes = match fs::metadata(&path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::IoError(e)),
            };

            entries.push(StoredEntry {
                relative_path: relative_path(&self.root, &public),
                path,
                size_bytes,
                pending,
            });
        }

        Ok(entries)
    }

    async fn grant_read(&self, target: &TargetRef) -> StorageResult<()> {
        let name = target
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_pending_marker(&name) {
            return Err(StorageError::InvalidKey(format!(
                "Entry {} is still pending",
                target.relative_path
            )));
        }

        match fs::metadata(&target.path).await {
            Ok(_) => make_world_readable(&target.path).await,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(
                format!("Entry {} is not published", target.relative_path),
            )),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Pending
    }

    fn supports_pending(&self) -> bool {
        true
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(all(test, feature = "storage-pending"))]
mod tests {
    use super::*;
    use smartshare_core::MediaCategory;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    fn image_entry(name: &str) -> NewEntry {
        NewEntry {
            display_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            category: MediaCategory::Image,
            subfolder: "AppExports".to_string(),
        }
    }

    async fn write_all(storage: &PendingMarkerStorage, record: &PublishRecord, data: &[u8]) {
        let mut writer = storage.open_writer(record).await.unwrap();
        writer.write_all(data).await.unwrap();
        writer.shutdown().await.unwrap();
    }

    fn public_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_pending_entry_hidden_until_finalized() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();
        let public_dir = dir.path().join("Pictures/AppExports");

        let mut record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        assert!(record.pending);
        assert!(record.entry_path.ends_with(".photo.jpg.pending"));
        write_all(&storage, &record, b"jpeg bytes").await;

        assert!(public_names(&public_dir).is_empty());
        assert!(!public_dir.join("photo.jpg").exists());
        assert!(storage.list_entries(ListScope::Visible).await.unwrap().is_empty());
        let all = storage.list_entries(ListScope::All).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].pending);
        assert_eq!(all[0].relative_path, "Pictures/AppExports/photo.jpg");

        let target = storage.finalize(&mut record).await.unwrap();
        assert!(!record.pending);
        assert_eq!(record.entry_path, target.path);
        assert_eq!(target.relative_path, "Pictures/AppExports/photo.jpg");
        assert_eq!(public_names(&public_dir), vec!["photo.jpg".to_string()]);
        assert!(!fs::try_exists(pending_marker_path(&target.path)).await.unwrap());

        let visible = storage.list_entries(ListScope::Visible).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].size_bytes, 10);
        assert_eq!(fs::read(&target.path).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_name_collision_gets_suffix() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let first = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        let second = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();

        assert!(first.entry_path.ends_with(".photo.jpg.pending"));
        assert!(second.entry_path.ends_with(".photo (1).jpg.pending"));
    }

    #[tokio::test]
    async fn test_existing_public_file_is_never_replaced() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();
        let public_dir = dir.path().join("Pictures/AppExports");
        fs::create_dir_all(&public_dir).await.unwrap();
        fs::write(public_dir.join("photo.jpg"), b"existing").await.unwrap();

        let mut record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        write_all(&storage, &record, b"new").await;
        let target = storage.finalize(&mut record).await.unwrap();

        assert_eq!(target.relative_path, "Pictures/AppExports/photo (1).jpg");
        assert_eq!(fs::read(public_dir.join("photo.jpg")).await.unwrap(), b"existing");
    }

    #[tokio::test]
    async fn test_name_taken_after_claim_aborts_commit() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let mut record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        write_all(&storage, &record, b"ours").await;
        let public = dir.path().join("Pictures/AppExports/photo.jpg");
        fs::write(&public, b"theirs").await.unwrap();

        let result = storage.finalize(&mut record).await;
        assert!(matches!(result, Err(StorageError::FinalizeFailed(_))));
        assert!(record.pending);
        assert_eq!(fs::read(&public).await.unwrap(), b"theirs");

        storage.delete_entry(&record).await.unwrap();
        let all = storage.list_entries(ListScope::All).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].pending);
    }

    #[tokio::test]
    async fn test_delete_entry_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        write_all(&storage, &record, b"partial").await;

        storage.delete_entry(&record).await.unwrap();
        storage.delete_entry(&record).await.unwrap();

        assert!(storage.list_entries(ListScope::All).await.unwrap().is_empty());
        assert!(!fs::try_exists(&record.entry_path).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_committed_entry() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let mut record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        write_all(&storage, &record, b"data").await;
        storage.finalize(&mut record).await.unwrap();

        storage.delete_entry(&record).await.unwrap();
        assert!(storage.list_entries(ListScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_category_rejected() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let entry = NewEntry {
            category: MediaCategory::Unsupported,
            mime_type: "application/pdf".to_string(),
            ..image_entry("doc.pdf")
        };
        let result = storage.create_entry(&entry).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(storage.list_entries(ListScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_read_rejects_pending_entry() {
        let dir = tempdir().unwrap();
        let storage = PendingMarkerStorage::new(dir.path()).await.unwrap();

        let mut record = storage.create_entry(&image_entry("photo.jpg")).await.unwrap();
        let marker_target = TargetRef::new(
            &record.entry_path,
            relative_path(dir.path(), &record.entry_path),
        );
        assert!(matches!(
            storage.grant_read(&marker_target).await,
            Err(StorageError::InvalidKey(_))
        ));

        let public = dir.path().join("Pictures/AppExports/photo.jpg");
        let unpublished = TargetRef::new(&public, "Pictures/AppExports/photo.jpg");
        assert!(matches!(
            storage.grant_read(&unpublished).await,
            Err(StorageError::NotFound(_))
        ));

        write_all(&storage, &record, b"data").await;
        let target = storage.finalize(&mut record).await.unwrap();
        storage.grant_read(&target).await.unwrap();
    }
}
