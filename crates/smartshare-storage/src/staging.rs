use crate::files::{collect_files, make_world_readable, remove_if_exists, sync_file};
use crate::keys::{
    candidate_name, collection_dir, is_pending_marker, relative_path, sanitize_display_name,
    MAX_NAME_ATTEMPTS,
};
use crate::traits::{
    EntryWriter, ListScope, NewEntry, SharedStorage, StorageError, StorageResult, StoredEntry,
};
use crate::StorageBackend;
use async_trait::async_trait;
use smartshare_core::constants::STAGING_DIR;
use smartshare_core::{PublishRecord, TargetRef};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Shared storage that stages entries outside the public tree.
///
/// Pending entries live at `{root}/.staging/{id}.part`. Finalizing hard-links the staged
/// file to a free public name, so the public path appears complete or not at all.
#[derive(Clone)]
pub struct StagingStorage {
    root: PathBuf,
    staging_dir: PathBuf,
}

impl StagingStorage {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let staging_dir = root.join(STAGING_DIR);

        fs::create_dir_all(&staging_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create staging directory {}: {}",
                staging_dir.display(),
                e
            ))
        })?;

        Ok(StagingStorage { root, staging_dir })
    }

    fn is_staged(&self, path: &Path) -> bool {
        path.starts_with(&self.staging_dir)
    }

    /// Link `staged` to the first free candidate name in `dir`. Never overwrites.
    async fn link_public(
        &self,
        staged: &Path,
        dir: &Path,
        display_name: &str,
    ) -> StorageResult<PathBuf> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = dir.join(candidate_name(display_name, attempt));
            match fs::hard_link(staged, &candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::FinalizeFailed(format!(
                        "Failed to link {} to {}: {}",
                        staged.display(),
                        candidate.display(),
                        e
                    )))
                }
            }
        }

        Err(StorageError::FinalizeFailed(format!(
            "No free name for {} in {}",
            display_name,
            dir.display()
        )))
    }
}

#[async_trait]
impl SharedStorage for StagingStorage {
    async fn create_entry(&self, entry: &NewEntry) -> StorageResult<PublishRecord> {
        // Validate the destination now so a bad subfolder fails before any bytes move.
        collection_dir(&self.root, entry.category, &entry.subfolder)?;

        let id = Uuid::new_v4();
        let staged = self.staging_dir.join(format!("{}.part", id));

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .await
            .map_err(|e| {
                StorageError::CreateFailed(format!(
                    "Failed to create staging file {}: {}",
                    staged.display(),
                    e
                ))
            })?;

        tracing::debug!(
            path = %staged.display(),
            mime = %entry.mime_type,
            "Staged entry created"
        );

        Ok(PublishRecord {
            id,
            category: entry.category,
            display_name: sanitize_display_name(&entry.display_name),
            mime_type: entry.mime_type.clone(),
            subfolder: entry.subfolder.clone(),
            pending: true,
            entry_path: staged,
        })
    }

    async fn open_writer(&self, record: &PublishRecord) -> StorageResult<EntryWriter> {
        if !record.pending || !self.is_staged(&record.entry_path) {
            return Err(StorageError::WriteFailed(format!(
                "Entry {} is not staged",
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
                    "Failed to open staging file {}: {}",
                    record.entry_path.display(),
                    e
                )),
            })?;

        Ok(Box::pin(file))
    }

    async fn finalize(&self, record: &mut PublishRecord) -> StorageResult<TargetRef> {
        if !record.pending {
            return Ok(TargetRef::new(
                &record.entry_path,
                relative_path(&self.root, &record.entry_path),
            ));
        }

        let start = std::time::Instant::now();
        let staged = record.entry_path.clone();

        sync_file(&staged).await.map_err(|e| {
            StorageError::FinalizeFailed(format!(
                "Failed to sync staging file {}: {}",
                staged.display(),
                e
            ))
        })?;

        let dir = collection_dir(&self.root, record.category, &record.subfolder)?;
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::FinalizeFailed(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let public = self.link_public(&staged, &dir, &record.display_name).await?;

        record.pending = false;
        record.entry_path = public.clone();

        if let Err(e) = remove_if_exists(&staged).await {
            tracing::warn!(
                error = %e,
                path = %staged.display(),
                "Failed to remove staging file after commit"
            );
        }

        let target = TargetRef::new(&public, relative_path(&self.root, &public));

        tracing::info!(
            path = %public.display(),
            key = %target.relative_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged entry committed"
        );

        Ok(target)
    }

    async fn delete_entry(&self, record: &PublishRecord) -> StorageResult<()> {
        let removed = remove_if_exists(&record.entry_path).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
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
        let include_staged = scope == ListScope::All;
        let mut entries = Vec::new();

        for path in collect_files(&self.root, include_staged).await? {
            let pending = self.is_staged(&path);
            if !pending {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if is_pending_marker(&name) {
                    continue;
                }
            }

            let size_bytes = match fs::metadata(&path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::IoError(e)),
            };

            entries.push(StoredEntry {
                relative_path: relative_path(&self.root, &path),
                path,
                size_bytes,
                pending,
            });
        }

        Ok(entries)
    }

    async fn grant_read(&self, target: &TargetRef) -> StorageResult<()> {
        if self.is_staged(&target.path) {
            return Err(StorageError::InvalidKey(format!(
                "Entry {} is still staged",
                target.relative_path
            )));
        }
        make_world_readable(&target.path).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Staging
    }

    fn supports_pending(&self) -> bool {
        false
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
