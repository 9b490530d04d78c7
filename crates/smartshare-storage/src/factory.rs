#[cfg(feature = "storage-pending")]
use crate::PendingMarkerStorage;
#[cfg(feature = "storage-staging")]
use crate::StagingStorage;
use crate::{SharedStorage, StorageBackend, StorageError, StorageResult};
use smartshare_core::constants::STAGING_DIR;
use smartshare_core::PublishConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Create a storage backend based on configuration
///
/// Uses the configured backend when one is set, otherwise probes the storage root.
pub async fn create_storage(config: &PublishConfig) -> StorageResult<Arc<dyn SharedStorage>> {
    let backend = match config.storage_backend {
        Some(backend) => backend,
        None => detect_backend(&config.storage_root).await?,
    };

    tracing::info!(
        backend = %backend,
        root = %config.storage_root.display(),
        "Shared storage selected"
    );

    match backend {
        #[cfg(feature = "storage-pending")]
        StorageBackend::Pending => {
            let storage = PendingMarkerStorage::new(&config.storage_root).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-pending"))]
        StorageBackend::Pending => Err(StorageError::ConfigError(
            "Pending storage backend not available (storage-pending feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-staging")]
        StorageBackend::Staging => {
            let storage = StagingStorage::new(&config.storage_root).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-staging"))]
        StorageBackend::Staging => Err(StorageError::ConfigError(
            "Staging storage backend not available (storage-staging feature not enabled)"
                .to_string(),
        )),
    }
}

/// Pick a backend for `root` by probing for hard-link support.
///
/// Staging needs hard links inside the root; filesystems without them fall back to
/// pending markers.
pub async fn detect_backend(root: &Path) -> StorageResult<StorageBackend> {
    let probe_dir = root.join(STAGING_DIR);
    fs::create_dir_all(&probe_dir).await.map_err(|e| {
        StorageError::ConfigError(format!(
            "Failed to create storage directory {}: {}",
            probe_dir.display(),
            e
        ))
    })?;

    let id = Uuid::new_v4();
    let source = probe_dir.join(format!("{}.probe", id));
    let link = probe_dir.join(format!("{}.probe-link", id));

    fs::write(&source, b"").await.map_err(|e| {
        StorageError::ConfigError(format!(
            "Storage root {} is not writable: {}",
            root.display(),
            e
        ))
    })?;

    let linked = fs::hard_link(&source, &link).await;

    let _ = fs::remove_file(&link).await;
    let _ = fs::remove_file(&source).await;

    let backend = match linked {
        Ok(()) => StorageBackend::Staging,
        Err(e) => {
            tracing::debug!(
                error = %e,
                root = %root.display(),
                "Hard links unavailable, using pending markers"
            );
            StorageBackend::Pending
        }
    };

    Ok(backend)
}
