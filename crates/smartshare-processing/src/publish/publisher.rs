use futures::FutureExt;
use smartshare_core::{MediaBlob, MediaCategory, PublishError, PublishRecord, TargetRef};
use smartshare_storage::{NewEntry, SharedStorage, StorageError, StorageResult};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Writes one item into shared storage with the two-phase entry protocol.
///
/// On return either nothing was left behind or exactly one visible, fully written entry
/// exists. Every call creates a new entry.
#[derive(Clone)]
pub struct SharedStoragePublisher {
    storage: Arc<dyn SharedStorage>,
    transfer_timeout: Option<Duration>,
}

impl SharedStoragePublisher {
    pub fn new(storage: Arc<dyn SharedStorage>) -> Self {
        Self {
            storage,
            transfer_timeout: None,
        }
    }

    /// Bound the byte transfer of each publish. `None` or zero disables the bound.
    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    pub fn storage(&self) -> &Arc<dyn SharedStorage> {
        &self.storage
    }

    /// Publish a byte stream as `display_name` into `subfolder`.
    pub async fn publish<R>(
        &self,
        display_name: &str,
        mime_type: &str,
        mut source: R,
        subfolder: &str,
    ) -> Result<TargetRef, PublishError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let category = MediaCategory::from_mime(mime_type);
        if category == MediaCategory::Unsupported {
            return Err(PublishError::UnsupportedMediaKind(mime_type.to_string()));
        }

        let start = Instant::now();
        let entry = NewEntry {
            display_name: display_name.to_string(),
            mime_type: mime_type.to_string(),
            category,
            subfolder: subfolder.to_string(),
        };

        let mut record = self
            .storage
            .create_entry(&entry)
            .await
            .map_err(|e| PublishError::StorageEntryCreationFailed(e.to_string()))?;

        // A panic past this point still rolls the entry back.
        let committed = AssertUnwindSafe(self.commit(&mut record, &mut source))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err("publish panicked before commit".to_string()));

        let (target, transferred) = match committed {
            Ok(done) => done,
            Err(reason) => {
                self.rollback(&record).await;
                return Err(PublishError::TransferFailed(reason));
            }
        };

        tracing::info!(
            display_name = %record.display_name,
            mime = %record.mime_type,
            key = %target.relative_path,
            size_bytes = transferred,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media published"
        );

        Ok(target)
    }

    /// Publish an in-memory blob.
    pub async fn publish_blob(
        &self,
        display_name: &str,
        blob: MediaBlob,
        subfolder: &str,
    ) -> Result<TargetRef, PublishError> {
        let MediaBlob { bytes, mime_type } = blob;
        self.publish(display_name, &mime_type, &bytes[..], subfolder)
            .await
    }

    async fn commit<R>(
        &self,
        record: &mut PublishRecord,
        source: &mut R,
    ) -> Result<(TargetRef, u64), String>
    where
        R: AsyncRead + Unpin + Send,
    {
        let transferred = self.transfer(record, source).await?;
        let target = self
            .storage
            .finalize(record)
            .await
            .map_err(|e| e.to_string())?;
        Ok((target, transferred))
    }

    async fn transfer<R>(&self, record: &PublishRecord, source: &mut R) -> Result<u64, String>
    where
        R: AsyncRead + Unpin + Send,
    {
        let copy = async {
            let mut writer = self.storage.open_writer(record).await?;
            let n = tokio::io::copy(source, &mut writer).await?;
            writer.shutdown().await?;
            StorageResult::Ok(n)
        };

        let result: Result<u64, StorageError> = match self.transfer_timeout {
            Some(limit) => match tokio::time::timeout(limit, copy).await {
                Ok(result) => result,
                Err(_) => return Err(format!("transfer timed out after {:?}", limit)),
            },
            None => copy.await,
        };

        result.map_err(|e| e.to_string())
    }

    async fn rollback(&self, record: &PublishRecord) {
        if let Err(e) = self.storage.delete_entry(record).await {
            tracing::warn!(
                error = %e,
                path = %record.entry_path.display(),
                "Rollback failed to delete entry"
            );
        }
    }
}
