//! Batch orchestration: resolve, compress and publish every picked item, then share.

use chrono::Utc;
use futures::future::join_all;
use smartshare_core::constants::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY};
use smartshare_core::{
    BatchReport, ErrorMetadata, ItemOutcome, LogLevel, MediaCategory, MediaReference,
    PublishConfig, PublishError, PublishedMedia, Quality,
};
use smartshare_storage::SharedStorage;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::publisher::SharedStoragePublisher;
use super::share::ShareSink;
use crate::compression::{default_compressor, Compressor};
use crate::resolver::{FileResolver, ReferenceResolver};

/// Per-request publish options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub subfolder: String,
    pub quality: Quality,
}

impl BatchOptions {
    pub fn new(subfolder: impl Into<String>, quality: i64) -> Self {
        Self {
            subfolder: subfolder.into(),
            quality: Quality::clamped(quality),
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            subfolder: config.subfolder.clone(),
            quality: config.quality,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&PublishConfig::default())
    }
}

/// The per-item stages, shared by every item task of a batch.
struct ItemPipeline {
    resolver: Arc<dyn ReferenceResolver>,
    compressor: Arc<dyn Compressor>,
    publisher: SharedStoragePublisher,
}

impl ItemPipeline {
    async fn run(
        &self,
        reference: &MediaReference,
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<PublishedMedia, PublishError> {
        let (item, blob) = self.resolver.resolve(reference).await?;

        let category = item.category();
        if category == MediaCategory::Unsupported {
            return Err(PublishError::UnsupportedMediaKind(item.mime_type));
        }

        let original_size_bytes = blob.len() as u64;
        let compressed = self
            .compressor
            .compress(blob, options.quality)
            .await
            .map_err(|e| PublishError::CompressionFailed(e.to_string()))?;
        let size_bytes = compressed.len() as u64;
        let mime_type = compressed.mime_type.clone();

        // Last point at which an item can be skipped; past here it commits or rolls back.
        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let target = self
            .publisher
            .publish_blob(&item.display_name, compressed, &options.subfolder)
            .await?;

        Ok(PublishedMedia {
            display_name: target_display_name(&target.path, &item.display_name),
            target,
            mime_type,
            category,
            size_bytes,
            original_size_bytes,
            published_at: Utc::now(),
        })
    }
}

fn target_display_name(path: &std::path::Path, fallback: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

/// Publishes batches of picked items into shared storage.
///
/// Every item runs in its own task, bounded by `max_concurrency`. One item failing never
/// aborts the others, and results always come back in input order.
#[derive(Clone)]
pub struct BatchPublisher {
    pipeline: Arc<ItemPipeline>,
    max_batch_size: usize,
    max_concurrency: usize,
    share_target: Option<String>,
}

impl BatchPublisher {
    pub fn new(
        resolver: Arc<dyn ReferenceResolver>,
        compressor: Arc<dyn Compressor>,
        publisher: SharedStoragePublisher,
    ) -> Self {
        Self {
            pipeline: Arc::new(ItemPipeline {
                resolver,
                compressor,
                publisher,
            }),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            share_target: None,
        }
    }

    /// File resolver, default compressor and the configured limits.
    pub fn from_config(config: &PublishConfig, storage: Arc<dyn SharedStorage>) -> Self {
        let publisher =
            SharedStoragePublisher::new(storage).with_transfer_timeout(config.transfer_timeout);

        Self::new(Arc::new(FileResolver::new()), default_compressor(), publisher)
            .with_max_batch_size(config.max_batch_size)
            .with_max_concurrency(config.max_concurrency)
            .with_share_target(config.share_target.clone())
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_share_target(mut self, share_target: Option<String>) -> Self {
        self.share_target = share_target;
        self
    }

    pub fn storage(&self) -> &Arc<dyn SharedStorage> {
        self.pipeline.publisher.storage()
    }

    /// Publish every reference and return the survivors in input order.
    ///
    /// Failed items are dropped from the result; each is logged once, at its error's level.
    pub async fn publish_all(
        &self,
        references: &[MediaReference],
        options: &BatchOptions,
    ) -> Result<Vec<PublishedMedia>, PublishError> {
        let report = self
            .publish_all_detailed(references, options, &CancellationToken::new())
            .await?;

        Ok(report.into_published())
    }

    /// Publish every reference and return one outcome per input, in input order.
    ///
    /// Cancelling `cancel` skips items that have not started publishing; items already
    /// writing run to commit or rollback. Dropping the returned future has the same
    /// effect on in-flight items, since they run in detached tasks.
    pub async fn publish_all_detailed(
        &self,
        references: &[MediaReference],
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PublishError> {
        if references.is_empty() {
            return Ok(BatchReport::default());
        }

        if references.len() > self.max_batch_size {
            return Err(PublishError::BatchTooLarge {
                size: references.len(),
                max: self.max_batch_size,
            });
        }

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let handles: Vec<_> = references
            .iter()
            .cloned()
            .map(|reference| {
                let pipeline = self.pipeline.clone();
                let semaphore = semaphore.clone();
                let options = options.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let _permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(PublishError::Cancelled),
                        permit = semaphore.acquire_owned() => {
                            permit.map_err(|_| PublishError::Cancelled)?
                        }
                    };
                    pipeline.run(&reference, &options, &cancel).await
                })
            })
            .collect();

        let results = join_all(handles).await;

        let outcomes: Vec<ItemOutcome> = references
            .iter()
            .zip(results)
            .enumerate()
            .map(|(index, (reference, joined))| {
                // The publisher rolls back its own panics, so a failed task never owns an entry.
                let result = joined.unwrap_or_else(|e| {
                    Err(PublishError::TransferFailed(format!(
                        "publish task failed: {}",
                        e
                    )))
                });

                if let Err(error) = &result {
                    log_item_failure(index, reference, error);
                }

                ItemOutcome {
                    index,
                    reference: reference.clone(),
                    result,
                }
            })
            .collect();

        let report = BatchReport::new(outcomes);

        tracing::info!(
            subfolder = %options.subfolder,
            quality = options.quality.value(),
            total = report.len(),
            published = report.published().count(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch publish finished"
        );

        Ok(report)
    }

    /// Publish the batch, then hand the published targets to `sink`.
    ///
    /// Read access is granted on every target first. The sink is not called when nothing
    /// was published, and its failures are logged rather than returned.
    pub async fn publish_and_share(
        &self,
        references: &[MediaReference],
        options: &BatchOptions,
        sink: &dyn ShareSink,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PublishError> {
        let report = self
            .publish_all_detailed(references, options, cancel)
            .await?;

        let targets = report.targets();
        let Some(hint) = report.share_hint(self.share_target.clone()) else {
            tracing::debug!("Nothing published, skipping share");
            return Ok(report);
        };

        for target in &targets {
            if let Err(e) = self.storage().grant_read(target).await {
                tracing::warn!(
                    error = %e,
                    key = %target.relative_path,
                    "Failed to grant read access"
                );
            }
        }

        match sink.share(&targets, &hint).await {
            Ok(()) => tracing::info!(
                count = targets.len(),
                mime = %hint.mime,
                "Published media handed to share target"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                count = targets.len(),
                "Share hand-off failed"
            ),
        }

        Ok(report)
    }
}

fn log_item_failure(index: usize, reference: &MediaReference, error: &PublishError) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            index,
            reference = %reference,
            error = %error,
            "Batch item skipped"
        ),
        LogLevel::Warn => tracing::warn!(
            index,
            reference = %reference,
            error = %error,
            error_code = error.error_code(),
            "Batch item failed"
        ),
        LogLevel::Error => tracing::error!(
            index,
            reference = %reference,
            error = %error,
            error_code = error.error_code(),
            "Batch item failed"
        ),
    }
}
