//! Configuration module
//!
//! Publish settings are read from the environment (and a `.env` file when present).
//! Only the subfolder, the quality and the batch cap shape the pipeline itself; the rest
//! selects and bounds the storage backend.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_QUALITY, DEFAULT_SUBFOLDER,
};
use crate::models::Quality;
use crate::storage_types::StorageBackend;

/// Publish pipeline configuration
#[derive(Clone, Debug)]
pub struct PublishConfig {
    pub subfolder: String,
    pub quality: Quality,
    pub max_batch_size: usize,
    pub max_concurrency: usize,
    /// Upper bound on one item's byte transfer. `None` disables the bound.
    pub transfer_timeout: Option<Duration>,
    pub storage_root: PathBuf,
    /// Explicit backend; `None` means detect at startup.
    pub storage_backend: Option<StorageBackend>,
    /// Optional application id passed along with the share hint.
    pub share_target: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            subfolder: DEFAULT_SUBFOLDER.to_string(),
            quality: Quality::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            transfer_timeout: None,
            storage_root: default_storage_root(),
            storage_backend: None,
            share_target: None,
        }
    }
}

fn default_storage_root() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join("SharedMedia"))
        .unwrap_or_else(|_| PathBuf::from("./shared-media"))
}

impl PublishConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let quality = env::var("SMARTSHARE_QUALITY")
            .ok()
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow::anyhow!("SMARTSHARE_QUALITY must be an integer"))
            })
            .transpose()?
            .map(Quality::clamped)
            .unwrap_or_else(|| Quality::clamped(DEFAULT_QUALITY as i64));

        let transfer_timeout = env::var("SMARTSHARE_TRANSFER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let storage_backend = env::var("SMARTSHARE_STORAGE_BACKEND")
            .ok()
            .filter(|s| !s.trim().is_empty() && s.trim() != "auto")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        let config = PublishConfig {
            subfolder: env::var("SMARTSHARE_SUBFOLDER")
                .unwrap_or_else(|_| DEFAULT_SUBFOLDER.to_string()),
            quality,
            max_batch_size: env::var("SMARTSHARE_MAX_BATCH_SIZE")
                .unwrap_or_else(|_| DEFAULT_MAX_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            max_concurrency: env::var("SMARTSHARE_MAX_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            transfer_timeout,
            storage_root: env::var("SMARTSHARE_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_storage_root()),
            storage_backend,
            share_target: env::var("SMARTSHARE_SHARE_TARGET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        tracing::debug!(
            subfolder = %config.subfolder,
            quality = config.quality.value(),
            max_batch_size = config.max_batch_size,
            storage_root = %config.storage_root.display(),
            "Loaded publish configuration"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validate_subfolder(&self.subfolder)?;

        if self.max_batch_size == 0 {
            return Err(anyhow::anyhow!("max_batch_size must be at least 1"));
        }

        if self.max_concurrency == 0 {
            return Err(anyhow::anyhow!("max_concurrency must be at least 1"));
        }

        Ok(())
    }
}

/// Reject subfolders that are empty or could escape their collection.
pub fn validate_subfolder(subfolder: &str) -> Result<(), anyhow::Error> {
    let trimmed = subfolder.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Subfolder must not be empty"));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(anyhow::anyhow!("Subfolder must be relative: {}", subfolder));
    }
    if trimmed.split(['/', '\\']).any(|part| part == ".." || part == ".") {
        return Err(anyhow::anyhow!(
            "Subfolder must not contain '.' or '..' segments: {}",
            subfolder
        ));
    }
    Ok(())
}
