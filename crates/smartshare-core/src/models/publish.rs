use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::media::{MediaCategory, MediaReference};
use crate::error::PublishError;

/// Stable reference to a published entry in shared storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    /// `file://` URI handed to share targets
    pub uri: String,
    /// Absolute filesystem path
    pub path: PathBuf,
    /// Path relative to the storage root, always `/`-separated
    pub relative_path: String,
}

impl TargetRef {
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            uri: format!("file://{}", path.display()),
            path,
            relative_path: relative_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A storage entry opened by the publisher.
///
/// Created pending, flipped to visible exactly once on commit, or deleted on rollback.
/// Other applications may only observe it while `pending` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    pub id: Uuid,
    pub category: MediaCategory,
    pub display_name: String,
    pub mime_type: String,
    pub subfolder: String,
    pub pending: bool,
    /// Where the bytes are written during transfer. For staging backends this is not the
    /// public location.
    pub entry_path: PathBuf,
}

/// A successfully published item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedMedia {
    pub target: TargetRef,
    pub display_name: String,
    pub mime_type: String,
    pub category: MediaCategory,
    pub size_bytes: u64,
    pub original_size_bytes: u64,
    pub published_at: DateTime<Utc>,
}

/// Result for one input of a batch.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// Position of the item in the input sequence
    pub index: usize,
    pub reference: MediaReference,
    pub result: Result<PublishedMedia, PublishError>,
}

impl ItemOutcome {
    pub fn is_published(&self) -> bool {
        self.result.is_ok()
    }
}

/// Original vs. compressed sizes of one surviving item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPair {
    pub reference: MediaReference,
    pub display_name: String,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
}

impl MediaPair {
    /// Percentage of bytes saved by compression (0 when nothing was saved).
    pub fn savings_percent(&self) -> f64 {
        if self.original_size_bytes == 0 || self.compressed_size_bytes >= self.original_size_bytes
        {
            return 0.0;
        }
        let saved = self.original_size_bytes - self.compressed_size_bytes;
        saved as f64 * 100.0 / self.original_size_bytes as f64
    }
}

/// What a share target is told about the references it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareHint {
    pub mime: String,
    pub target_app: Option<String>,
}

impl ShareHint {
    /// Build the hint for a set of categories. Returns `None` when no shareable
    /// category is present.
    pub fn for_categories<I>(categories: I, target_app: Option<String>) -> Option<Self>
    where
        I: IntoIterator<Item = MediaCategory>,
    {
        let mut present: Vec<MediaCategory> = Vec::new();
        for category in categories {
            if category != MediaCategory::Unsupported && !present.contains(&category) {
                present.push(category);
            }
        }
        // Images first, so a mixed batch always reads "image/* video/*".
        present.sort_by_key(|c| *c != MediaCategory::Image);

        let mime = present
            .iter()
            .filter_map(|c| c.wildcard_mime())
            .collect::<Vec<_>>()
            .join(" ");
        if mime.is_empty() {
            return None;
        }

        Some(ShareHint {
            mime,
            target_app,
        })
    }
}

/// Ordered per-item outcomes of a batch. Order always matches the input sequence.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<ItemOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful items, in input order.
    pub fn published(&self) -> impl Iterator<Item = &PublishedMedia> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn into_published(self) -> Vec<PublishedMedia> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }

    pub fn targets(&self) -> Vec<TargetRef> {
        self.published().map(|m| m.target.clone()).collect()
    }

    pub fn failures(&self) -> Vec<(&MediaReference, &PublishError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.reference, e)))
            .collect()
    }

    pub fn comparisons(&self) -> Vec<MediaPair> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().ok().map(|m| MediaPair {
                    reference: o.reference.clone(),
                    display_name: m.display_name.clone(),
                    original_size_bytes: m.original_size_bytes,
                    compressed_size_bytes: m.size_bytes,
                })
            })
            .collect()
    }

    pub fn share_hint(&self, target_app: Option<String>) -> Option<ShareHint> {
        ShareHint::for_categories(self.published().map(|m| m.category), target_app)
    }
}
