use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DEFAULT_QUALITY, IMAGES_COLLECTION, VIDEOS_COLLECTION};

/// Opaque handle to a user-selected media item.
///
/// The pipeline never inspects it; only a `ReferenceResolver` knows how to turn it into
/// bytes, a name and a MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MediaReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Coarse classification used to route an entry to its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Unsupported,
}

impl MediaCategory {
    /// Classify a MIME type. Parameters are ignored and matching is case-insensitive.
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = normalize_mime_type(mime_type).to_ascii_lowercase();
        if essence.starts_with("image/") {
            MediaCategory::Image
        } else if essence.starts_with("video/") {
            MediaCategory::Video
        } else {
            MediaCategory::Unsupported
        }
    }

    /// Top-level public collection for this category, if it has one.
    pub fn collection(self) -> Option<&'static str> {
        match self {
            MediaCategory::Image => Some(IMAGES_COLLECTION),
            MediaCategory::Video => Some(VIDEOS_COLLECTION),
            MediaCategory::Unsupported => None,
        }
    }

    /// Wildcard MIME used when handing entries of this category to a share target.
    pub fn wildcard_mime(self) -> Option<&'static str> {
        match self {
            MediaCategory::Image => Some("image/*"),
            MediaCategory::Video => Some("video/*"),
            MediaCategory::Unsupported => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip MIME parameters (e.g. "image/jpeg; q=1" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// A resolved input: what the user picked, as far as the pipeline cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    pub reference: MediaReference,
    pub display_name: String,
    pub mime_type: String,
}

impl InputItem {
    pub fn category(&self) -> MediaCategory {
        MediaCategory::from_mime(&self.mime_type)
    }
}

/// Media bytes moving between stages. Each stage owns the blob until it hands it on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn category(&self) -> MediaCategory {
        MediaCategory::from_mime(&self.mime_type)
    }
}

/// Compression quality in `0..=100`. Out-of-range requests are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(100);

    pub fn clamped(value: i64) -> Self {
        Quality(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality(DEFAULT_QUALITY)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
