//! Shared constants.

/// Subfolder used when none is configured (the application name).
pub const DEFAULT_SUBFOLDER: &str = "SmartCloudPhotos";

/// Default compression quality (0-100).
pub const DEFAULT_QUALITY: u8 = 50;

/// Default cap on items per batch, matching the picker's multi-select limit.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 5;

/// Default number of items processed concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Display name used when a reference does not expose one.
pub const UNNAMED_FILE: &str = "unnamed_file";

/// MIME type used when a reference's type cannot be determined.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Top-level collection for image entries.
pub const IMAGES_COLLECTION: &str = "Pictures";

/// Top-level collection for video entries.
pub const VIDEOS_COLLECTION: &str = "Movies";

/// Hidden directory holding staged (not yet visible) entries.
pub const STAGING_DIR: &str = ".staging";

/// Suffix of the marker file that keeps an entry pending.
pub const PENDING_MARKER_SUFFIX: &str = ".pending";
