//! Error types module
//!
//! `PublishError` is the per-item failure taxonomy of the publish pipeline. Every variant
//! except `BatchTooLarge` is non-fatal to a batch: the orchestrator records the item as
//! dropped and carries on with the rest.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like cancellation
    Debug,
    /// Warning level - for per-item failures the batch survives
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Self-description of an error for logs and structured reports.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSFER_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same input could succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Resolution failed for {reference}: {reason}")]
    ResolutionFailed { reference: String, reason: String },

    #[error("Unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Storage entry creation failed: {0}")]
    StorageEntryCreationFailed(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Cancelled before publish started")]
    Cancelled,

    #[error("Batch size {size} exceeds maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },
}

impl PublishError {
    pub fn resolution(reference: impl Into<String>, reason: impl ToString) -> Self {
        PublishError::ResolutionFailed {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            PublishError::ResolutionFailed { .. } => "ResolutionFailed",
            PublishError::UnsupportedMediaKind(_) => "UnsupportedMediaKind",
            PublishError::CompressionFailed(_) => "CompressionFailed",
            PublishError::StorageEntryCreationFailed(_) => "StorageEntryCreationFailed",
            PublishError::TransferFailed(_) => "TransferFailed",
            PublishError::Cancelled => "Cancelled",
            PublishError::BatchTooLarge { .. } => "BatchTooLarge",
        }
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn publish_error_static_metadata(err: &PublishError) -> (&'static str, bool, LogLevel) {
    match err {
        PublishError::ResolutionFailed { .. } => ("RESOLUTION_FAILED", false, LogLevel::Warn),
        PublishError::UnsupportedMediaKind(_) => ("UNSUPPORTED_MEDIA_KIND", false, LogLevel::Warn),
        PublishError::CompressionFailed(_) => ("COMPRESSION_FAILED", false, LogLevel::Warn),
        PublishError::StorageEntryCreationFailed(_) => {
            ("STORAGE_ENTRY_CREATION_FAILED", true, LogLevel::Error)
        }
        PublishError::TransferFailed(_) => ("TRANSFER_FAILED", true, LogLevel::Error),
        PublishError::Cancelled => ("CANCELLED", true, LogLevel::Debug),
        PublishError::BatchTooLarge { .. } => ("BATCH_TOO_LARGE", false, LogLevel::Warn),
    }
}

impl ErrorMetadata for PublishError {
    fn error_code(&self) -> &'static str {
        publish_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        publish_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        publish_error_static_metadata(self).2
    }
}
