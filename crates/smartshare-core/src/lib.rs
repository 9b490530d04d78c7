//! SmartShare Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and constants
//! shared by the storage backends, the publish pipeline and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::PublishConfig;
pub use error::{ErrorMetadata, LogLevel, PublishError};
pub use models::{
    BatchReport, InputItem, ItemOutcome, MediaBlob, MediaCategory, MediaPair, MediaReference,
    PublishRecord, PublishedMedia, Quality, ShareHint, TargetRef,
};
pub use storage_types::StorageBackend;
