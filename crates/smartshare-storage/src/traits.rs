//! Shared storage abstraction trait
//!
//! This module defines the two-phase entry protocol every backend implements:
//! `create_entry` (pending) → `open_writer` → `finalize` (visible), with `delete_entry`
//! as the rollback path.

use crate::StorageBackend;
use async_trait::async_trait;
use smartshare_core::{MediaCategory, PublishRecord, TargetRef};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entry creation failed: {0}")]
    CreateFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Finalize failed: {0}")]
    FinalizeFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Writable byte sink for a pending entry.
pub type EntryWriter = Pin<Box<dyn AsyncWrite + Send + Unpin>>;

/// Request to open a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub display_name: String,
    pub mime_type: String,
    pub category: MediaCategory,
    pub subfolder: String,
}

/// Which entries a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// What other applications can see.
    Visible,
    /// Visible entries plus anything still pending or staged.
    All,
}

/// One file found by a storage listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// File holding the bytes. For pending entries this is the hidden or staged file.
    pub path: PathBuf,
    /// Public path relative to the root; for staged entries, the staging file's.
    pub relative_path: String,
    pub size_bytes: u64,
    pub pending: bool,
}

/// Shared storage abstraction trait
///
/// Backends must guarantee that an outside observer sees an entry either not at all or
/// fully written. `delete_entry` must be idempotent: deleting an already deleted entry
/// succeeds and leaves storage unchanged.
#[async_trait]
pub trait SharedStorage: Send + Sync {
    /// Create a new, empty, pending entry.
    async fn create_entry(&self, entry: &NewEntry) -> StorageResult<PublishRecord>;

    /// Open the pending entry for writing. The writer truncates any earlier content.
    async fn open_writer(&self, record: &PublishRecord) -> StorageResult<EntryWriter>;

    /// Make a fully written entry visible and return its public reference.
    ///
    /// Flips `record.pending` to false and points `record.entry_path` at the public file.
    async fn finalize(&self, record: &mut PublishRecord) -> StorageResult<TargetRef>;

    /// Delete an entry, pending or not.
    async fn delete_entry(&self, record: &PublishRecord) -> StorageResult<()>;

    /// List entries under the storage root.
    async fn list_entries(&self, scope: ListScope) -> StorageResult<Vec<StoredEntry>>;

    /// Make a published entry readable by other applications.
    async fn grant_read(&self, target: &TargetRef) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Whether pending entries sit beside their public name as hidden marker files.
    fn supports_pending(&self) -> bool;

    /// Storage root directory
    fn root(&self) -> &Path;
}
