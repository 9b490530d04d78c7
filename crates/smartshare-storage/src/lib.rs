//! SmartShare Storage Library
//!
//! This crate provides the shared-storage abstraction and its two filesystem backends.
//!
//! # Layout
//!
//! Every backend publishes into the same public layout under its root:
//!
//! - **Images**: `Pictures/{subfolder}/{display name}`
//! - **Videos**: `Movies/{subfolder}/{display name}`
//!
//! A display name already taken in the target folder is disambiguated as
//! `name (1).ext`, `name (2).ext`, ...
//!
//! # Visibility
//!
//! Entries are created pending and become visible only when finalized:
//!
//! - [`PendingMarkerStorage`] writes into a hidden `.{name}.pending` file beside the
//!   public name and renames it onto that name on finalize. The rename is the commit point.
//! - [`StagingStorage`] writes under `.staging/` and hard-links into the public path on
//!   finalize. The link is the commit point.

pub mod factory;
mod files;
pub(crate) mod keys;
#[cfg(feature = "storage-pending")]
pub mod pending;
#[cfg(feature = "storage-staging")]
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_storage, detect_backend};
#[cfg(feature = "storage-pending")]
pub use pending::PendingMarkerStorage;
pub use smartshare_core::StorageBackend;
#[cfg(feature = "storage-staging")]
pub use staging::StagingStorage;
pub use traits::{
    EntryWriter, ListScope, NewEntry, SharedStorage, StorageError, StorageResult, StoredEntry,
};
