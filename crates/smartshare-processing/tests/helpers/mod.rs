#![allow(dead_code)]

pub mod fixtures;
pub mod share;
pub mod storage;

use smartshare_processing::{
    BatchPublisher, Compressor, FileResolver, ImageCompressor, SharedStoragePublisher,
};
use smartshare_storage::{PendingMarkerStorage, SharedStorage, StagingStorage};
use std::path::Path;
use std::sync::Arc;

/// One storage of each backend, rooted in separate directories under `root`.
pub async fn storage_backends(root: &Path) -> Vec<(&'static str, Arc<dyn SharedStorage>)> {
    let pending: Arc<dyn SharedStorage> = Arc::new(
        PendingMarkerStorage::new(root.join("pending"))
            .await
            .expect("pending storage"),
    );
    let staging: Arc<dyn SharedStorage> = Arc::new(
        StagingStorage::new(root.join("staging"))
            .await
            .expect("staging storage"),
    );
    vec![("pending", pending), ("staging", staging)]
}

/// Batch publisher over `storage` with the file resolver and the image compressor.
pub fn batch_publisher(storage: Arc<dyn SharedStorage>) -> BatchPublisher {
    let compressor: Arc<dyn Compressor> = Arc::new(ImageCompressor::new());
    BatchPublisher::new(
        Arc::new(FileResolver::new()),
        compressor,
        SharedStoragePublisher::new(storage),
    )
}
