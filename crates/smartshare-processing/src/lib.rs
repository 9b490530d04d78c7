//! SmartShare Processing Library
//!
//! The publish pipeline: reference resolution, compression, two-phase publishing into
//! shared storage, batch orchestration and the share hand-off.

pub mod compression;
pub mod publish;
pub mod resolver;

// Re-export commonly used types
#[cfg(feature = "image")]
pub use compression::ImageCompressor;
pub use compression::{default_compressor, Compressor, PassthroughCompressor};
pub use publish::{
    BatchOptions, BatchPublisher, ShareError, ShareSink, SharedStoragePublisher,
};
pub use resolver::{FileResolver, ReferenceResolver};
