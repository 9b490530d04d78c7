//! Publish pipeline: single-item publisher, batch orchestration and share hand-off.

mod batch;
mod publisher;
mod share;

pub use batch::{BatchOptions, BatchPublisher};
pub use publisher::SharedStoragePublisher;
pub use share::{ShareError, ShareSink};
