pub mod media;
pub mod publish;

pub use media::{InputItem, MediaBlob, MediaCategory, MediaReference, Quality};
pub use publish::{
    BatchReport, ItemOutcome, MediaPair, PublishRecord, PublishedMedia, ShareHint, TargetRef,
};
