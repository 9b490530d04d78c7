use async_trait::async_trait;
use smartshare_core::{ShareHint, TargetRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Share target unavailable: {0}")]
    Unavailable(String),

    #[error("Share hand-off failed: {0}")]
    HandOffFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives the published references of a batch, in input order.
///
/// Hand-off is fire-and-forget: implementations return once the targets are handed over
/// and must not wait for the receiving application.
#[async_trait]
pub trait ShareSink: Send + Sync {
    async fn share(&self, targets: &[TargetRef], hint: &ShareHint) -> Result<(), ShareError>;
}
