use async_trait::async_trait;
use smartshare_core::{ShareHint, TargetRef};
use smartshare_processing::{ShareError, ShareSink};
use std::sync::Mutex;

/// Share sink that records every hand-off.
#[derive(Default)]
pub struct RecordingShareSink {
    calls: Mutex<Vec<(Vec<TargetRef>, ShareHint)>>,
}

impl RecordingShareSink {
    pub fn calls(&self) -> Vec<(Vec<TargetRef>, ShareHint)> {
        self.calls.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl ShareSink for RecordingShareSink {
    async fn share(&self, targets: &[TargetRef], hint: &ShareHint) -> Result<(), ShareError> {
        self.calls
            .lock()
            .expect("sink lock")
            .push((targets.to_vec(), hint.clone()));
        Ok(())
    }
}

/// Share sink whose target is never available.
pub struct UnavailableShareSink;

#[async_trait]
impl ShareSink for UnavailableShareSink {
    async fn share(&self, _targets: &[TargetRef], _hint: &ShareHint) -> Result<(), ShareError> {
        Err(ShareError::Unavailable("no share target installed".to_string()))
    }
}
