use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Shared storage backend types
///
/// Both backends give the same guarantee to outside observers: an entry is either absent
/// or fully written. They differ in how the pending phase is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Entry written in place, hidden behind a pending marker until finalized.
    Pending,
    /// Entry written to a staging area, then linked into the public path.
    Staging,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StorageBackend::Pending),
            "staging" => Ok(StorageBackend::Staging),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Pending => write!(f, "pending"),
            StorageBackend::Staging => write!(f, "staging"),
        }
    }
}
