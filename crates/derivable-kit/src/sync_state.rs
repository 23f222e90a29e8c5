use crate::error::SyncError;

/// Where the syncer stands. Starts as `NotSynced(NotStarted)`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Synced,
    Syncing { progress: Option<f64> },
    NotSynced(SyncError),
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing { .. })
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::NotSynced(e) => Some(e),
            _ => None,
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::NotSynced(SyncError::NotStarted)
    }
}
