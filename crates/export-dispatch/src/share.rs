//! Platform share capability.

use crate::dispatcher::ExportFile;

/// Why a share did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// The user dismissed the share sheet.
    #[error("Share aborted by user")]
    Aborted,

    #[error("Share failed: {0}")]
    Failed(String),
}

/// A native share sheet or equivalent.
#[async_trait::async_trait]
pub trait ShareTarget: Send + Sync {
    /// Whether this target accepts `file`.
    fn can_share(&self, file: &ExportFile) -> bool;

    async fn share(&self, file: &ExportFile, title: &str) -> Result<(), ShareError>;
}

/// Platform without sharing. Every export downloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShare;

#[async_trait::async_trait]
impl ShareTarget for NoShare {
    fn can_share(&self, _file: &ExportFile) -> bool {
        false
    }

    async fn share(&self, _file: &ExportFile, _title: &str) -> Result<(), ShareError> {
        Err(ShareError::Failed("sharing is not available".into()))
    }
}
