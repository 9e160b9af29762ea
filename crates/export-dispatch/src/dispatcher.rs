//! Share-then-download export dispatch.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use blurfade_common::config::ExportSettings;
use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_media_model::ObjectUrlRegistry;

use crate::download::DownloadSink;
use crate::share::{ShareError, ShareTarget};

/// A finished file ready for delivery.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Arc<[u8]>,
    pub file_name: String,
    pub mime: String,
}

impl ExportFile {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }
}

/// How an export was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the share target.
    Shared,

    /// The user dismissed the share sheet. Nothing else happens.
    ShareCancelled,

    /// Saved through the download sink.
    Downloaded {
        file_name: String,
        location: Option<PathBuf>,
    },
}

/// Routes finished files to the share target or the download sink.
///
/// Download URLs are revoked on background tasks. Hosts that exit right after
/// an export call [`ExportDispatcher::flush_revokes`] first.
pub struct ExportDispatcher {
    share: Option<Arc<dyn ShareTarget>>,
    download: Arc<dyn DownloadSink>,
    urls: Arc<ObjectUrlRegistry>,
    settings: ExportSettings,
    pending_revokes: Mutex<Vec<JoinHandle<()>>>,
}

impl ExportDispatcher {
    pub fn new(
        share: Option<Arc<dyn ShareTarget>>,
        download: Arc<dyn DownloadSink>,
        urls: Arc<ObjectUrlRegistry>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            share,
            download,
            urls,
            settings,
            pending_revokes: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every scheduled revoke to run.
    pub async fn flush_revokes(&self) {
        let pending = std::mem::take(&mut *self.lock_pending());
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Revoke task failed");
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending_revokes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver `file`, preferring the share target.
    pub async fn dispatch(&self, file: ExportFile) -> BlurfadeResult<DispatchOutcome> {
        if let Some(target) = self.share.as_ref().filter(|t| t.can_share(&file)) {
            match target.share(&file, &self.settings.share_title).await {
                Ok(()) => {
                    tracing::info!(file = %file.file_name, "Export shared");
                    return Ok(DispatchOutcome::Shared);
                }
                Err(ShareError::Aborted) => {
                    tracing::info!(file = %file.file_name, "Share cancelled by user");
                    return Ok(DispatchOutcome::ShareCancelled);
                }
                Err(ShareError::Failed(reason)) => {
                    tracing::warn!(
                        file = %file.file_name,
                        reason = %reason,
                        "Share failed; falling back to download"
                    );
                }
            }
        }

        self.download(file).await
    }

    async fn download(&self, file: ExportFile) -> BlurfadeResult<DispatchOutcome> {
        let url = self.urls.create(file.bytes, file.mime);
        let result = self.download.download(&url, &file.file_name).await;

        let urls = Arc::clone(&self.urls);
        let delay = self.settings.revoke_delay();
        let handle = tokio::spawn(async move {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            urls.revoke(&url);
        });
        let mut pending = self.lock_pending();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        drop(pending);

        match result {
            Ok(location) => {
                tracing::info!(file = %file.file_name, "Export downloaded");
                Ok(DispatchOutcome::Downloaded {
                    file_name: file.file_name,
                    location,
                })
            }
            Err(e) => Err(match e {
                BlurfadeError::Export { .. } => e,
                other => BlurfadeError::export(format!("Download failed: {other}")),
            }),
        }
    }
}
