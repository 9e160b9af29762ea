//! What the host environment provides to a session.

use std::sync::Arc;

use blurfade_export_dispatch::{DownloadSink, ShareTarget};
use blurfade_media_model::ObjectUrlRegistry;
use blurfade_still_render::BlurProvider;
use blurfade_transcode_engine::Transcoder;

/// Host capabilities.
///
/// `blur` and `transcoder` may be left empty and provided later through
/// [`EditorSession::capabilities`](crate::EditorSession::capabilities).
pub struct Platform {
    pub urls: Arc<ObjectUrlRegistry>,
    pub share: Option<Arc<dyn ShareTarget>>,
    pub download: Arc<dyn DownloadSink>,

    /// Whether the platform can produce `video/mp4`.
    pub mp4_supported: bool,

    pub blur: Option<Arc<dyn BlurProvider>>,
    pub transcoder: Option<Arc<dyn Transcoder>>,
}

impl Platform {
    /// A platform with only a download sink.
    pub fn new(urls: Arc<ObjectUrlRegistry>, download: Arc<dyn DownloadSink>) -> Self {
        Self {
            urls,
            share: None,
            download,
            mp4_supported: true,
            blur: None,
            transcoder: None,
        }
    }

    pub fn with_share(mut self, share: Arc<dyn ShareTarget>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn with_blur(mut self, blur: Arc<dyn BlurProvider>) -> Self {
        self.blur = Some(blur);
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn with_mp4_support(mut self, supported: bool) -> Self {
        self.mp4_supported = supported;
        self
    }
}

/// A file chosen by the user.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }
}
