//! Media assets, media kinds, and output naming.

use std::fmt;

use serde::{Deserialize, Serialize};

use blurfade_common::error::{BlurfadeError, BlurfadeResult};

use crate::object_url::ObjectUrl;

/// MIME type of every exported still image.
pub const IMAGE_OUTPUT_MIME: &str = "image/png";

/// Prefix applied to every exported file name.
pub const EDITED_PREFIX: &str = "edited-";

/// Stem used when the selected file name has none.
const FALLBACK_STEM: &str = "media";

/// The two kinds of media the editor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Output container for edited video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    Mp4,
    Webm,
}

/// The media currently being edited.
///
/// `source` is a revocable handle; whoever replaces or drops the asset must
/// revoke it exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Handle onto the selected file's bytes.
    pub source: ObjectUrl,

    /// Image or video.
    pub kind: MediaKind,

    /// Name used for the exported file.
    pub output_file_name: String,
}

impl MediaKind {
    /// Classify a MIME type (`image/*` or `video/*`).
    pub fn from_mime(mime: &str) -> BlurfadeResult<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Ok(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Ok(MediaKind::Video)
        } else {
            Err(BlurfadeError::media(format!(
                "Unsupported media type: {mime:?} (expected image/* or video/*)"
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VideoContainer {
    /// Pick MP4 when the platform can produce it, WebM otherwise.
    pub fn negotiate(mp4_supported: bool) -> Self {
        if mp4_supported {
            VideoContainer::Mp4
        } else {
            VideoContainer::Webm
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::Webm => "webm",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "video/mp4",
            VideoContainer::Webm => "video/webm",
        }
    }
}

impl MediaAsset {
    /// Build the asset for a freshly selected file.
    pub fn new(
        source: ObjectUrl,
        file_name: &str,
        mime: &str,
        container: VideoContainer,
    ) -> BlurfadeResult<Self> {
        let kind = MediaKind::from_mime(mime)?;
        Ok(Self {
            source,
            kind,
            output_file_name: output_file_name(file_name, kind, container),
        })
    }

    /// MIME type of the exported file.
    pub fn output_mime(&self, container: VideoContainer) -> &'static str {
        match self.kind {
            MediaKind::Image => IMAGE_OUTPUT_MIME,
            MediaKind::Video => container.mime(),
        }
    }
}

/// Exported file name: `edited-<stem>.<ext>`.
///
/// Images always export as PNG, so they get `.png` whatever the source
/// format was.
pub fn output_file_name(file_name: &str, kind: MediaKind, container: VideoContainer) -> String {
    let stem = file_stem(file_name);
    let ext = match kind {
        MediaKind::Image => "png",
        MediaKind::Video => container.extension(),
    };
    format!("{EDITED_PREFIX}{stem}.{ext}")
}

/// Guess a MIME type from a file extension.
pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}

fn file_stem(file_name: &str) -> &str {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
        .trim();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };
    if stem.is_empty() {
        FALLBACK_STEM
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/jpeg").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("Video/MP4").unwrap(), MediaKind::Video);
        assert!(MediaKind::from_mime("audio/mpeg").is_err());
        assert!(MediaKind::from_mime("").is_err());
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            output_file_name("beach.jpg", MediaKind::Image, VideoContainer::Mp4),
            "edited-beach.png"
        );
        assert_eq!(
            output_file_name("clip.final.mov", MediaKind::Video, VideoContainer::Mp4),
            "edited-clip.final.mp4"
        );
        assert_eq!(
            output_file_name("clip.mov", MediaKind::Video, VideoContainer::Webm),
            "edited-clip.webm"
        );
    }

    #[test]
    fn test_output_name_without_extension_or_stem() {
        assert_eq!(
            output_file_name("recording", MediaKind::Video, VideoContainer::Mp4),
            "edited-recording.mp4"
        );
        assert_eq!(
            output_file_name(".mp4", MediaKind::Video, VideoContainer::Mp4),
            "edited-media.mp4"
        );
        assert_eq!(
            output_file_name("/tmp/photos/cat.png", MediaKind::Image, VideoContainer::Mp4),
            "edited-cat.png"
        );
    }

    #[test]
    fn test_container_negotiation() {
        assert_eq!(VideoContainer::negotiate(true), VideoContainer::Mp4);
        assert_eq!(VideoContainer::negotiate(false), VideoContainer::Webm);
        assert_eq!(VideoContainer::Webm.mime(), "video/webm");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension("a.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_extension("a.webm"), Some("video/webm"));
        assert_eq!(mime_from_extension("README"), None);
    }

    #[test]
    fn test_asset_output_mime() {
        let asset = MediaAsset::new(
            ObjectUrl::from_raw("blob:blurfade/1"),
            "clip.mov",
            "video/quicktime",
            VideoContainer::Webm,
        )
        .unwrap();
        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.output_mime(VideoContainer::Webm), "video/webm");
        assert_eq!(asset.output_file_name, "edited-clip.webm");
    }
}
