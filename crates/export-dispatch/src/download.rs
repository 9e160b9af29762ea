//! Download fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_media_model::{ObjectUrl, ObjectUrlRegistry};

/// Saves the bytes behind an object URL under a suggested file name.
///
/// This is the "click a temporary anchor" half of export. Returns where the
/// file ended up, when the sink knows.
#[async_trait::async_trait]
pub trait DownloadSink: Send + Sync {
    async fn download(&self, url: &ObjectUrl, file_name: &str) -> BlurfadeResult<Option<PathBuf>>;
}

/// Writes downloads into a directory.
pub struct DirectoryDownloadSink {
    dir: PathBuf,
    urls: Arc<ObjectUrlRegistry>,
}

impl DirectoryDownloadSink {
    pub fn new(dir: impl Into<PathBuf>, urls: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            dir: dir.into(),
            urls,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl DownloadSink for DirectoryDownloadSink {
    async fn download(&self, url: &ObjectUrl, file_name: &str) -> BlurfadeResult<Option<PathBuf>> {
        let data = self
            .urls
            .resolve(url)
            .ok_or_else(|| BlurfadeError::export(format!("Object URL {url} is not live")))?;

        let name = sanitize_file_name(file_name);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, &data.bytes[..]).await?;

        tracing::info!(
            path = %path.display(),
            bytes = data.bytes.len(),
            mime = %data.mime,
            "Download saved"
        );
        Ok(Some(path))
    }
}

/// Keep only the final path component.
fn sanitize_file_name(file_name: &str) -> &str {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    match base {
        "" | "." | ".." => "download",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_flattened() {
        assert_eq!(sanitize_file_name("edited-cat.png"), "edited-cat.png");
        assert_eq!(sanitize_file_name("../../etc/edited-x.mp4"), "edited-x.mp4");
        assert_eq!(sanitize_file_name(".."), "download");
        assert_eq!(sanitize_file_name("dir/"), "download");
    }
}
