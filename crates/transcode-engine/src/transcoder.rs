//! The transcoder capability.

use std::sync::Arc;

use blurfade_common::config::CoreSpec;
use blurfade_common::error::BlurfadeResult;

/// Receives the fraction of the current run that has completed.
///
/// Values are nominally in `[0, 1]` but backends may report outside that
/// range; consumers clamp.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Abstract media transcoder with a private, name-addressed file area.
///
/// Files written with [`write_file`](Transcoder::write_file) are visible to
/// [`run`](Transcoder::run) under the same name, and files the run produces
/// can be read back by name.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Load the core described by `core`. Must succeed before anything else.
    async fn load(&self, core: &CoreSpec) -> BlurfadeResult<()>;

    /// Stage a file.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> BlurfadeResult<()>;

    /// Read back a staged or produced file.
    async fn read_file(&self, name: &str) -> BlurfadeResult<Vec<u8>>;

    /// Remove a file from the staging area.
    async fn unlink(&self, name: &str) -> BlurfadeResult<()>;

    /// Run one transcode with ffmpeg-style arguments.
    async fn run(&self, args: &[String]) -> BlurfadeResult<()>;

    /// Bind (or clear) the progress callback for subsequent runs.
    fn set_progress(&self, callback: Option<ProgressCallback>);
}
