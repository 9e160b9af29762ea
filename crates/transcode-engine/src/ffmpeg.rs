//! Transcoder backed by a native ffmpeg process.
//!
//! Staged files live in a private temp directory created at load time. Each
//! run spawns ffmpeg inside that directory with machine-readable progress on
//! stdout (`-progress pipe:1`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use blurfade_common::config::{CoreSpec, TranscoderConfig};
use blurfade_common::error::{BlurfadeError, BlurfadeResult};

use crate::transcoder::{ProgressCallback, Transcoder};

const RUN_PREAMBLE: [&str; 7] = [
    "-y",
    "-hide_banner",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
];

/// A loaded core. The staging directory is removed when the last clone drops.
#[derive(Debug, Clone)]
struct LoadedCore {
    binary: String,
    staging: Arc<TempDir>,
}

impl LoadedCore {
    fn staging_dir(&self) -> &Path {
        self.staging.path()
    }
}

/// ffmpeg subprocess transcoder.
pub struct FfmpegTranscoder {
    ffprobe_binary: String,
    core: Mutex<Option<LoadedCore>>,
    progress: Mutex<Option<ProgressCallback>>,
}

impl FfmpegTranscoder {
    pub fn new(ffprobe_binary: impl Into<String>) -> Self {
        Self {
            ffprobe_binary: ffprobe_binary.into(),
            core: Mutex::new(None),
            progress: Mutex::new(None),
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(config.ffprobe_binary.clone())
    }

    /// Staging directory of the loaded core.
    pub fn staging_dir(&self) -> Option<PathBuf> {
        self.lock_core()
            .as_ref()
            .map(|core| core.staging_dir().to_path_buf())
    }

    fn loaded(&self) -> BlurfadeResult<LoadedCore> {
        self.lock_core()
            .clone()
            .ok_or(BlurfadeError::EncoderNotReady)
    }

    fn staged_path(&self, name: &str) -> BlurfadeResult<PathBuf> {
        let core = self.loaded()?;
        validate_staged_name(name)?;
        Ok(core.staging_dir().join(name))
    }

    fn lock_core(&self) -> MutexGuard<'_, Option<LoadedCore>> {
        self.core.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_progress(&self) -> MutexGuard<'_, Option<ProgressCallback>> {
        self.progress.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self, core: &CoreSpec) -> BlurfadeResult<()> {
        if !command_exists(&core.url) {
            return Err(BlurfadeError::load(format!(
                "ffmpeg binary not found: {}",
                core.url
            )));
        }

        let output = Command::new(&core.url)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BlurfadeError::load(format!("Failed to start {}: {e}", core.url)))?;
        if !output.status.success() {
            return Err(BlurfadeError::load(format!(
                "{} -version exited with {}",
                core.url, output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        let version = banner.lines().next().unwrap_or_default().trim().to_string();
        if let Some(expected) = &core.expected_version {
            if !banner.contains(expected.as_str()) {
                return Err(BlurfadeError::load(format!(
                    "Core version mismatch: expected {expected}, found {version:?}"
                )));
            }
        }

        let staging = tempfile::Builder::new()
            .prefix("blurfade-")
            .tempdir()
            .map_err(|e| BlurfadeError::load(format!("Failed to create staging dir: {e}")))?;

        tracing::info!(
            binary = %core.url,
            version = %version,
            staging = %staging.path().display(),
            "ffmpeg core loaded"
        );

        *self.lock_core() = Some(LoadedCore {
            binary: core.url.clone(),
            staging: Arc::new(staging),
        });
        Ok(())
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> BlurfadeResult<()> {
        let path = self.staged_path(name)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(name, bytes = bytes.len(), "Staged file written");
        Ok(())
    }

    async fn read_file(&self, name: &str) -> BlurfadeResult<Vec<u8>> {
        let path = self.staged_path(name)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| BlurfadeError::transcode(format!("Failed to read {name}: {e}")))?;
        Ok(bytes)
    }

    async fn unlink(&self, name: &str) -> BlurfadeResult<()> {
        let path = self.staged_path(name)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn run(&self, args: &[String]) -> BlurfadeResult<()> {
        let core = self.loaded()?;
        let duration_secs = match input_name(args) {
            Some(name) => {
                probe_duration(&self.ffprobe_binary, &core.staging_dir().join(name)).await
            }
            None => None,
        };
        let callback = self.lock_progress().clone();

        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&core.binary)
            .current_dir(core.staging_dir())
            .args(RUN_PREAMBLE)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BlurfadeError::transcode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            duration_secs = ?duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BlurfadeError::transcode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BlurfadeError::transcode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BlurfadeError::transcode(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let (Some(cb), Some(ratio)) = (&callback, state.ratio(duration_secs)) {
                    cb(ratio);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BlurfadeError::transcode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(BlurfadeError::transcode(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &callback {
            cb(1.0);
        }
        Ok(())
    }

    fn set_progress(&self, callback: Option<ProgressCallback>) {
        *self.lock_progress() = callback;
    }
}

/// Staged files are flat names inside the staging directory.
fn validate_staged_name(name: &str) -> BlurfadeResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(is_separator) {
        return Err(BlurfadeError::transcode(format!(
            "Invalid staged file name: {name:?}"
        )));
    }
    Ok(())
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn input_name(args: &[String]) -> Option<&str> {
    args.windows(2)
        .find(|pair| pair[0] == "-i")
        .map(|pair| pair[1].as_str())
}

/// Check whether a binary is resolvable, either as a path or on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    if binary.is_empty() {
        return false;
    }
    if binary.contains(is_separator) {
        return Path::new(binary).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let candidate = dir.join(binary);
                candidate.is_file() || candidate.with_extension("exe").is_file()
            })
        })
        .unwrap_or(false)
}

/// Container duration in seconds, via ffprobe.
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports out_time_ms in microseconds as well.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn ratio(&self, duration_secs: Option<f64>) -> Option<f64> {
        if self.complete {
            return Some(1.0);
        }
        let duration = duration_secs.filter(|d| *d > 0.0)?;
        Some(self.out_time_secs / duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_state_tracks_out_time() {
        let mut state = ProgressState::default();
        state.update("frame", "12");
        state.update("out_time_us", "2500000");
        state.update("progress", "continue");
        assert_eq!(state.ratio(Some(10.0)), Some(0.25));
        assert_eq!(state.ratio(None), None);

        state.update("out_time_ms", "5000000");
        assert_eq!(state.ratio(Some(10.0)), Some(0.5));

        state.update("progress", "end");
        assert_eq!(state.ratio(None), Some(1.0));
    }

    #[test]
    fn progress_ignores_garbage_values() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "N/A");
        assert_eq!(state.out_time_secs, 0.0);
    }

    #[test]
    fn staged_names_must_be_flat() {
        assert!(validate_staged_name("inputfile").is_ok());
        assert!(validate_staged_name("output.mp4").is_ok());
        assert!(validate_staged_name("").is_err());
        assert!(validate_staged_name("..").is_err());
        assert!(validate_staged_name("../etc/passwd").is_err());
        assert!(validate_staged_name("a\\b").is_err());
    }

    #[test]
    fn input_name_follows_dash_i() {
        let args: Vec<String> = ["-i", "inputfile", "-c:a", "copy", "out.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(input_name(&args), Some("inputfile"));
        assert_eq!(input_name(&args[2..]), None);
    }

    #[tokio::test]
    async fn operations_before_load_are_rejected() {
        let transcoder = FfmpegTranscoder::new("ffprobe");
        assert!(matches!(
            transcoder.write_file("inputfile", b"x").await,
            Err(BlurfadeError::EncoderNotReady)
        ));
        assert!(matches!(
            transcoder.run(&[]).await,
            Err(BlurfadeError::EncoderNotReady)
        ));
    }

    #[test]
    fn command_lookup_does_not_go_through_a_shell() {
        let marker = std::env::temp_dir().join(format!("blurfade-marker-{}", std::process::id()));
        let hostile = format!("true; touch {}", marker.display());
        assert!(!command_exists(&hostile));
        assert!(!marker.exists());
        assert!(!command_exists(""));
        assert!(!command_exists("blurfade-no-such-ffmpeg-binary"));
    }

    #[test]
    fn command_lookup_accepts_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("fake-ffmpeg");
        std::fs::write(&binary, b"").unwrap();
        assert!(command_exists(&binary.display().to_string()));
        assert!(!command_exists(&dir.path().join("absent").display().to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn staging_dir_lives_as_long_as_the_core() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let binary = bin_dir.path().join("ffmpeg");
        std::fs::write(&binary, "#!/bin/sh\necho 'ffmpeg version 6.1-blurfade'\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let core = CoreSpec {
            url: binary.display().to_string(),
            expected_version: Some("6.1".to_string()),
        };
        let transcoder = FfmpegTranscoder::new("ffprobe");
        transcoder.load(&core).await.unwrap();
        let first = transcoder.staging_dir().unwrap();
        assert!(first.is_dir());
        assert!(first
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("blurfade-")));

        transcoder.write_file("inputfile", b"abc").await.unwrap();
        assert_eq!(transcoder.read_file("inputfile").await.unwrap(), b"abc");

        transcoder.load(&core).await.unwrap();
        let second = transcoder.staging_dir().unwrap();
        assert_ne!(first, second);
        assert!(!first.exists());

        drop(transcoder);
        assert!(!second.exists());
    }

    #[tokio::test]
    async fn missing_binary_fails_load() {
        let transcoder = FfmpegTranscoder::new("ffprobe");
        let core = CoreSpec {
            url: "blurfade-no-such-ffmpeg-binary".to_string(),
            expected_version: None,
        };
        let err = transcoder.load(&core).await.unwrap_err();
        assert!(matches!(err, BlurfadeError::Load { .. }));
        assert!(transcoder.staging_dir().is_none());
    }
}
