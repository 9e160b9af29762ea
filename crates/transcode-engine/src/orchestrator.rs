//! Transcode orchestration: encoder load lifecycle and export jobs.
//!
//! The orchestrator owns the encoder state machine
//! (`Unloaded -> Loading -> Ready | LoadFailed`) and runs at most one
//! transcode job at a time. Every state change is published on a `watch`
//! channel so a UI can render progress and button state.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use blurfade_common::config::TranscoderConfig;
use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_media_model::{EffectParameters, MediaKind, VideoContainer};

use crate::capability::CapabilityRegistry;
use crate::filter::compile_transcode_args;
use crate::transcoder::{ProgressCallback, Transcoder};

/// Lifecycle of the transcoder core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EncoderState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed { reason: String },
}

/// Stage of the current export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Staging,
    Running,
    Complete,
    Failed,
}

/// Snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub encoder: EncoderState,
    pub job: JobState,

    /// True while any export is in progress.
    pub processing: bool,

    /// Progress of the running transcode, 0 to 100.
    pub progress_percent: f64,
}

impl Default for OrchestratorStatus {
    fn default() -> Self {
        Self {
            encoder: EncoderState::Unloaded,
            job: JobState::Idle,
            processing: false,
            progress_percent: 0.0,
        }
    }
}

impl OrchestratorStatus {
    /// Whether an export of `kind` may start now.
    pub fn can_export(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => !self.processing,
            MediaKind::Video => !self.processing && self.encoder == EncoderState::Ready,
        }
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub bytes: Vec<u8>,
    pub container: VideoContainer,
}

impl TranscodeOutput {
    pub fn mime(&self) -> &'static str {
        self.container.mime()
    }
}

/// Drives the transcoder through load and export jobs.
pub struct TranscodeOrchestrator {
    registry: Arc<CapabilityRegistry>,
    config: TranscoderConfig,
    status: Arc<watch::Sender<OrchestratorStatus>>,
    handle: Mutex<Option<Arc<dyn Transcoder>>>,
    job_token: tokio::sync::Mutex<()>,
}

impl TranscodeOrchestrator {
    pub fn new(registry: Arc<CapabilityRegistry>, config: TranscoderConfig) -> Self {
        let (status, _) = watch::channel(OrchestratorStatus::default());
        Self {
            registry,
            config,
            status: Arc::new(status),
            handle: Mutex::new(None),
            job_token: tokio::sync::Mutex::new(()),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> OrchestratorStatus {
        self.status.borrow().clone()
    }

    pub fn encoder_state(&self) -> EncoderState {
        self.status.borrow().encoder.clone()
    }

    /// Observe every status change.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status.subscribe()
    }

    pub fn can_export(&self, kind: MediaKind) -> bool {
        self.status.borrow().can_export(kind)
    }

    /// Start loading in the background.
    pub fn spawn_load(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<EncoderState> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.load(&cancel).await })
    }

    /// Load the transcoder core.
    ///
    /// Only the first call from `Unloaded` does any work; later calls return
    /// the current state. A failed load is terminal. Cancelling returns the
    /// encoder to `Unloaded`.
    pub async fn load(&self, cancel: &CancellationToken) -> EncoderState {
        let mut started = false;
        self.status.send_if_modified(|status| {
            if status.encoder == EncoderState::Unloaded {
                status.encoder = EncoderState::Loading;
                started = true;
                true
            } else {
                false
            }
        });
        if !started {
            return self.encoder_state();
        }

        tracing::info!(core = %self.config.core.url, "Loading transcoder");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BlurfadeError::Cancelled),
            loaded = self.load_core(cancel) => loaded,
        };

        let next = match result {
            Ok(transcoder) => {
                tracing::info!(backend = transcoder.name(), "Transcoder ready");
                *self.lock_handle() = Some(transcoder);
                EncoderState::Ready
            }
            Err(BlurfadeError::Cancelled) => {
                tracing::info!("Transcoder load cancelled");
                *self.lock_handle() = None;
                EncoderState::Unloaded
            }
            Err(e) => {
                tracing::error!(error = %e, "Transcoder load failed");
                EncoderState::LoadFailed {
                    reason: e.to_string(),
                }
            }
        };

        self.status.send_modify(|status| status.encoder = next.clone());
        next
    }

    async fn load_core(&self, cancel: &CancellationToken) -> BlurfadeResult<Arc<dyn Transcoder>> {
        let transcoder = self
            .registry
            .wait_for_transcoder(
                cancel,
                self.config.poll_interval(),
                self.config.load_timeout(),
            )
            .await?;
        transcoder.load(&self.config.core).await?;
        Ok(transcoder)
    }

    /// Apply `params` to a video and return the encoded result.
    ///
    /// Fails fast with [`BlurfadeError::EncoderNotReady`] or
    /// [`BlurfadeError::JobInFlight`]. Any failure inside the job is
    /// reported as [`BlurfadeError::Transcode`]. Processing state is reset
    /// on every exit path.
    pub async fn transcode(
        &self,
        input: &[u8],
        params: &EffectParameters,
        container: VideoContainer,
    ) -> BlurfadeResult<TranscodeOutput> {
        let transcoder = self.ready_transcoder()?;
        let _token = self
            .job_token
            .try_lock()
            .map_err(|_| BlurfadeError::JobInFlight)?;
        let _reset = JobReset {
            status: &self.status,
        };

        self.status.send_modify(|status| {
            status.processing = true;
            status.progress_percent = 0.0;
            status.job = JobState::Staging;
        });

        let output_name = format!(
            "{}.{}",
            self.config.output_file_stem,
            container.extension()
        );
        tracing::info!(
            input_bytes = input.len(),
            output = %output_name,
            blur = params.blur_intensity,
            fade = params.fade_intensity,
            "Transcode started"
        );

        let result = self
            .run_job(transcoder.as_ref(), input, params, container, &output_name)
            .await;
        transcoder.set_progress(None);

        match result {
            Ok(bytes) => {
                self.status.send_modify(|status| status.job = JobState::Complete);
                tracing::info!(output_bytes = bytes.len(), "Transcode complete");
                Ok(TranscodeOutput { bytes, container })
            }
            Err(e) => {
                self.status.send_modify(|status| status.job = JobState::Failed);
                tracing::error!(error = %e, "Transcode failed");
                self.cleanup(transcoder.as_ref(), &output_name).await;
                Err(match e {
                    BlurfadeError::Transcode { .. } => e,
                    other => BlurfadeError::transcode(other.to_string()),
                })
            }
        }
    }

    async fn run_job(
        &self,
        transcoder: &dyn Transcoder,
        input: &[u8],
        params: &EffectParameters,
        container: VideoContainer,
        output_name: &str,
    ) -> BlurfadeResult<Vec<u8>> {
        let input_name = self.config.input_file_name.as_str();
        transcoder.write_file(input_name, input).await?;

        transcoder.set_progress(Some(self.progress_callback()));
        self.status.send_modify(|status| status.job = JobState::Running);

        let args = compile_transcode_args(params, input_name, output_name, container);
        tracing::debug!(args = ?args, "Transcode arguments compiled");
        transcoder.run(&args).await?;

        let bytes = transcoder.read_file(output_name).await?;
        for name in [input_name, output_name] {
            if let Err(e) = transcoder.unlink(name).await {
                tracing::warn!(name, error = %e, "Failed to remove staged file");
            }
        }
        Ok(bytes)
    }

    async fn cleanup(&self, transcoder: &dyn Transcoder, output_name: &str) {
        for name in [self.config.input_file_name.as_str(), output_name] {
            if let Err(e) = transcoder.unlink(name).await {
                tracing::debug!(name, error = %e, "Staged file cleanup skipped");
            }
        }
    }

    fn progress_callback(&self) -> ProgressCallback {
        let status = Arc::clone(&self.status);
        Arc::new(move |ratio: f64| {
            if !ratio.is_finite() {
                return;
            }
            let percent = ratio.clamp(0.0, 1.0) * 100.0;
            status.send_if_modified(|s| {
                if s.processing && s.progress_percent != percent {
                    s.progress_percent = percent;
                    true
                } else {
                    false
                }
            });
        })
    }

    fn ready_transcoder(&self) -> BlurfadeResult<Arc<dyn Transcoder>> {
        if self.status.borrow().encoder != EncoderState::Ready {
            return Err(BlurfadeError::EncoderNotReady);
        }
        self.lock_handle()
            .clone()
            .ok_or(BlurfadeError::EncoderNotReady)
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<Arc<dyn Transcoder>>> {
        self.handle.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Returns the orchestrator to neutral when a job ends, however it ends.
struct JobReset<'a> {
    status: &'a watch::Sender<OrchestratorStatus>,
}

impl Drop for JobReset<'_> {
    fn drop(&mut self) {
        self.status.send_modify(|status| {
            status.processing = false;
            status.progress_percent = 0.0;
            status.job = JobState::Idle;
        });
    }
}
