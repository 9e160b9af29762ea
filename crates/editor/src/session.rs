//! The editing session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use blurfade_common::config::AppConfig;
use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_export_dispatch::{ExportDispatcher, ExportFile};
use blurfade_media_model::{
    EffectParameters, MediaAsset, MediaKind, ObjectUrlRegistry, PresetLevel, VideoContainer,
    VideoPreviewStyle, IMAGE_OUTPUT_MIME,
};
use blurfade_still_render::{DisplaySize, StillRenderer};
use blurfade_transcode_engine::{
    CapabilityRegistry, EncoderState, OrchestratorStatus, TranscodeOrchestrator,
};

use crate::control::{ExportControl, ExportOutcome, Notice, LABEL_ERROR, LABEL_LOADING, LABEL_SHARE};
use crate::platform::{Platform, SelectedFile};

/// One user's editing session over a single media asset.
pub struct EditorSession {
    urls: Arc<ObjectUrlRegistry>,
    capabilities: Arc<CapabilityRegistry>,
    orchestrator: Arc<TranscodeOrchestrator>,
    dispatcher: ExportDispatcher,
    renderer: StillRenderer,
    container: VideoContainer,
    asset: Option<MediaAsset>,
    effects: EffectParameters,
    viewport: Option<(f64, f64)>,
    exporting: AtomicBool,
}

impl EditorSession {
    pub fn new(config: AppConfig, platform: Platform) -> Self {
        let capabilities = Arc::new(CapabilityRegistry::new());
        if let Some(blur) = platform.blur {
            capabilities.provide_blur(blur);
        }
        if let Some(transcoder) = platform.transcoder {
            capabilities.provide_transcoder(transcoder);
        }

        let orchestrator = Arc::new(TranscodeOrchestrator::new(
            capabilities.clone(),
            config.transcoder.clone(),
        ));
        let dispatcher = ExportDispatcher::new(
            platform.share,
            platform.download,
            platform.urls.clone(),
            config.export.clone(),
        );
        let container = VideoContainer::negotiate(platform.mp4_supported && config.export.prefer_mp4);
        tracing::debug!(container = container.extension(), "Editor session created");

        Self {
            urls: platform.urls,
            capabilities,
            orchestrator,
            dispatcher,
            renderer: StillRenderer::new(),
            container,
            asset: None,
            effects: EffectParameters::NONE,
            viewport: None,
            exporting: AtomicBool::new(false),
        }
    }

    /// Begin loading the transcoder in the background.
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<EncoderState> {
        self.orchestrator.spawn_load(cancel)
    }

    /// Capability slots, for providing late capabilities.
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    pub fn container(&self) -> VideoContainer {
        self.container
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn effects(&self) -> EffectParameters {
        self.effects
    }

    /// Replace the current media with `file`.
    ///
    /// The previous asset's URL is revoked and both effects reset to zero.
    /// Files that are neither image nor video are rejected and leave the
    /// session untouched.
    pub fn select_media(&mut self, file: SelectedFile) -> BlurfadeResult<&MediaAsset> {
        let kind = MediaKind::from_mime(&file.mime)?;

        self.release_asset();
        self.effects = EffectParameters::NONE;

        let url = self.urls.create(file.bytes.clone(), file.mime.clone());
        let asset = MediaAsset::new(url, &file.name, &file.mime, self.container)?;
        tracing::info!(
            kind = %kind,
            name = %file.name,
            output = %asset.output_file_name,
            bytes = file.bytes.len(),
            "Media selected"
        );

        if kind == MediaKind::Image {
            if let Err(e) = self.renderer.decode_source(&file.bytes) {
                self.urls.revoke(&asset.source);
                return Err(e);
            }
        }

        let asset = self.asset.insert(asset);
        if kind == MediaKind::Image {
            if let Some((w, h)) = self.viewport {
                self.renderer.layout(w, h);
            }
            if let Err(e) = self.renderer.render(&self.effects, self.capabilities.blur().as_deref()) {
                tracing::warn!(error = %e, "Initial render failed");
            }
        }
        Ok(asset)
    }

    /// Drop the current media.
    pub fn reset(&mut self) {
        self.release_asset();
        self.effects = EffectParameters::NONE;
    }

    fn release_asset(&mut self) {
        if let Some(previous) = self.asset.take() {
            self.urls.revoke(&previous.source);
        }
        self.renderer.clear();
    }

    pub fn set_blur(&mut self, intensity: f64) {
        self.effects.set_blur(intensity);
        self.refresh_preview();
    }

    pub fn set_fade(&mut self, intensity: f64) {
        self.effects.set_fade(intensity);
        self.refresh_preview();
    }

    /// Select a blur preset, or clear blur if it is already active.
    pub fn toggle_blur(&mut self, level: PresetLevel) {
        self.effects.toggle_blur(level);
        self.refresh_preview();
    }

    /// Select a fade preset, or clear fade if it is already active.
    pub fn toggle_fade(&mut self, level: PresetLevel) {
        self.effects.toggle_fade(level);
        self.refresh_preview();
    }

    /// Record a new viewport and redraw.
    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Some((width, height));
        self.renderer.layout(width, height);
        self.refresh_preview();
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.renderer.display_size()
    }

    /// The rendered still, when an image is loaded.
    pub fn surface(&self) -> Option<&RgbaImage> {
        self.renderer.surface()
    }

    /// Approximate effect styling for a playing video.
    pub fn video_preview(&self) -> VideoPreviewStyle {
        self.effects.video_preview()
    }

    fn refresh_preview(&mut self) {
        if !self.renderer.has_source() {
            return;
        }
        let blur = self.capabilities.blur();
        if let Err(e) = self.renderer.render(&self.effects, blur.as_deref()) {
            tracing::warn!(error = %e, "Preview render failed");
        }
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.orchestrator.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorStatus> {
        self.orchestrator.subscribe()
    }

    /// Export button state.
    ///
    /// Only videos depend on the encoder, so only videos show its state.
    pub fn export_control(&self) -> ExportControl {
        let status = self.orchestrator.status();
        let is_video = self
            .asset
            .as_ref()
            .is_some_and(|asset| asset.kind == MediaKind::Video);
        let label = match (&status.encoder, is_video) {
            (_, false) | (EncoderState::Ready, true) => LABEL_SHARE,
            (EncoderState::Unloaded | EncoderState::Loading, true) => LABEL_LOADING,
            (EncoderState::LoadFailed { .. }, true) => LABEL_ERROR,
        };
        let enabled = !self.exporting.load(Ordering::SeqCst)
            && self
                .asset
                .as_ref()
                .is_some_and(|asset| status.can_export(asset.kind));
        ExportControl { enabled, label }
    }

    /// Export the current media with the current effects.
    pub async fn export(&self) -> ExportOutcome {
        let Some(asset) = self.asset.as_ref() else {
            return ExportOutcome::Rejected;
        };
        if !self.export_control().enabled {
            tracing::debug!(kind = %asset.kind, "Export rejected; control disabled");
            return ExportOutcome::Rejected;
        }
        if self.exporting.swap(true, Ordering::SeqCst) {
            return ExportOutcome::Rejected;
        }
        let _exporting = ExportingFlag(&self.exporting);

        let file = match asset.kind {
            MediaKind::Image => match self.renderer.encode_png() {
                Ok(png) => ExportFile::new(png, asset.output_file_name.clone(), IMAGE_OUTPUT_MIME),
                Err(e) => {
                    tracing::error!(error = %e, "Still export failed");
                    return ExportOutcome::Failed(Notice::from_error(&e));
                }
            },
            MediaKind::Video => match self.transcode(asset).await {
                Ok(file) => file,
                Err(e) => {
                    tracing::error!(error = %e, "Video export failed");
                    return ExportOutcome::Failed(Notice::processing_failed());
                }
            },
        };

        match self.dispatcher.dispatch(file).await {
            Ok(outcome) => ExportOutcome::Delivered(outcome),
            Err(e) => {
                tracing::error!(error = %e, "Export delivery failed");
                ExportOutcome::Failed(Notice::from_error(&e))
            }
        }
    }

    /// Wait for delayed download cleanup. Call before a one-shot host exits.
    pub async fn flush(&self) {
        self.dispatcher.flush_revokes().await;
    }

    async fn transcode(&self, asset: &MediaAsset) -> BlurfadeResult<ExportFile> {
        let source = self
            .urls
            .resolve(&asset.source)
            .ok_or_else(|| BlurfadeError::media("Selected media is no longer available"))?;
        let output = self
            .orchestrator
            .transcode(&source.bytes, &self.effects, self.container)
            .await?;
        let mime = output.mime();
        Ok(ExportFile::new(output.bytes, asset.output_file_name.clone(), mime))
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if let Some(asset) = self.asset.take() {
            self.urls.revoke(&asset.source);
        }
    }
}

struct ExportingFlag<'a>(&'a AtomicBool);

impl Drop for ExportingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
