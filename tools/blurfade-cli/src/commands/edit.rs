//! Apply effects to a file and save the edited copy.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use blurfade_common::config::AppConfig;
use blurfade_editor::{EditorSession, ExportOutcome, Platform, SelectedFile};
use blurfade_export_dispatch::{DirectoryDownloadSink, DispatchOutcome};
use blurfade_media_model::{mime_from_extension, MediaKind, ObjectUrlRegistry, PresetLevel, VideoContainer};
use blurfade_still_render::StackBlur;
use blurfade_transcode_engine::{EncoderState, FfmpegTranscoder};

pub struct EditArgs {
    pub input: PathBuf,
    pub blur: Option<PresetLevel>,
    pub fade: Option<PresetLevel>,
    pub blur_value: Option<f64>,
    pub fade_value: Option<f64>,
    pub output_dir: PathBuf,
    pub container: Option<VideoContainer>,
    pub config: AppConfig,
}

pub async fn run(args: EditArgs) -> anyhow::Result<()> {
    let file_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid input path: {}", args.input.display()))?
        .to_string();
    let mime = mime_from_extension(&file_name)
        .ok_or_else(|| anyhow::anyhow!("Cannot tell the media type of {file_name}"))?;
    let bytes = tokio::fs::read(&args.input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.input.display()))?;

    println!("Editing: {}", args.input.display());
    tracing::info!(input = %args.input.display(), mime = %mime, bytes = bytes.len(), "Edit started");

    let urls = Arc::new(ObjectUrlRegistry::new());
    let sink = Arc::new(DirectoryDownloadSink::new(args.output_dir.clone(), urls.clone()));
    let transcoder = Arc::new(FfmpegTranscoder::from_config(&args.config.transcoder));
    let platform = Platform::new(urls, sink)
        .with_blur(Arc::new(StackBlur))
        .with_transcoder(transcoder)
        .with_mp4_support(args.container != Some(VideoContainer::Webm));

    let mut session = EditorSession::new(args.config, platform);
    let asset = session.select_media(SelectedFile::new(file_name, mime, bytes))?;
    let kind = asset.kind;
    println!("  Kind: {kind}");
    println!("  Output: {}", args.output_dir.join(&asset.output_file_name).display());

    if let Some(level) = args.blur {
        session.toggle_blur(level);
    }
    if let Some(level) = args.fade {
        session.toggle_fade(level);
    }
    if let Some(value) = args.blur_value {
        session.set_blur(value);
    }
    if let Some(value) = args.fade_value {
        session.set_fade(value);
    }
    let effects = session.effects();
    println!(
        "  Effects: blur {} / fade {}",
        effects.blur_intensity, effects.fade_intensity
    );

    if kind == MediaKind::Video {
        let cancel = CancellationToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        println!("  {}", session.export_control().label);
        let state = session.start(cancel).await?;
        ctrl_c.abort();
        tracing::debug!(state = ?state, "Encoder load finished");
        match state {
            EncoderState::Ready => {}
            EncoderState::LoadFailed { reason } => {
                anyhow::bail!("Encoder failed to load: {reason}");
            }
            other => anyhow::bail!("Encoder not loaded: {other:?}"),
        }
    }

    let mut status = session.subscribe();
    let progress = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let snapshot = status.borrow_and_update().clone();
            if snapshot.processing {
                print!("\r  Progress: {:.1}%  ", snapshot.progress_percent);
                std::io::stdout().flush().ok();
            }
        }
    });

    let outcome = session.export().await;
    session.flush().await;
    drop(session);
    progress.await.ok();
    tracing::info!(outcome = ?outcome, "Edit finished");

    match outcome {
        ExportOutcome::Delivered(DispatchOutcome::Downloaded { location, file_name }) => {
            let saved = location.unwrap_or_else(|| args.output_dir.join(file_name));
            println!("\nExport complete: {}", saved.display());
            Ok(())
        }
        ExportOutcome::Delivered(DispatchOutcome::Shared) => {
            println!("\nExport shared");
            Ok(())
        }
        ExportOutcome::Delivered(DispatchOutcome::ShareCancelled) => {
            println!("\nShare cancelled");
            Ok(())
        }
        ExportOutcome::Rejected => Err(anyhow::anyhow!("Export is not available right now")),
        ExportOutcome::Failed(notice) => Err(anyhow::anyhow!("{}", notice.message)),
    }
}
