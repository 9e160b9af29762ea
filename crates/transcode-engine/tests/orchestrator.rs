use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use blurfade_common::config::{CoreSpec, TranscoderConfig};
use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_media_model::{EffectKind, EffectParameters, MediaKind, PresetLevel, VideoContainer};
use blurfade_transcode_engine::{
    CapabilityRegistry, EncoderState, JobState, ProgressCallback, TranscodeOrchestrator,
    Transcoder,
};

/// In-memory transcoder: "encodes" by prefixing the input bytes.
#[derive(Default)]
struct MemoryTranscoder {
    files: Mutex<HashMap<String, Vec<u8>>>,
    runs: Mutex<Vec<Vec<String>>>,
    progress: Mutex<Option<ProgressCallback>>,
    loads: AtomicUsize,
    fail_load: AtomicBool,
    failing_runs: AtomicUsize,
    hold_runs: AtomicBool,
    reported_progress: Mutex<Vec<f64>>,
    entered: Notify,
    release: Notify,
}

impl MemoryTranscoder {
    fn last_args(&self) -> Vec<String> {
        self.runs.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn staged_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transcoder for MemoryTranscoder {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, _core: &CoreSpec) -> BlurfadeResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(BlurfadeError::load("core fetch failed"));
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> BlurfadeResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> BlurfadeResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BlurfadeError::transcode(format!("no such file: {name}")))
    }

    async fn unlink(&self, name: &str) -> BlurfadeResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BlurfadeError::transcode(format!("no such file: {name}")))
    }

    async fn run(&self, args: &[String]) -> BlurfadeResult<()> {
        self.runs.lock().unwrap().push(args.to_vec());
        let callback = self.progress.lock().unwrap().clone();

        let report = |ratio: f64| {
            self.reported_progress.lock().unwrap().push(ratio);
            if let Some(cb) = &callback {
                cb(ratio);
            }
        };

        report(0.42);
        if self.hold_runs.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        if self
            .failing_runs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BlurfadeError::transcode("encoder crashed"));
        }

        let input_pos = args.iter().position(|a| a == "-i").unwrap() + 1;
        let input = self.read_file(&args[input_pos]).await?;
        let mut output = b"encoded:".to_vec();
        output.extend_from_slice(&input);
        let output_name = args.last().unwrap().clone();
        self.files.lock().unwrap().insert(output_name, output);

        report(1.7);
        Ok(())
    }

    fn set_progress(&self, callback: Option<ProgressCallback>) {
        *self.progress.lock().unwrap() = callback;
    }
}

fn setup() -> (Arc<MemoryTranscoder>, Arc<CapabilityRegistry>, Arc<TranscodeOrchestrator>) {
    let transcoder = Arc::new(MemoryTranscoder::default());
    let registry = Arc::new(CapabilityRegistry::new());
    let orchestrator = Arc::new(TranscodeOrchestrator::new(
        registry.clone(),
        TranscoderConfig::default(),
    ));
    (transcoder, registry, orchestrator)
}

async fn ready() -> (Arc<MemoryTranscoder>, Arc<TranscodeOrchestrator>) {
    let (transcoder, registry, orchestrator) = setup();
    registry.provide_transcoder(transcoder.clone());
    assert_eq!(
        orchestrator.load(&CancellationToken::new()).await,
        EncoderState::Ready
    );
    (transcoder, orchestrator)
}

#[tokio::test]
async fn load_reaches_ready_once() {
    let (transcoder, orchestrator) = ready().await;
    assert!(orchestrator.can_export(MediaKind::Video));

    let again = orchestrator.load(&CancellationToken::new()).await;
    assert_eq!(again, EncoderState::Ready);
    assert_eq!(transcoder.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn load_failure_is_terminal_and_blocks_video() {
    let (transcoder, registry, orchestrator) = setup();
    transcoder.fail_load.store(true, Ordering::SeqCst);
    registry.provide_transcoder(transcoder.clone());

    let state = orchestrator.load(&CancellationToken::new()).await;
    assert!(matches!(state, EncoderState::LoadFailed { .. }));
    assert!(!orchestrator.can_export(MediaKind::Video));
    assert!(orchestrator.can_export(MediaKind::Image));

    let result = orchestrator
        .transcode(b"video", &EffectParameters::NONE, VideoContainer::Mp4)
        .await;
    assert!(matches!(result, Err(BlurfadeError::EncoderNotReady)));
    assert!(transcoder.runs.lock().unwrap().is_empty());

    // No retry.
    transcoder.fail_load.store(false, Ordering::SeqCst);
    let state = orchestrator.load(&CancellationToken::new()).await;
    assert!(matches!(state, EncoderState::LoadFailed { .. }));
    assert_eq!(transcoder.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn load_waits_for_late_capability() {
    let (transcoder, registry, orchestrator) = setup();
    let task = orchestrator.spawn_load(CancellationToken::new());

    tokio::task::yield_now().await;
    assert_eq!(orchestrator.encoder_state(), EncoderState::Loading);
    assert!(!orchestrator.can_export(MediaKind::Video));

    registry.provide_transcoder(transcoder.clone());
    assert_eq!(task.await.unwrap(), EncoderState::Ready);
}

#[tokio::test]
async fn cancelled_load_returns_to_unloaded() {
    let (transcoder, registry, orchestrator) = setup();
    let cancel = CancellationToken::new();
    let task = orchestrator.spawn_load(cancel.clone());

    tokio::task::yield_now().await;
    cancel.cancel();
    assert_eq!(task.await.unwrap(), EncoderState::Unloaded);
    assert_eq!(transcoder.loads.load(Ordering::SeqCst), 0);

    registry.provide_transcoder(transcoder.clone());
    let state = orchestrator.load(&CancellationToken::new()).await;
    assert_eq!(state, EncoderState::Ready);
}

#[tokio::test]
async fn transcode_with_fade_stages_runs_and_cleans_up() {
    let (transcoder, orchestrator) = ready().await;
    let mut params = EffectParameters::NONE;
    params.toggle(EffectKind::Fade, PresetLevel::Middle);

    let output = orchestrator
        .transcode(b"frames", &params, VideoContainer::Mp4)
        .await
        .unwrap();

    assert_eq!(output.bytes, b"encoded:frames".to_vec());
    assert_eq!(output.mime(), "video/mp4");

    let args = transcoder.last_args();
    assert_eq!(args[..2], ["-i", "inputfile"]);
    assert!(args.contains(&"drawbox=y=ih/3:h=ih*2/3:w=iw:color=black@0.7:t=fill".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("boxblur")));
    assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
    assert_eq!(transcoder.staged_count(), 0);

    let status = orchestrator.status();
    assert!(!status.processing);
    assert_eq!(status.progress_percent, 0.0);
    assert_eq!(status.job, JobState::Idle);
}

#[tokio::test]
async fn toggled_off_blur_sends_no_filters() {
    let (transcoder, orchestrator) = ready().await;
    let mut params = EffectParameters::NONE;
    params.toggle(EffectKind::Blur, PresetLevel::Light);
    params.toggle(EffectKind::Blur, PresetLevel::Light);
    assert_eq!(params.blur_intensity, 0.0);

    orchestrator
        .transcode(b"frames", &params, VideoContainer::Webm)
        .await
        .unwrap();

    let args = transcoder.last_args();
    assert!(!args.iter().any(|a| a == "-vf"));
    assert_eq!(args.last().map(String::as_str), Some("output.webm"));
}

#[tokio::test]
async fn second_job_is_rejected_while_first_runs() {
    let (transcoder, orchestrator) = ready().await;
    transcoder.hold_runs.store(true, Ordering::SeqCst);

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .transcode(b"first", &EffectParameters::new(30.0, 0.0), VideoContainer::Mp4)
                .await
        })
    };
    transcoder.entered.notified().await;

    let status = orchestrator.status();
    assert!(status.processing);
    assert_eq!(status.job, JobState::Running);
    assert!((status.progress_percent - 42.0).abs() < 1e-9);
    assert!(!orchestrator.can_export(MediaKind::Video));
    assert!(!orchestrator.can_export(MediaKind::Image));

    let second = orchestrator
        .transcode(b"second", &EffectParameters::NONE, VideoContainer::Mp4)
        .await;
    assert!(matches!(second, Err(BlurfadeError::JobInFlight)));

    transcoder.release.notify_one();
    let output = first.await.unwrap().unwrap();
    assert_eq!(output.bytes, b"encoded:first".to_vec());
    assert_eq!(transcoder.runs.lock().unwrap().len(), 1);
    assert!(orchestrator.can_export(MediaKind::Video));
}

#[tokio::test]
async fn progress_above_one_is_clamped() {
    let (transcoder, orchestrator) = ready().await;
    let mut rx = orchestrator.subscribe();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let seen = seen.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                seen.lock().unwrap().push(rx.borrow_and_update().progress_percent);
            }
        })
    };

    orchestrator
        .transcode(b"x", &EffectParameters::NONE, VideoContainer::Mp4)
        .await
        .unwrap();
    drop(orchestrator);
    watcher.await.unwrap();

    assert_eq!(*transcoder.reported_progress.lock().unwrap(), vec![0.42, 1.7]);
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .all(|p| (0.0..=100.0).contains(p)));
}

#[tokio::test]
async fn failed_run_resets_and_next_export_succeeds() {
    let (transcoder, orchestrator) = ready().await;
    transcoder.failing_runs.store(1, Ordering::SeqCst);

    let err = orchestrator
        .transcode(b"clip", &EffectParameters::new(60.0, 60.0), VideoContainer::Mp4)
        .await
        .unwrap_err();
    assert!(matches!(err, BlurfadeError::Transcode { .. }));

    let status = orchestrator.status();
    assert!(!status.processing);
    assert_eq!(status.progress_percent, 0.0);
    assert_eq!(status.job, JobState::Idle);
    assert_eq!(status.encoder, EncoderState::Ready);
    assert_eq!(transcoder.staged_count(), 0);

    let output = orchestrator
        .transcode(b"clip", &EffectParameters::new(60.0, 60.0), VideoContainer::Mp4)
        .await
        .unwrap();
    assert_eq!(output.bytes, b"encoded:clip".to_vec());
}
