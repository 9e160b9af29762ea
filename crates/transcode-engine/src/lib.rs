//! Blur & Fade Transcode Engine
//!
//! The video half of the editor:
//! - **Filter compiler:** Effect parameters to an ffmpeg argument list
//! - **Transcoder:** Async capability trait plus an ffmpeg process backend
//! - **Capabilities:** Readiness registry for the transcoder and blur provider
//! - **Orchestrator:** Encoder load lifecycle and single-flight transcode jobs

pub mod capability;
pub mod ffmpeg;
pub mod filter;
pub mod orchestrator;
pub mod transcoder;

pub use capability::CapabilityRegistry;
pub use ffmpeg::FfmpegTranscoder;
pub use filter::{compile_transcode_args, compile_video_filters};
pub use orchestrator::{
    EncoderState, JobState, OrchestratorStatus, TranscodeOrchestrator, TranscodeOutput,
};
pub use transcoder::{ProgressCallback, Transcoder};
