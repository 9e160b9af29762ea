//! Check encoder availability.

use blurfade_common::config::AppConfig;
use blurfade_transcode_engine::ffmpeg::command_exists;
use blurfade_transcode_engine::{FfmpegTranscoder, Transcoder};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Blur & Fade System Check");
    println!("{}", "=".repeat(50));

    let core = &config.transcoder.core;
    let ffmpeg_found = command_exists(&core.url);
    if ffmpeg_found {
        println!("[OK] ffmpeg: {}", core.url);
    } else {
        println!("[FAIL] ffmpeg not found: {}", core.url);
    }

    let ffprobe = &config.transcoder.ffprobe_binary;
    if command_exists(ffprobe) {
        println!("[OK] ffprobe: {ffprobe}");
    } else {
        println!("[WARN] ffprobe not found: {ffprobe} (video progress will not be reported)");
    }

    let mut encoder_ok = false;
    if ffmpeg_found {
        let transcoder = FfmpegTranscoder::from_config(&config.transcoder);
        match transcoder.load(core).await {
            Ok(()) => {
                encoder_ok = true;
                println!("[OK] Encoder core loads");
            }
            Err(e) => println!("[FAIL] Encoder core: {e}"),
        }
    }
    println!("[OK] Still renderer: stack blur");

    println!();
    if encoder_ok {
        println!("Images and videos can be edited.");
    } else {
        println!("Images can be edited. Video export needs a working ffmpeg.");
    }

    Ok(())
}
