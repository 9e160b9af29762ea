//! Print the ffmpeg arguments for a set of effects.

use blurfade_media_model::{EffectParameters, PresetLevel, VideoContainer};
use blurfade_transcode_engine::filter::{compile_transcode_args, compile_video_filters};

pub fn run(
    blur: Option<PresetLevel>,
    fade: Option<PresetLevel>,
    container: VideoContainer,
    json: bool,
) -> anyhow::Result<()> {
    let mut params = EffectParameters::NONE;
    if let Some(level) = blur {
        params.toggle_blur(level);
    }
    if let Some(level) = fade {
        params.toggle_fade(level);
    }

    let output = format!("output.{}", container.extension());
    let args = compile_transcode_args(&params, "inputfile", &output, container);

    if json {
        println!("{}", serde_json::to_string_pretty(&args)?);
        return Ok(());
    }

    println!("Blur: {} / Fade: {}", params.blur_intensity, params.fade_intensity);
    match compile_video_filters(&params) {
        Some(filters) => println!("Filters: {filters}"),
        None => println!("Filters: (none)"),
    }
    println!("ffmpeg {}", args.join(" "));
    Ok(())
}
