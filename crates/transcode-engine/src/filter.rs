//! Effect parameters -> ffmpeg filter graph and argument list.
//!
//! Pure functions. The same parameters always produce the same arguments.

use blurfade_media_model::{EffectParameters, VideoContainer};

/// Region darkened by the fade: the bottom two-thirds of each frame.
const FADE_DRAWBOX: &str = "drawbox=y=ih/3:h=ih*2/3:w=iw";

/// Build the `-vf` filter chain, or `None` when no effect applies.
pub fn compile_video_filters(params: &EffectParameters) -> Option<String> {
    let mut filters = Vec::with_capacity(2);

    if params.has_blur() {
        filters.push(format!("boxblur={}", params.filter_blur_radius()));
    }
    if params.has_fade() {
        filters.push(format!(
            "{FADE_DRAWBOX}:color=black@{}:t=fill",
            params.filter_fade_opacity()
        ));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// Encoder arguments for an output container.
pub fn codec_args(container: VideoContainer) -> &'static [&'static str] {
    match container {
        VideoContainer::Mp4 => &["-c:v", "libx264", "-preset", "ultrafast"],
        VideoContainer::Webm => &["-c:v", "libvpx-vp9", "-deadline", "realtime", "-cpu-used", "8"],
    }
}

/// Full argument list: input, optional filters, audio copy, codec, output.
pub fn compile_transcode_args(
    params: &EffectParameters,
    input: &str,
    output: &str,
    container: VideoContainer,
) -> Vec<String> {
    let mut args = vec!["-i".to_string(), input.to_string()];

    if let Some(filters) = compile_video_filters(params) {
        args.push("-vf".to_string());
        args.push(filters);
    }

    args.extend(["-c:a", "copy"].iter().map(|s| s.to_string()));
    args.extend(codec_args(container).iter().map(|s| s.to_string()));
    args.push(output.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use blurfade_media_model::{EffectKind, PresetLevel};
    use proptest::prelude::*;

    #[test]
    fn no_effects_no_filters() {
        assert_eq!(compile_video_filters(&EffectParameters::NONE), None);
        let args = compile_transcode_args(
            &EffectParameters::NONE,
            "inputfile",
            "output.mp4",
            VideoContainer::Mp4,
        );
        assert!(!args.iter().any(|a| a == "-vf"));
        assert_eq!(
            args,
            vec![
                "-i", "inputfile", "-c:a", "copy", "-c:v", "libx264", "-preset", "ultrafast",
                "output.mp4"
            ]
        );
    }

    #[test]
    fn blur_presets_divide_by_four() {
        let radii: Vec<String> = PresetLevel::ALL
            .iter()
            .map(|level| {
                let mut params = EffectParameters::NONE;
                params.toggle(EffectKind::Blur, *level);
                compile_video_filters(&params).unwrap()
            })
            .collect();
        assert_eq!(radii, vec!["boxblur=7.5", "boxblur=15", "boxblur=25"]);
    }

    #[test]
    fn middle_fade_drawbox() {
        let params = EffectParameters::new(0.0, 140.0);
        assert_eq!(
            compile_video_filters(&params).unwrap(),
            "drawbox=y=ih/3:h=ih*2/3:w=iw:color=black@0.7:t=fill"
        );
    }

    #[test]
    fn blur_then_fade_joined_with_comma() {
        let params = EffectParameters::new(60.0, 200.0);
        assert_eq!(
            compile_video_filters(&params).unwrap(),
            "boxblur=15,drawbox=y=ih/3:h=ih*2/3:w=iw:color=black@1:t=fill"
        );
    }

    #[test]
    fn webm_args_use_vp9_realtime() {
        let args = compile_transcode_args(
            &EffectParameters::new(30.0, 60.0),
            "inputfile",
            "output.webm",
            VideoContainer::Webm,
        );
        assert_eq!(
            args,
            vec![
                "-i",
                "inputfile",
                "-vf",
                "boxblur=7.5,drawbox=y=ih/3:h=ih*2/3:w=iw:color=black@0.3:t=fill",
                "-c:a",
                "copy",
                "-c:v",
                "libvpx-vp9",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "output.webm",
            ]
        );
    }

    proptest! {
        #[test]
        fn compilation_is_pure(blur in 0.0f64..150.0, fade in 0.0f64..250.0) {
            let params = EffectParameters::new(blur, fade);
            let a = compile_transcode_args(&params, "in", "out.mp4", VideoContainer::Mp4);
            let b = compile_transcode_args(&params, "in", "out.mp4", VideoContainer::Mp4);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.first().map(String::as_str), Some("-i"));
            prop_assert_eq!(a.last().map(String::as_str), Some("out.mp4"));
            let has_vf = a.iter().any(|s| s == "-vf");
            prop_assert_eq!(has_vf, !params.is_identity());
        }
    }
}
