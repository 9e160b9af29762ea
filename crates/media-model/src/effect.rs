//! Effect parameters and their per-pipeline conversions.
//!
//! Both effects are expressed as a single unitless intensity. Each pipeline
//! converts the intensity into its own units:
//!
//! | Quantity        | Raster surface     | Filter graph         |
//! |-----------------|--------------------|----------------------|
//! | Blur radius     | `blur`             | `blur / 4`           |
//! | Fade opacity    | `fade / 200`       | `fade / 200`         |
//! | Darken region   | rows `h/3 ..= h`   | `y=ih/3`, `h=ih*2/3` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fade intensity that maps to full opacity.
pub const FADE_FULL_SCALE: f64 = 200.0;

/// Ratio between the raster stack-blur radius and the filter-graph
/// `boxblur` radius that makes the same preset look alike on both paths.
///
/// Tuned by eye, not derived. Keep the value exact.
pub const FILTER_BLUR_DIVISOR: f64 = 4.0;

/// Ratio between the blur intensity and the CSS-style blur used for the live
/// video preview.
pub const PREVIEW_BLUR_DIVISOR: f64 = 15.0;

/// Fraction of the frame height where darkening starts.
pub const DARKEN_START_FRACTION: f64 = 1.0 / 3.0;

/// The two effect intensities.
///
/// The intensities are independent: changing one never touches the other.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Blur intensity (>= 0).
    pub blur_intensity: f64,
    /// Fade/darkening intensity (>= 0).
    pub fade_intensity: f64,
}

/// Which effect a control drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Blur,
    Fade,
}

/// Discrete preset levels offered by the effect controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetLevel {
    Light,
    Middle,
    Full,
}

impl EffectParameters {
    /// No blur, no fade.
    pub const NONE: EffectParameters = EffectParameters {
        blur_intensity: 0.0,
        fade_intensity: 0.0,
    };

    pub fn new(blur_intensity: f64, fade_intensity: f64) -> Self {
        Self {
            blur_intensity: non_negative(blur_intensity),
            fade_intensity: non_negative(fade_intensity),
        }
    }

    pub fn set_blur(&mut self, intensity: f64) {
        self.blur_intensity = non_negative(intensity);
    }

    pub fn set_fade(&mut self, intensity: f64) {
        self.fade_intensity = non_negative(intensity);
    }

    /// Current intensity of one effect.
    pub fn intensity(&self, kind: EffectKind) -> f64 {
        match kind {
            EffectKind::Blur => self.blur_intensity,
            EffectKind::Fade => self.fade_intensity,
        }
    }

    /// Apply a preset click: selecting the already-active preset turns the
    /// effect off, anything else selects the preset.
    pub fn toggle(&mut self, kind: EffectKind, level: PresetLevel) {
        let next = toggled_intensity(self.intensity(kind), level.intensity(kind));
        match kind {
            EffectKind::Blur => self.set_blur(next),
            EffectKind::Fade => self.set_fade(next),
        }
    }

    pub fn toggle_blur(&mut self, level: PresetLevel) {
        self.toggle(EffectKind::Blur, level);
    }

    pub fn toggle_fade(&mut self, level: PresetLevel) {
        self.toggle(EffectKind::Fade, level);
    }

    /// Preset matching the current intensity, if any.
    pub fn active_preset(&self, kind: EffectKind) -> Option<PresetLevel> {
        let current = self.intensity(kind);
        PresetLevel::ALL
            .into_iter()
            .find(|level| level.intensity(kind) == current)
    }

    pub fn has_blur(&self) -> bool {
        self.blur_intensity > 0.0
    }

    pub fn has_fade(&self) -> bool {
        self.fade_intensity > 0.0
    }

    /// True when neither effect is applied.
    pub fn is_identity(&self) -> bool {
        !self.has_blur() && !self.has_fade()
    }

    /// Stack-blur radius in pixels for the raster surface.
    ///
    /// Any positive intensity blurs by at least one pixel, so the still and
    /// the filter graph agree on whether blur is on.
    pub fn raster_blur_radius(&self) -> u32 {
        if !self.has_blur() {
            return 0;
        }
        self.blur_intensity.round().clamp(1.0, u32::MAX as f64) as u32
    }

    /// Opacity of the gradient's bottom stop on the raster surface.
    pub fn raster_fade_opacity(&self) -> f64 {
        fade_opacity(self.fade_intensity)
    }

    /// `boxblur` radius for the filter graph.
    pub fn filter_blur_radius(&self) -> f64 {
        self.blur_intensity / FILTER_BLUR_DIVISOR
    }

    /// Darken-box opacity for the filter graph.
    pub fn filter_fade_opacity(&self) -> f64 {
        fade_opacity(self.fade_intensity)
    }

    /// Approximate live preview for video, which cannot be re-rendered
    /// per frame.
    pub fn video_preview(&self) -> VideoPreviewStyle {
        VideoPreviewStyle {
            blur_px: self.blur_intensity / PREVIEW_BLUR_DIVISOR,
            fade_opacity: if self.has_fade() {
                Some(self.raster_fade_opacity())
            } else {
                None
            },
        }
    }
}

/// CSS-level approximation of the effects for a playing video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoPreviewStyle {
    /// Gaussian blur in CSS pixels.
    pub blur_px: f64,
    /// Bottom opacity of the darkening overlay, when fade is on.
    pub fade_opacity: Option<f64>,
}

impl VideoPreviewStyle {
    /// Value for a CSS `filter` property.
    pub fn css_filter(&self) -> String {
        format!("blur({}px)", self.blur_px)
    }

    /// Value for a CSS `background` property of the overlay element.
    pub fn css_overlay_background(&self) -> Option<String> {
        let percent = (DARKEN_START_FRACTION * 100.0).floor();
        self.fade_opacity.map(|opacity| {
            format!("linear-gradient(to bottom, transparent {percent}%, rgba(0,0,0,{opacity}))")
        })
    }
}

impl PresetLevel {
    pub const ALL: [PresetLevel; 3] = [PresetLevel::Light, PresetLevel::Middle, PresetLevel::Full];

    pub fn label(&self) -> &'static str {
        match self {
            PresetLevel::Light => "Light",
            PresetLevel::Middle => "Middle",
            PresetLevel::Full => "Full",
        }
    }

    /// Intensity this preset selects for an effect.
    pub fn intensity(&self, kind: EffectKind) -> f64 {
        match (kind, self) {
            (EffectKind::Blur, PresetLevel::Light) => 30.0,
            (EffectKind::Blur, PresetLevel::Middle) => 60.0,
            (EffectKind::Blur, PresetLevel::Full) => 100.0,
            (EffectKind::Fade, PresetLevel::Light) => 60.0,
            (EffectKind::Fade, PresetLevel::Middle) => 140.0,
            (EffectKind::Fade, PresetLevel::Full) => 200.0,
        }
    }
}

impl fmt::Display for PresetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PresetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(PresetLevel::Light),
            "middle" | "medium" => Ok(PresetLevel::Middle),
            "full" => Ok(PresetLevel::Full),
            other => Err(format!(
                "Unknown preset: {other}. Use: light, middle, full"
            )),
        }
    }
}

/// Click-to-toggle-off: selecting the current value yields 0.
pub fn toggled_intensity(current: f64, selected: f64) -> f64 {
    if current == selected {
        0.0
    } else {
        selected
    }
}

fn fade_opacity(intensity: f64) -> f64 {
    (intensity / FADE_FULL_SCALE).clamp(0.0, 1.0)
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
