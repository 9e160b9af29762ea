//! Bottom fade: a vertical black gradient over the lower two-thirds.
//!
//! The gradient starts fully transparent at one third of the height and
//! reaches `opacity` at the bottom edge. It is composited source-over onto
//! the surface row by row.

use image::RgbaImage;

use blurfade_media_model::DARKEN_START_FRACTION;

/// Darken the bottom of `surface` with peak `opacity` in `[0, 1]`.
pub fn apply_fade(surface: &mut RgbaImage, opacity: f64) {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let height = surface.height();
    if opacity == 0.0 || height == 0 {
        return;
    }

    let alphas: Vec<f64> = (0..height)
        .map(|y| row_alpha(y, height, opacity))
        .collect();

    for (_, y, pixel) in surface.enumerate_pixels_mut() {
        let a = alphas[y as usize];
        if a <= 0.0 {
            continue;
        }
        let dst_alpha = pixel[3] as f64 / 255.0;
        let out_alpha = a + dst_alpha * (1.0 - a);
        if out_alpha <= 0.0 {
            continue;
        }
        // Black source contributes nothing to colour.
        let keep = dst_alpha * (1.0 - a) / out_alpha;
        for c in 0..3 {
            pixel[c] = (pixel[c] as f64 * keep).round() as u8;
        }
        pixel[3] = (out_alpha * 255.0).round() as u8;
    }
}

/// Gradient alpha at the centre of row `y`.
pub fn row_alpha(y: u32, height: u32, opacity: f64) -> f64 {
    let h = height as f64;
    let start = h * DARKEN_START_FRACTION;
    let span = h - start;
    let center = y as f64 + 0.5;
    if center < start || span <= 0.0 {
        return 0.0;
    }
    opacity * ((center - start) / span).clamp(0.0, 1.0)
}
