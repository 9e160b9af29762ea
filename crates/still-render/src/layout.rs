//! Display sizing for the raster surface.
//!
//! The surface always holds the source at natural resolution. Only the
//! on-screen box scales, preserving aspect ratio within the viewport.

/// On-screen size of the surface, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub const ZERO: DisplaySize = DisplaySize {
        width: 0.0,
        height: 0.0,
    };
}

/// Contain-fit a `natural_width x natural_height` image into a viewport.
///
/// Fills the viewport width first; if that overflows the height, fits to
/// the height instead.
pub fn fit_display_size(
    natural_width: u32,
    natural_height: u32,
    viewport_width: f64,
    viewport_height: f64,
) -> DisplaySize {
    if natural_width == 0
        || natural_height == 0
        || !(viewport_width > 0.0)
        || !(viewport_height > 0.0)
    {
        return DisplaySize::ZERO;
    }

    let aspect = natural_width as f64 / natural_height as f64;
    let mut width = viewport_width;
    let mut height = viewport_width / aspect;
    if height > viewport_height {
        height = viewport_height;
        width = viewport_height * aspect;
    }
    DisplaySize { width, height }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_fits_width() {
        let size = fit_display_size(1920, 1080, 800.0, 800.0);
        assert_eq!(size.width, 800.0);
        assert_eq!(size.height, 450.0);
    }

    #[test]
    fn tall_image_fits_height() {
        let size = fit_display_size(1000, 2000, 800.0, 600.0);
        assert_eq!(size.height, 600.0);
        assert_eq!(size.width, 300.0);
    }

    #[test]
    fn degenerate_inputs_collapse() {
        assert_eq!(fit_display_size(0, 10, 100.0, 100.0), DisplaySize::ZERO);
        assert_eq!(fit_display_size(10, 10, 0.0, 100.0), DisplaySize::ZERO);
        assert_eq!(fit_display_size(10, 10, f64::NAN, 100.0), DisplaySize::ZERO);
    }
}
