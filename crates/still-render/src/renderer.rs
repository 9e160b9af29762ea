//! Still-image renderer: source + effects -> raster surface -> PNG.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_media_model::EffectParameters;

use crate::gradient::apply_fade;
use crate::layout::{fit_display_size, DisplaySize};
use crate::stack_blur::BlurProvider;

/// Owns the decoded source and the raster surface it is rendered onto.
///
/// The surface is sized to the source's natural resolution. Every
/// [`render`](StillRenderer::render) restarts from the source pixels.
#[derive(Debug, Default)]
pub struct StillRenderer {
    source: Option<RgbaImage>,
    surface: Option<RgbaImage>,
    display: Option<DisplaySize>,
}

impl StillRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode encoded image bytes and make them the render source.
    pub fn decode_source(&mut self, bytes: &[u8]) -> BlurfadeResult<()> {
        let source = decode_image(bytes)?;
        self.load_source(source);
        Ok(())
    }

    /// Install an already decoded source. Clears the surface.
    pub fn load_source(&mut self, source: RgbaImage) {
        tracing::debug!(
            width = source.width(),
            height = source.height(),
            "Still source loaded"
        );
        self.surface = None;
        self.display = None;
        self.source = Some(source);
    }

    /// Drop the source and surface.
    pub fn clear(&mut self) {
        self.source = None;
        self.surface = None;
        self.display = None;
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Natural `(width, height)` of the loaded source.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(|s| (s.width(), s.height()))
    }

    /// Redraw the surface: copy the source, blur, then fade.
    ///
    /// With no blur provider, a non-zero blur is skipped and only the fade
    /// is applied.
    pub fn render(
        &mut self,
        params: &EffectParameters,
        blur: Option<&dyn BlurProvider>,
    ) -> BlurfadeResult<&RgbaImage> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| BlurfadeError::render("No still image loaded"))?;

        let surface = self.surface.get_or_insert_with(|| source.clone());
        if surface.dimensions() == source.dimensions() {
            surface.copy_from_slice(source.as_raw());
        } else {
            *surface = source.clone();
        }

        apply_effects(surface, params, blur);
        Ok(surface)
    }

    /// Last rendered surface.
    pub fn surface(&self) -> Option<&RgbaImage> {
        self.surface.as_ref()
    }

    /// Encode the current surface as PNG.
    pub fn encode_png(&self) -> BlurfadeResult<Vec<u8>> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| BlurfadeError::render("Nothing rendered yet"))?;
        encode_png(surface)
    }

    /// Recompute the on-screen size for a viewport.
    pub fn layout(&mut self, viewport_width: f64, viewport_height: f64) -> Option<DisplaySize> {
        let (w, h) = self.natural_size()?;
        let size = fit_display_size(w, h, viewport_width, viewport_height);
        self.display = Some(size);
        Some(size)
    }

    /// Size from the last [`layout`](StillRenderer::layout) call.
    pub fn display_size(&self) -> Option<DisplaySize> {
        self.display
    }
}

/// Render `source` with `params` into a new image.
pub fn render_still(
    source: &RgbaImage,
    params: &EffectParameters,
    blur: Option<&dyn BlurProvider>,
) -> RgbaImage {
    let mut surface = source.clone();
    apply_effects(&mut surface, params, blur);
    surface
}

fn apply_effects(
    surface: &mut RgbaImage,
    params: &EffectParameters,
    blur: Option<&dyn BlurProvider>,
) {
    let (width, height) = surface.dimensions();

    let radius = params.raster_blur_radius();
    if radius > 0 {
        match blur {
            Some(provider) => {
                tracing::trace!(provider = provider.name(), radius, "Blurring surface");
                provider.blur_region(surface, 0, 0, width, height, radius);
            }
            None => tracing::warn!(radius, "Blur capability not available; skipping blur"),
        }
    }

    if params.has_fade() {
        apply_fade(surface, params.raster_fade_opacity());
    }
}

/// Decode any supported image format into RGBA8.
pub fn decode_image(bytes: &[u8]) -> BlurfadeResult<RgbaImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| BlurfadeError::render(format!("Failed to decode image: {e}")))?;
    Ok(decoded.to_rgba8())
}

/// Encode an RGBA surface as PNG bytes.
pub fn encode_png(surface: &RgbaImage) -> BlurfadeResult<Vec<u8>> {
    let mut bytes = Vec::new();
    surface
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| BlurfadeError::render(format!("PNG encode failed: {e}")))?;
    Ok(bytes)
}
