//! Blur & Fade Still-Image Renderer
//!
//! Renders a source image plus the current effects onto a raster surface
//! kept at the source's natural resolution:
//! - **Stack Blur:** Separable triangular blur, the default blur capability
//! - **Fade:** Bottom two-thirds linear darkening gradient
//! - **Layout:** Contain-fit display sizing, independent of the pixel buffer
//!
//! Every render starts again from the source, so the surface never carries
//! state from a previous parameter set.

pub mod gradient;
pub mod layout;
pub mod renderer;
pub mod stack_blur;

pub use layout::{fit_display_size, DisplaySize};
pub use renderer::{render_still, StillRenderer};
pub use stack_blur::{BlurProvider, StackBlur};
