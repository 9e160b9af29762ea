//! Stack blur: a separable blur with a triangular kernel.
//!
//! Each pass weights the neighbour at offset `i` by `radius + 1 - |i|`, so
//! the kernel sums to `(radius + 1)^2`. Running sums make a pass cost
//! O(pixels) regardless of radius. Samples past the edge clamp to the edge
//! pixel.
//!
//! Radii are capped at the longest side of the blurred region. Beyond that
//! every window already spans the whole line.

use image::RgbaImage;

/// Blur capability: blurs a rectangle of a surface in place.
pub trait BlurProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Blur the region `(x, y, width, height)` of `surface` with `radius`.
    ///
    /// Regions extending past the surface are clipped.
    fn blur_region(
        &self,
        surface: &mut RgbaImage,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        radius: u32,
    );
}

/// Built-in stack blur over all four RGBA channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackBlur;

impl StackBlur {
    pub fn new() -> Self {
        Self
    }
}

impl BlurProvider for StackBlur {
    fn name(&self) -> &str {
        "stack-blur"
    }

    fn blur_region(
        &self,
        surface: &mut RgbaImage,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        radius: u32,
    ) {
        let stride = surface.width() as usize;
        let surface_height = surface.height() as usize;
        stack_blur_rgba(
            surface,
            stride,
            surface_height,
            Region {
                x: x as usize,
                y: y as usize,
                width: width as usize,
                height: height as usize,
            },
            radius as usize,
        );
    }
}

#[derive(Debug, Clone, Copy)]
struct Region {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

/// Blur a region of a packed RGBA8 buffer in place.
fn stack_blur_rgba(
    pixels: &mut [u8],
    stride: usize,
    surface_height: usize,
    region: Region,
    radius: usize,
) {
    if radius == 0 || region.x >= stride || region.y >= surface_height {
        return;
    }
    let width = region.width.min(stride - region.x);
    let height = region.height.min(surface_height - region.y);
    if width == 0 || height == 0 {
        return;
    }

    let radius = radius.min(width.max(height));
    let mut line = vec![0u8; width.max(height) * 4];
    let mut out = vec![0u8; width.max(height) * 4];

    for row in region.y..region.y + height {
        let start = (row * stride + region.x) * 4;
        let end = start + width * 4;
        line[..width * 4].copy_from_slice(&pixels[start..end]);
        blur_line(&line[..width * 4], &mut out[..width * 4], radius);
        pixels[start..end].copy_from_slice(&out[..width * 4]);
    }

    for col in region.x..region.x + width {
        for (i, row) in (region.y..region.y + height).enumerate() {
            let idx = (row * stride + col) * 4;
            line[i * 4..i * 4 + 4].copy_from_slice(&pixels[idx..idx + 4]);
        }
        blur_line(&line[..height * 4], &mut out[..height * 4], radius);
        for (i, row) in (region.y..region.y + height).enumerate() {
            let idx = (row * stride + col) * 4;
            pixels[idx..idx + 4].copy_from_slice(&out[i * 4..i * 4 + 4]);
        }
    }
}

/// One 1D pass over a line of RGBA pixels.
fn blur_line(src: &[u8], dst: &mut [u8], radius: usize) {
    let len = src.len() / 4;
    if len == 0 {
        return;
    }
    let last = (len - 1) as isize;
    let offset = |i: isize| -> usize { i.clamp(0, last) as usize * 4 };

    let r = radius as isize;
    let side = (radius as u64).saturating_add(1);
    let divisor = side.saturating_mul(side);
    let half = divisor / 2;

    // sum: weighted window. left: samples at offsets -r..=0. right: 1..=r.
    let mut sum = [0u64; 4];
    let mut left = [0u64; 4];
    let mut right = [0u64; 4];

    for i in -r..=r {
        let idx = offset(i);
        let weight = (r + 1 - i.abs()) as u64;
        for c in 0..4 {
            let v = src[idx + c] as u64;
            sum[c] += v * weight;
            if i <= 0 {
                left[c] += v;
            } else {
                right[c] += v;
            }
        }
    }

    for x in 0..len {
        let o = x * 4;
        for c in 0..4 {
            dst[o + c] = ((sum[c] + half) / divisor) as u8;
        }

        let xi = x as isize;
        let incoming = offset(xi + r + 1);
        let outgoing = offset(xi - r);
        let center = offset(xi + 1);
        for c in 0..4 {
            let a = src[incoming + c] as u64;
            let l = src[outgoing + c] as u64;
            let m = src[center + c] as u64;
            sum[c] = sum[c] + right[c] + a - left[c];
            left[c] = left[c] + m - l;
            right[c] = right[c] + a - m;
        }
    }
}
