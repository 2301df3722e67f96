//! Grain overlay: scale-to-cover, center crop, opacity, blend.
//!
//! # Compositing
//! With backdrop `Cb, αb` (main image) and source `Cs, αs` (grain, alpha
//! already multiplied by opacity):
//! ```text
//! αo = αs + αb·(1 − αs)
//! co = αs·((1 − αb)·Cs + αb·B(Cb, Cs)) + (1 − αs)·αb·Cb
//! Co = co / αo
//! ```
//! For an opaque backdrop this is `lerp(Cb, B(Cb, Cs), αs)`, so the output
//! moves monotonically toward the full blend as opacity rises and equals the
//! backdrop at opacity 0.

use ::image::imageops::{self, FilterType};
use ::image::Rgba32FImage;

use crate::grain::{BlendMode, GrainError};
use crate::raster::RasterImage;

/// Composite `grain` over `main`. The result always has `main`'s extent.
pub fn overlay(
    main: &RasterImage,
    grain: &RasterImage,
    opacity: f32,
    mode: BlendMode,
) -> Result<RasterImage, GrainError> {
    if main.is_empty() {
        return Err(GrainError::ZeroArea {
            layer: "main",
            width: main.width,
            height: main.height,
        });
    }
    if grain.is_empty() {
        return Err(GrainError::ZeroArea {
            layer: "grain",
            width: grain.width,
            height: grain.height,
        });
    }

    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if opacity <= 0.0 {
        return Ok(main.clone());
    }

    let texture = cover(grain, main.width, main.height);

    let pixels = main
        .pixels
        .iter()
        .zip(texture.pixels())
        .map(|(backdrop, source)| composite(*backdrop, source.0, opacity, mode))
        .collect();

    Ok(RasterImage {
        width: main.width,
        height: main.height,
        pixels,
        source_bit_depth: main.source_bit_depth,
    })
}

/// Validate `mode_name` against the registry, then [`overlay`].
pub fn overlay_named(
    main: &RasterImage,
    grain: &RasterImage,
    opacity: f32,
    mode_name: &str,
) -> Result<RasterImage, GrainError> {
    let mode: BlendMode = mode_name.parse()?;
    overlay(main, grain, opacity, mode)
}

/// Uniformly scale `grain` so it covers `width × height`, then center-crop.
fn cover(grain: &RasterImage, width: u32, height: u32) -> Rgba32FImage {
    let scale = f64::max(
        f64::from(width) / f64::from(grain.width),
        f64::from(height) / f64::from(grain.height),
    );
    let scaled_w = ((f64::from(grain.width) * scale).round() as u32).max(width);
    let scaled_h = ((f64::from(grain.height) * scale).round() as u32).max(height);

    let source = grain.to_rgba32f();
    let mut scaled = if (scaled_w, scaled_h) == (grain.width, grain.height) {
        source
    } else {
        imageops::resize(&source, scaled_w, scaled_h, FilterType::Lanczos3)
    };
    // Lanczos rings past the input range on hard edges.
    for px in scaled.pixels_mut() {
        for v in px.0.iter_mut() {
            *v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        }
    }

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

fn composite(backdrop: [f32; 4], source: [f32; 4], opacity: f32, mode: BlendMode) -> [f32; 4] {
    let ab = backdrop[3];
    let a_s = source[3] * opacity;
    if a_s <= 0.0 {
        return backdrop;
    }

    let ao = a_s + ab * (1.0 - a_s);
    if ao <= 0.0 {
        return [0.0; 4];
    }

    let mut out = [0.0_f32; 4];
    for c in 0..3 {
        let cb = backdrop[c];
        let cs = source[c];
        let mixed = (1.0 - ab) * cs + ab * mode.blend(cb, cs);
        let co = a_s * mixed + (1.0 - a_s) * ab * cb;
        out[c] = (co / ao).clamp(0.0, 1.0);
    }
    out[3] = ao.clamp(0.0, 1.0);
    out
}
