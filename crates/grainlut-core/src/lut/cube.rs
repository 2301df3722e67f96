//! 3D color cube built from a tiled LUT image.
//!
//! # Tiled layout
//! A cube of side `d` is stored as `d` square tiles of `d × d` pixels. Tiles
//! are read left-to-right, top-to-bottom; tile `n` is blue slice `b = n`.
//! Inside a tile the column is the red index and the row is the green index:
//! ```text
//! columns = width / d
//! b = tx + ty × columns
//! r = ox,  g = oy
//! ```
//! A horizontal strip (`d² × d`) and the square 512×512 layout of a 64³ cube
//! are both instances of this rule.
//!
//! # Application
//! Input channels are clamped to `[0, 1]`, scaled by `d − 1`, and the output
//! is the trilinear blend of the 8 enclosing lattice points. No transfer
//! function is applied; the cube operates on encoded values.

use crate::lut::LutError;
use crate::raster::{BitDepth, RasterImage};

/// An immutable `dimension³` color lookup cube.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCube {
    dimension: u32,
    /// Lattice colors, index = r + g × d + b × d².
    data: Vec<[f32; 4]>,
}

impl ColorCube {
    /// Decode a cube from a tiled LUT raster.
    pub fn build(source: &RasterImage, dimension: u32) -> Result<Self, LutError> {
        if dimension < 2 {
            return Err(LutError::DimensionTooSmall(dimension));
        }
        let (width, height) = (source.width, source.height);
        if width == 0 || height == 0 || width % dimension != 0 || height % dimension != 0 {
            return Err(LutError::NotTileAligned {
                width,
                height,
                dimension,
            });
        }

        let columns = width / dimension;
        let tiles = columns * (height / dimension);
        if tiles < dimension {
            return Err(LutError::TooFewTiles {
                width,
                height,
                dimension,
                tiles,
            });
        }

        let d = dimension as usize;
        let mut data = Vec::with_capacity(d * d * d);
        for b in 0..dimension {
            let tx = b % columns;
            let ty = b / columns;
            for g in 0..dimension {
                for r in 0..dimension {
                    data.push(source.pixel(tx * dimension + r, ty * dimension + g));
                }
            }
        }

        tracing::debug!(dimension, columns, "built color cube");
        Ok(Self { dimension, data })
    }

    /// The cube that maps every lattice point to its own coordinate.
    pub fn identity(dimension: u32) -> Self {
        let dimension = dimension.max(2);
        let max = (dimension - 1) as f32;
        let mut data = Vec::with_capacity((dimension as usize).pow(3));
        for b in 0..dimension {
            for g in 0..dimension {
                for r in 0..dimension {
                    data.push([r as f32 / max, g as f32 / max, b as f32 / max, 1.0]);
                }
            }
        }
        Self { dimension, data }
    }

    /// Side length of the cube.
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Lattice color at integer coordinates.
    pub fn lattice(&self, r: u32, g: u32, b: u32) -> [f32; 4] {
        let d = self.dimension as usize;
        self.data[r as usize + g as usize * d + b as usize * d * d]
    }

    /// Map one RGB triple through the cube.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let top = self.dimension as usize - 1;
        let scale = top as f32;

        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut frac = [0.0_f32; 3];
        for c in 0..3 {
            let v = if rgb[c].is_finite() {
                rgb[c].clamp(0.0, 1.0)
            } else {
                0.0
            };
            let x = v * scale;
            let i = (x.floor() as usize).min(top);
            lo[c] = i;
            hi[c] = (i + 1).min(top);
            frac[c] = x - i as f32;
        }

        let d = self.dimension as usize;
        let at = |r: usize, g: usize, b: usize| self.data[r + g * d + b * d * d];

        let c000 = at(lo[0], lo[1], lo[2]);
        let c100 = at(hi[0], lo[1], lo[2]);
        let c010 = at(lo[0], hi[1], lo[2]);
        let c110 = at(hi[0], hi[1], lo[2]);
        let c001 = at(lo[0], lo[1], hi[2]);
        let c101 = at(hi[0], lo[1], hi[2]);
        let c011 = at(lo[0], hi[1], hi[2]);
        let c111 = at(hi[0], hi[1], hi[2]);

        let mut out = [0.0_f32; 3];
        for c in 0..3 {
            let c00 = lerp(c000[c], c100[c], frac[0]);
            let c10 = lerp(c010[c], c110[c], frac[0]);
            let c01 = lerp(c001[c], c101[c], frac[0]);
            let c11 = lerp(c011[c], c111[c], frac[0]);
            let c0 = lerp(c00, c10, frac[1]);
            let c1 = lerp(c01, c11, frac[1]);
            out[c] = lerp(c0, c1, frac[2]);
        }
        out
    }

    /// Map every pixel of an image through the cube. Alpha is untouched.
    pub fn apply_image(&self, image: &RasterImage) -> RasterImage {
        let pixels = image
            .pixels
            .iter()
            .map(|px| {
                let [r, g, b] = self.apply([px[0], px[1], px[2]]);
                [r, g, b, px[3]]
            })
            .collect();
        RasterImage {
            width: image.width,
            height: image.height,
            pixels,
            source_bit_depth: image.source_bit_depth,
        }
    }

    /// Pack the cube back into the tiled layout, `columns` tiles per row.
    ///
    /// Tiles past the last blue slice are left opaque black.
    pub fn to_tiled_raster(&self, columns: u32) -> RasterImage {
        let dimension = self.dimension;
        let columns = columns.clamp(1, dimension);
        let rows = dimension.div_ceil(columns);
        let width = columns * dimension;
        let height = rows * dimension;

        let mut pixels = vec![[0.0, 0.0, 0.0, 1.0]; width as usize * height as usize];
        for b in 0..dimension {
            let tx = b % columns;
            let ty = b / columns;
            for g in 0..dimension {
                for r in 0..dimension {
                    let x = tx * dimension + r;
                    let y = ty * dimension + g;
                    pixels[(y * width + x) as usize] = self.lattice(r, g, b);
                }
            }
        }

        RasterImage {
            width,
            height,
            pixels,
            source_bit_depth: BitDepth::F32,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
