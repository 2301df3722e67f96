//! Raster representation and the image loader.

use std::fmt;
use std::fs::File;
use std::io::BufReader;

use ::image::{DynamicImage, ImageBuffer, ImageDecoder, ImageReader, Rgba, Rgba32FImage};
use serde::{Deserialize, Serialize};

use crate::locator;

/// Bit depth of the file a raster was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit floating point.
    F32,
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

impl From<::image::ColorType> for BitDepth {
    fn from(color: ::image::ColorType) -> Self {
        use ::image::ColorType;
        match color {
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => Self::U16,
            ColorType::Rgb32F | ColorType::Rgba32F => Self::F32,
            _ => Self::U8,
        }
    }
}

/// A decoded still image.
///
/// Samples are RGBA, normalized to `[0, 1]`, and kept in the file's native
/// encoded space. Nothing in the pipeline linearizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major RGBA samples. Length = width × height.
    pub pixels: Vec<[f32; 4]>,
    /// Bit depth of the source file.
    pub source_bit_depth: BitDepth,
}

impl RasterImage {
    /// Wrap a pixel buffer, checking that it matches the declared extent.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
            source_bit_depth: BitDepth::F32,
        })
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgba; width as usize * height as usize],
            source_bit_depth: BitDepth::F32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sample at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    pub(crate) fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Self {
            width,
            height,
            pixels,
            source_bit_depth: BitDepth::from(img.color()),
        }
    }

    pub(crate) fn to_rgba32f(&self) -> Rgba32FImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| Rgba(self.pixel(x, y)))
    }

    /// Quantize to 8-bit RGBA with `round(clamp(v) × 255)`.
    pub fn to_rgba8_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| px.map(quantize_u8))
            .collect()
    }

    /// Quantize to 8-bit RGB, dropping alpha.
    pub fn to_rgb8_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| [quantize_u8(px[0]), quantize_u8(px[1]), quantize_u8(px[2])])
            .collect()
    }
}

fn quantize_u8(v: f32) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Load the image a locator points at, with EXIF orientation applied.
///
/// Supports every format the `image` crate was built with. The format is
/// guessed from the file contents, not the extension.
pub fn load(locator: &str) -> Result<RasterImage, ImageLoadError> {
    let path = locator::resolve(locator)?;
    let file = File::open(&path)?;
    let reader = ImageReader::new(BufReader::new(file)).with_guessed_format()?;

    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    let raster = RasterImage::from_dynamic(&img);
    if raster.is_empty() {
        return Err(ImageLoadError::ZeroArea);
    }

    tracing::debug!(
        path = %path.display(),
        width = raster.width,
        height = raster.height,
        bit_depth = %raster.source_bit_depth,
        "loaded image"
    );
    Ok(raster)
}

/// Errors that can occur while loading an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] ::image::ImageError),
    #[error("image has zero area")]
    ZeroArea,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_buffer() {
        assert!(RasterImage::new(2, 2, vec![[0.0; 4]; 3]).is_none());
        assert!(RasterImage::new(2, 2, vec![[0.0; 4]; 4]).is_some());
    }

    #[test]
    fn test_quantize_rounds_and_clamps() {
        let img = RasterImage::new(1, 1, vec![[1.5, -0.2, 0.5, f32::NAN]]).unwrap();
        assert_eq!(img.to_rgba8_bytes(), vec![255, 0, 128, 0]);
        assert_eq!(img.to_rgb8_bytes(), vec![255, 0, 128]);
    }

    #[test]
    fn test_load_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        let buf = ::image::RgbaImage::from_fn(3, 2, |x, y| {
            Rgba([(x * 80) as u8, (y * 200) as u8, 7, 255])
        });
        buf.save(&path).unwrap();

        let img = load(path.to_str().unwrap()).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.source_bit_depth, BitDepth::U8);
        assert_eq!(img.to_rgba8_bytes(), buf.into_raw());
    }

    /// Big-endian TIFF block with a single IFD entry: Orientation = 6
    /// (rotate 90° clockwise to display).
    const EXIF_ROTATE_90: &[u8] = b"Exif\0\0\
        MM\0\x2a\0\0\0\x08\
        \0\x01\
        \x01\x12\0\x03\0\0\0\x01\0\x06\0\0\
        \0\0\0\0";

    /// Encode `img` as JPEG and splice an APP1 EXIF segment after SOI.
    fn jpeg_with_exif(img: &::image::RgbImage, exif: &[u8]) -> Vec<u8> {
        use ::image::ImageEncoder;
        use ::image::codecs::jpeg::JpegEncoder;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 95)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ::image::ExtendedColorType::Rgb8,
            )
            .unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let len = u16::try_from(exif.len() + 2).unwrap().to_be_bytes();
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1, len[0], len[1]]);
        out.extend_from_slice(exif);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_load_applies_exif_orientation() {
        // Stored 16x8: left half red, right half blue.
        let stored = ::image::RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 { ::image::Rgb([255, 0, 0]) } else { ::image::Rgb([0, 0, 255]) }
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotated.jpg");
        std::fs::write(&path, jpeg_with_exif(&stored, EXIF_ROTATE_90)).unwrap();

        let img = load(path.to_str().unwrap()).unwrap();
        assert_eq!((img.width, img.height), (8, 16));

        // Rotating clockwise turns the stored left half into the top half.
        let top = img.pixel(4, 2);
        let bottom = img.pixel(4, 13);
        assert!(top[0] > 0.7 && top[2] < 0.3, "top {top:?}");
        assert!(bottom[2] > 0.7 && bottom[0] < 0.3, "bottom {bottom:?}");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ImageLoadError::Io(_)));
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image at all").unwrap();
        let err = load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode(_)));
    }

    #[test]
    fn test_load_rejects_remote_locator() {
        let err = load("https://example.com/a.png").unwrap_err();
        assert!(matches!(err, ImageLoadError::UnsupportedLocator(_)));
    }
}
