//! Output encoding and persistence.
//!
//! Encoding happens fully in memory before anything touches the disk, and
//! the file is written through a temporary file in the target directory that
//! is renamed into place. A failed run therefore never leaves a partial
//! artifact behind.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use ::image::codecs::jpeg::JpegEncoder;
use ::image::codecs::png::PngEncoder;
use ::image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::locator;
use crate::raster::RasterImage;

/// Container format for pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG when quality is 1.0, JPEG otherwise.
    #[default]
    Auto,
    /// Lossless; quality is ignored.
    Png,
    /// Lossy; alpha is dropped.
    Jpeg,
}

impl OutputFormat {
    /// Resolve `Auto` against a quality value.
    pub fn resolve(self, quality: f32) -> Self {
        match self {
            Self::Auto if quality >= 1.0 => Self::Png,
            Self::Auto => Self::Jpeg,
            other => other,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Auto | Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Encoded image bytes, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    /// Always a concrete format, never `Auto`.
    pub format: OutputFormat,
}

/// Map `[0, 1]` quality to the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 100;
    }
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Rasterize to 8-bit and encode.
pub fn encode(
    image: &RasterImage,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedArtifact, PipelineError> {
    let format = format.resolve(quality);
    let mut bytes = Vec::new();

    match format {
        OutputFormat::Auto | OutputFormat::Png => {
            PngEncoder::new(Cursor::new(&mut bytes))
                .write_image(
                    &image.to_rgba8_bytes(),
                    image.width,
                    image.height,
                    ExtendedColorType::Rgba8,
                )
                .map_err(PipelineError::Encode)?;
        }
        OutputFormat::Jpeg => {
            JpegEncoder::new_with_quality(Cursor::new(&mut bytes), jpeg_quality(quality))
                .write_image(
                    &image.to_rgb8_bytes(),
                    image.width,
                    image.height,
                    ExtendedColorType::Rgb8,
                )
                .map_err(PipelineError::Encode)?;
        }
    }

    Ok(EncodedArtifact {
        bytes,
        format: if format == OutputFormat::Auto {
            OutputFormat::Png
        } else {
            format
        },
    })
}

/// Write an artifact to a fresh, uniquely named file inside `dir`.
pub fn persist(artifact: &EncodedArtifact, dir: &Path) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::persist(dir, e))?;

    let file_name = format!("{}.{}", uuid::Uuid::new_v4(), artifact.format.extension());
    let path = dir.join(file_name);

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PipelineError::persist(dir, e))?;
    tmp.write_all(&artifact.bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PipelineError::persist(&path, e))?;
    tmp.persist_noclobber(&path)
        .map_err(|e| PipelineError::persist(&path, e.error))?;

    tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "wrote artifact");
    Ok(path)
}

/// Encode, persist, and return the output locator (`file://` URI).
pub fn encode_and_persist(
    image: &RasterImage,
    format: OutputFormat,
    quality: f32,
    dir: &Path,
) -> Result<String, PipelineError> {
    let artifact = encode(image, format, quality)?;
    let path = persist(&artifact, dir)?;
    Ok(locator::to_file_uri(&path))
}
