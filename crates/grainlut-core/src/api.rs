//! Process-wide entry points for a host bridge.
//!
//! These functions drive one default [`LutPipeline`] shared by the whole
//! process. It is created from [`PipelineConfig::default`] on first use;
//! call [`init`] beforehand to supply a different configuration. Code that
//! wants isolated state should own a `LutPipeline` instead.

use std::sync::OnceLock;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{ApplyLutRequest, LutPipeline};

static DEFAULT_PIPELINE: OnceLock<LutPipeline> = OnceLock::new();

/// Install the process-wide pipeline. Returns `false` if one already exists.
pub fn init(config: PipelineConfig) -> bool {
    DEFAULT_PIPELINE.set(LutPipeline::new(config)).is_ok()
}

/// The process-wide pipeline.
pub fn pipeline() -> &'static LutPipeline {
    DEFAULT_PIPELINE.get_or_init(|| LutPipeline::new(PipelineConfig::default()))
}

/// Grade `input` with the LUT at `lut_source`, cached under `filter_id`.
///
/// `None` arguments take their defaults: dimension 8, quality 0.8, no grain.
pub async fn apply_lut(
    input: &str,
    filter_id: &str,
    lut_source: &str,
    lut_dimension: Option<u32>,
    compression_quality: Option<f32>,
    with_grain: Option<bool>,
) -> Result<String, PipelineError> {
    let mut request = ApplyLutRequest::new(input, filter_id, lut_source);
    if let Some(dimension) = lut_dimension {
        request = request.lut_dimension(dimension);
    }
    if let Some(quality) = compression_quality {
        request = request.compression_quality(quality);
    }
    if let Some(with_grain) = with_grain {
        request = request.with_grain(with_grain);
    }
    pipeline().apply_lut(request).await
}

pub async fn set_grain_image(locator: &str) -> Result<(), PipelineError> {
    pipeline().set_grain_image(locator).await
}

pub fn set_grain_opacity(opacity: f32) {
    pipeline().set_grain_opacity(opacity);
}

pub fn set_grain_blend_mode(name: &str) {
    pipeline().set_grain_blend_mode(name);
}
