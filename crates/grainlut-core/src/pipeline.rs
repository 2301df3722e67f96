//! Pipeline orchestrator: load, optional grain, resolve filter, grade, encode.
//!
//! ```text
//! Idle → LoadingInput → (ApplyingGrain)? → ResolvingFilter → ApplyingLut → Encoding → Done
//!                  ↘ any stage failure ↘ Failed
//! ```
//! Every run is independent. The only state shared between runs is the
//! filter cache and the grain configuration, both owned by the pipeline
//! handle and safe to use from many runs at once.

use std::sync::Arc;

use crate::cache::FilterCache;
use crate::config::{DEFAULT_COMPRESSION_QUALITY, DEFAULT_LUT_DIMENSION, PipelineConfig};
use crate::encode;
use crate::error::{PipelineError, Stage};
use crate::grain::{self, BlendMode, GrainConfig, SharedGrainConfig};
use crate::lut::LutError;
use crate::raster::{self, RasterImage};

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    LoadingInput,
    ApplyingGrain,
    ResolvingFilter,
    ApplyingLut,
    Encoding,
    Done,
    Failed,
}

/// One `apply_lut` invocation.
#[derive(Debug, Clone)]
pub struct ApplyLutRequest {
    /// Locator of the image to grade.
    pub input: String,
    /// Cache key for the LUT filter.
    pub filter_id: String,
    /// Locator of the tiled LUT raster.
    pub lut_source: String,
    /// Cube side length. Default: 8.
    pub lut_dimension: u32,
    /// Output quality in `[0, 1]`. Default: 0.8.
    pub compression_quality: f32,
    /// Composite grain before grading. Default: false.
    pub with_grain: bool,
    /// Grain parameters for this run only, instead of the shared ones.
    pub grain_override: Option<GrainConfig>,
}

impl ApplyLutRequest {
    pub fn new(
        input: impl Into<String>,
        filter_id: impl Into<String>,
        lut_source: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            filter_id: filter_id.into(),
            lut_source: lut_source.into(),
            lut_dimension: DEFAULT_LUT_DIMENSION,
            compression_quality: DEFAULT_COMPRESSION_QUALITY,
            with_grain: false,
            grain_override: None,
        }
    }

    pub fn lut_dimension(mut self, dimension: u32) -> Self {
        self.lut_dimension = dimension;
        self
    }

    pub fn compression_quality(mut self, quality: f32) -> Self {
        self.compression_quality = quality;
        self
    }

    pub fn with_grain(mut self, with_grain: bool) -> Self {
        self.with_grain = with_grain;
        self
    }

    /// Use `config` for this run's grain and turn grain on.
    pub fn grain_override(mut self, config: GrainConfig) -> Self {
        self.grain_override = Some(config);
        self.with_grain = true;
        self
    }
}

/// Handle to a configured pipeline. Clones share cache and grain state.
#[derive(Debug, Clone)]
pub struct LutPipeline {
    config: Arc<PipelineConfig>,
    cache: Arc<FilterCache>,
    grain: SharedGrainConfig,
}

impl LutPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let cache = FilterCache::new(config.filter_cache_capacity, config.strict_filter_ids);
        Self::with_shared(config, Arc::new(cache), SharedGrainConfig::default())
    }

    /// Build a pipeline around an existing cache and grain configuration.
    pub fn with_shared(
        config: PipelineConfig,
        cache: Arc<FilterCache>,
        grain: SharedGrainConfig,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            grain,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn filter_cache(&self) -> &Arc<FilterCache> {
        &self.cache
    }

    pub fn grain_config(&self) -> &SharedGrainConfig {
        &self.grain
    }

    /// Run the pipeline on a worker thread and return the output locator.
    pub async fn apply_lut(&self, request: ApplyLutRequest) -> Result<String, PipelineError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.apply_lut_blocking(&request))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    /// Run the pipeline on the calling thread.
    pub fn apply_lut_blocking(&self, request: &ApplyLutRequest) -> Result<String, PipelineError> {
        let span = tracing::info_span!(
            "apply_lut",
            filter_id = %request.filter_id,
            dimension = request.lut_dimension,
            with_grain = request.with_grain,
        );
        let _enter = span.enter();

        let mut state = PipelineState::Idle;
        let result = self.run(request, &mut state);
        match &result {
            Ok(output) => {
                advance(&mut state, PipelineState::Done);
                tracing::info!(output = %output, "LUT applied");
            }
            Err(err) => {
                let stage = err.stage();
                advance(&mut state, PipelineState::Failed);
                tracing::warn!(%stage, error = %err, "LUT pipeline failed");
            }
        }
        result
    }

    fn run(
        &self,
        request: &ApplyLutRequest,
        state: &mut PipelineState,
    ) -> Result<String, PipelineError> {
        advance(state, PipelineState::LoadingInput);
        let input = raster::load(&request.input)
            .map_err(|e| PipelineError::load(&request.input, Stage::LoadingInput, e))?;

        let image = if request.with_grain {
            advance(state, PipelineState::ApplyingGrain);
            self.apply_grain(input, request.grain_override.as_ref())?
        } else {
            input
        };

        advance(state, PipelineState::ResolvingFilter);
        let filter = self.cache.get_or_build(
            &request.filter_id,
            &request.lut_source,
            request.lut_dimension,
            || {
                raster::load(&request.lut_source).map_err(|source| LutError::SourceLoad {
                    locator: request.lut_source.clone(),
                    source,
                })
            },
        )?;

        advance(state, PipelineState::ApplyingLut);
        let graded = filter.apply(&image);

        advance(state, PipelineState::Encoding);
        encode::encode_and_persist(
            &graded,
            self.config.output_format,
            request.compression_quality,
            &self.config.cache_dir,
        )
    }

    /// Grain requested without a configured texture is an identity step.
    fn apply_grain(
        &self,
        image: RasterImage,
        grain_override: Option<&GrainConfig>,
    ) -> Result<RasterImage, PipelineError> {
        let settings = match grain_override {
            Some(config) => config.clone(),
            None => self.grain.snapshot(),
        };
        let Some(texture) = settings.image.as_deref() else {
            tracing::debug!("grain requested but no grain image is configured; skipping");
            return Ok(image);
        };

        let mode: BlendMode = settings.blend_mode.parse()?;
        Ok(grain::overlay(&image, texture, settings.opacity, mode)?)
    }

    /// Load a grain texture and make it the shared default.
    ///
    /// The image is decoded before the configuration is locked, so concurrent
    /// runs keep using the previous texture until the new one is ready.
    pub fn set_grain_image_blocking(&self, locator: &str) -> Result<(), PipelineError> {
        let image = raster::load(locator)
            .map_err(|e| PipelineError::load(locator, Stage::LoadingGrain, e))?;
        tracing::info!(locator, width = image.width, height = image.height, "grain image set");
        self.grain.set_image(image);
        Ok(())
    }

    pub async fn set_grain_image(&self, locator: impl Into<String>) -> Result<(), PipelineError> {
        let pipeline = self.clone();
        let locator = locator.into();
        tokio::task::spawn_blocking(move || pipeline.set_grain_image_blocking(&locator))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    pub fn set_grain_opacity(&self, opacity: f32) {
        self.grain.set_opacity(opacity);
    }

    /// Checked against the blend registry when a run uses it, not here.
    pub fn set_grain_blend_mode(&self, name: impl Into<String>) {
        self.grain.set_blend_mode(name);
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = ?*state, to = ?next, "pipeline state");
    *state = next;
}
