//! Default grain parameters shared by every grain-enabled pipeline run.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::raster::RasterImage;

/// Opacity used until a caller sets one.
pub const DEFAULT_OPACITY: f32 = 0.8;
/// Blend mode used until a caller sets one.
pub const DEFAULT_BLEND_MODE: &str = "screen";

/// Grain compositing parameters.
///
/// The blend mode is kept as the caller's string and validated when a
/// pipeline run uses it.
#[derive(Debug, Clone, PartialEq)]
pub struct GrainConfig {
    /// Grain texture. `None` means grain requests pass the image through.
    pub image: Option<Arc<RasterImage>>,
    /// Maximum contribution of the grain layer, `[0, 1]`.
    pub opacity: f32,
    /// Blend function name, looked up in the blend registry at use time.
    pub blend_mode: String,
}

impl Default for GrainConfig {
    fn default() -> Self {
        Self {
            image: None,
            opacity: DEFAULT_OPACITY,
            blend_mode: DEFAULT_BLEND_MODE.to_string(),
        }
    }
}

impl GrainConfig {
    pub fn with_image(mut self, image: RasterImage) -> Self {
        self.image = Some(Arc::new(image));
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, name: impl Into<String>) -> Self {
        self.blend_mode = name.into();
        self
    }
}

/// Thread-safe handle to one [`GrainConfig`].
///
/// Clones share the same configuration. Readers take a [`snapshot`] so the
/// image, opacity, and blend mode they use always come from the same state.
///
/// [`snapshot`]: SharedGrainConfig::snapshot
#[derive(Debug, Clone, Default)]
pub struct SharedGrainConfig {
    inner: Arc<RwLock<GrainConfig>>,
}

impl SharedGrainConfig {
    pub fn new(config: GrainConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Consistent copy of all three fields. The image is shared, not copied.
    pub fn snapshot(&self) -> GrainConfig {
        self.inner.read().clone()
    }

    pub fn set_image(&self, image: RasterImage) {
        let image = Arc::new(image);
        self.inner.write().image = Some(image);
    }

    pub fn clear_image(&self) {
        self.inner.write().image = None;
    }

    /// Set the opacity, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_opacity(&self, opacity: f32) {
        if !opacity.is_finite() {
            tracing::warn!(opacity, "ignoring non-finite grain opacity");
            return;
        }
        let clamped = opacity.clamp(0.0, 1.0);
        if clamped != opacity {
            tracing::warn!(opacity, clamped, "grain opacity out of range");
        }
        self.inner.write().opacity = clamped;
    }

    pub fn set_blend_mode(&self, name: impl Into<String>) {
        self.inner.write().blend_mode = name.into();
    }

    /// Replace the whole configuration in one step.
    pub fn replace(&self, config: GrainConfig) {
        *self.inner.write() = config;
    }
}
