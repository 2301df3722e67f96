//! A named, immutable LUT filter instance.

use crate::lut::{ColorCube, LutError};
use crate::raster::RasterImage;

/// A color cube bound to the caller's filter id and the source it came from.
#[derive(Debug, Clone)]
pub struct LutFilter {
    id: String,
    source: String,
    cube: ColorCube,
}

impl LutFilter {
    /// Build a filter from a tiled LUT raster.
    pub fn build(
        id: impl Into<String>,
        source: impl Into<String>,
        raster: &RasterImage,
        dimension: u32,
    ) -> Result<Self, LutError> {
        Ok(Self::from_cube(id, source, ColorCube::build(raster, dimension)?))
    }

    pub fn from_cube(id: impl Into<String>, source: impl Into<String>, cube: ColorCube) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            cube,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Locator of the LUT raster this filter was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dimension(&self) -> u32 {
        self.cube.dimension()
    }

    pub fn cube(&self) -> &ColorCube {
        &self.cube
    }

    /// Grade an image. Returns a new raster; the input is not touched.
    pub fn apply(&self, image: &RasterImage) -> RasterImage {
        self.cube.apply_image(image)
    }

    /// Whether this filter was built from `source` at `dimension`.
    pub fn matches(&self, source: &str, dimension: u32) -> bool {
        self.source == source && self.dimension() == dimension
    }
}
