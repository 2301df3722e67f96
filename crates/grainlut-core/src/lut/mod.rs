//! Color-cube lookup tables: tiled-raster decoding, trilinear application,
//! and named filter instances.

pub mod cube;
pub mod filter;

pub use cube::ColorCube;
pub use filter::LutFilter;

use crate::raster::ImageLoadError;

/// Why a LUT source could not become a usable filter.
#[derive(Debug, thiserror::Error)]
pub enum LutError {
    #[error("failed to load LUT source `{locator}`: {source}")]
    SourceLoad {
        locator: String,
        #[source]
        source: ImageLoadError,
    },
    #[error("cube dimension {0} is too small (minimum 2)")]
    DimensionTooSmall(u32),
    #[error("LUT source {width}x{height} is not a multiple of dimension {dimension}")]
    NotTileAligned {
        width: u32,
        height: u32,
        dimension: u32,
    },
    #[error("LUT source {width}x{height} holds {tiles} tiles, dimension {dimension} needs {dimension}")]
    TooFewTiles {
        width: u32,
        height: u32,
        dimension: u32,
        tiles: u32,
    },
    #[error(
        "filter id `{filter_id}` is bound to {cached_source} (dimension {cached_dimension}), \
         not {requested_source} (dimension {requested_dimension})"
    )]
    FilterIdConflict {
        filter_id: String,
        cached_source: String,
        cached_dimension: u32,
        requested_source: String,
        requested_dimension: u32,
    },
}
