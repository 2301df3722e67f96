//! grainlut core: color-cube LUT grading with an optional grain overlay.
//!
//! This crate loads a still image, optionally composites a grain texture over
//! it, maps every pixel through a cached 3D color cube, and writes the result
//! to a scratch directory. No UI or host-bridge dependencies.

pub mod api;
pub mod cache;
pub mod config;
pub mod encode;
pub mod error;
pub mod grain;
pub mod locator;
pub mod lut;
pub mod pipeline;
pub mod raster;

// Re-exports for convenience.
pub use cache::FilterCache;
pub use config::PipelineConfig;
pub use encode::{EncodedArtifact, OutputFormat};
pub use error::{PipelineError, Stage};
pub use grain::{BlendMode, GrainConfig, GrainError, SharedGrainConfig};
pub use lut::{ColorCube, LutError, LutFilter};
pub use pipeline::{ApplyLutRequest, LutPipeline, PipelineState};
pub use raster::{BitDepth, ImageLoadError, RasterImage};
