//! Grain overlay: blend registry, compositor, and shared grain parameters.

pub mod blend;
pub mod compositor;
pub mod config;

pub use blend::BlendMode;
pub use compositor::{overlay, overlay_named};
pub use config::{GrainConfig, SharedGrainConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrainError {
    #[error("unknown blend mode `{0}`")]
    InvalidBlendMode(String),
    #[error("{layer} image has zero area ({width}x{height})")]
    ZeroArea {
        layer: &'static str,
        width: u32,
        height: u32,
    },
}
