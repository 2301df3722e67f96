//! Pipeline configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encode::OutputFormat;

/// Directory name used under the platform cache directory.
const CACHE_SUBDIR: &str = "grainlut";
/// Cube side length when a caller does not give one.
pub const DEFAULT_LUT_DIMENSION: u32 = 8;
/// Output quality when a caller does not give one.
pub const DEFAULT_COMPRESSION_QUALITY: f32 = 0.8;

/// Runtime configuration for a [`LutPipeline`](crate::LutPipeline).
///
/// `Default` reads `GRAINLUT_CACHE_DIR`, `GRAINLUT_FILTER_CACHE_CAPACITY` and
/// `GRAINLUT_STRICT_FILTER_IDS` from the environment. Any field missing from
/// a deserialized config falls back to the same defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scratch directory output artifacts are written to.
    pub cache_dir: PathBuf,
    /// Container format policy for output.
    pub output_format: OutputFormat,
    /// Maximum number of cached filters. `None` keeps every filter.
    pub filter_cache_capacity: Option<NonZeroUsize>,
    /// Reject reuse of a filter id with a different LUT source or dimension.
    pub strict_filter_ids: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::var_os("GRAINLUT_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
            output_format: OutputFormat::Auto,
            filter_cache_capacity: std::env::var("GRAINLUT_FILTER_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok()),
            strict_filter_ids: std::env::var("GRAINLUT_STRICT_FILTER_IDS")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(true),
        }
    }
}

impl PipelineConfig {
    /// Default configuration writing into `cache_dir`.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_SUBDIR)
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            PipelineConfig::from_json(r#"{ "cache_dir": "/tmp/g", "output_format": "png" }"#)
                .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/g"));
        assert_eq!(config.output_format, OutputFormat::Png);
    }

    #[test]
    fn test_capacity_parses_from_json() {
        let config = PipelineConfig::from_json(r#"{ "filter_cache_capacity": 3 }"#).unwrap();
        assert_eq!(config.filter_cache_capacity, NonZeroUsize::new(3));
        assert!(PipelineConfig::from_json(r#"{ "filter_cache_capacity": 0 }"#).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_default_cache_dir_is_namespaced() {
        assert!(default_cache_dir().ends_with(CACHE_SUBDIR));
    }
}
