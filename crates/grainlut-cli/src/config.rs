//! Pipeline configuration for CLI runs.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use grainlut_core::{OutputFormat, PipelineConfig};

/// Start from `path` (a JSON document) if given, else the environment
/// defaults, then apply command-line overrides.
pub fn load(
    path: Option<&Path>,
    cache_dir: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            PipelineConfig::from_json(&json)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(dir) = cache_dir {
        config.cache_dir = dir;
    }
    if let Some(format) = format {
        config.output_format = format;
    }
    Ok(config)
}
