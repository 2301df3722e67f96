use std::fmt;
use std::path::PathBuf;

use crate::grain::GrainError;
use crate::lut::LutError;
use crate::raster::ImageLoadError;

/// Pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Decoding the image to grade.
    LoadingInput,
    /// Decoding a new shared grain texture.
    LoadingGrain,
    /// Compositing grain over the input.
    ApplyingGrain,
    /// Looking up or building the LUT filter, including loading its source.
    ResolvingFilter,
    /// Mapping pixels through the cube.
    ApplyingLut,
    /// Encoding the graded image.
    Encoding,
    /// Writing the encoded artifact to the cache directory.
    Persisting,
    /// Handing the run to a worker thread.
    Scheduling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoadingInput => "loading input",
            Self::LoadingGrain => "loading grain",
            Self::ApplyingGrain => "applying grain",
            Self::ResolvingFilter => "resolving filter",
            Self::ApplyingLut => "applying LUT",
            Self::Encoding => "encoding",
            Self::Persisting => "persisting",
            Self::Scheduling => "scheduling",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to load image `{locator}`: {source}")]
    ImageLoad {
        locator: String,
        stage: Stage,
        #[source]
        source: ImageLoadError,
    },
    #[error("invalid LUT: {0}")]
    InvalidLut(#[from] LutError),
    #[error("unknown blend mode `{0}`")]
    InvalidBlendMode(String),
    #[error("grain compositing failed: {0}")]
    GrainApplication(GrainError),
    #[error("failed to encode output: {0}")]
    Encode(#[source] ::image::ImageError),
    #[error("failed to write `{}`: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pipeline task did not complete: {0}")]
    Task(String),
}

impl PipelineError {
    pub(crate) fn load(locator: &str, stage: Stage, source: ImageLoadError) -> Self {
        Self::ImageLoad {
            locator: locator.to_string(),
            stage,
            source,
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ImageLoad { stage, .. } => *stage,
            Self::InvalidLut(_) => Stage::ResolvingFilter,
            Self::InvalidBlendMode(_) | Self::GrainApplication(_) => Stage::ApplyingGrain,
            Self::Encode(_) => Stage::Encoding,
            Self::Persist { .. } => Stage::Persisting,
            Self::Task(_) => Stage::Scheduling,
        }
    }
}

impl From<GrainError> for PipelineError {
    fn from(err: GrainError) -> Self {
        match err {
            GrainError::InvalidBlendMode(name) => Self::InvalidBlendMode(name),
            other => Self::GrainApplication(other),
        }
    }
}
