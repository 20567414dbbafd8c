use std::{io, path::PathBuf};

use palmbox_geom::GeometryError;
use thiserror::Error;

/// Error returned by [`PalmDetector`][crate::PalmDetector] operations.
///
/// Not finding a hand is not an error; detection methods return an empty list in that case.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    /// The keypoints of the best detection do not span a usable hand axis.
    #[error("degenerate hand geometry: {0}")]
    DegenerateGeometry(#[from] GeometryError),
}

/// Invalid anchors or detector parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("anchor file line {line}: expected two comma-separated floats, got `{content}`")]
    MalformedAnchor { line: usize, content: String },
    #[error("anchor table has {anchors} entries, but the network outputs {predictions} predictions")]
    AnchorCountMismatch { anchors: usize, predictions: usize },
    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failure while preparing the network input or running the network.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("cannot run detection on an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
    #[error("inference engine reports an input size of 0")]
    ZeroInputSize,
    #[error("unexpected input shape: expected {expected:?}, got {actual:?}")]
    InputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("unexpected output `{output}`: expected {expected} values, got {actual}")]
    OutputShape {
        output: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("failed to load model: {0}")]
    Io(#[from] io::Error),
    #[error("inference engine failure: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}
