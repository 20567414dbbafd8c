//! Palm detection for still photographs.
//!
//! The detector runs a single-shot palm detection network on an image and turns its raw output
//! into hand regions:
//!
//! 1. [`preprocess`] letterboxes the image into the square network input.
//! 2. The [`nn::InferenceEngine`] produces per-anchor box regressions, 7 keypoints and a
//!    confidence logit.
//! 3. [`detection::decode`] turns those into [`detection::Candidate`]s relative to the
//!    [`anchors::AnchorTable`].
//! 4. [`detection::nms`] removes overlapping duplicates.
//! 5. [`region`] uses the wrist and middle finger keypoints to map a canonical box back onto the
//!    source image, producing an oriented [`region::HandRegion`] and a [`BoundingBox`].
//!
//! [`detector::PalmDetector`] wires these steps together.
//!
//! # Coordinates
//!
//! All coordinates are in pixels, X pointing right and Y pointing *down*. Positive angles are
//! clockwise. Detections are reported in the coordinate system of the image passed to the
//! detector.
//!
//! # Logging
//!
//! Everything logs through the [`log`] facade. Binaries can call [`init_logger!`] to set up
//! `env_logger`; `RUST_LOG` overrides the defaults.

pub mod anchors;
pub mod config;
pub mod detection;
pub mod detector;
mod error;
pub mod mask;
pub mod nn;
pub mod num;
pub mod preprocess;
pub mod region;
mod timer;

use log::LevelFilter;

pub use config::DetectorConfig;
pub use detector::PalmDetector;
pub use error::{ConfigError, Error, InferenceError};
pub use palmbox_geom::GeometryError;
pub use region::{BoundingBox, HandRegion};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and palmbox will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
