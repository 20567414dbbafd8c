//! Decoding of SSD network output into palm [`Candidate`]s.

use itertools::Itertools;
use palmbox_geom::{Point2, Rect};

use crate::{anchors::AnchorTable, nn::RawOutput, num::sigmoid, ConfigError};

use super::{Candidate, DecodeObserver, Keypoints};

/// Turns per-anchor regressions and logits into [`Candidate`]s in network input coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    input_size: f32,
    threshold: f32,
}

impl Decoder {
    /// The default confidence threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Creates a decoder for a network with a square input of `input_size` pixels.
    pub fn new(input_size: u32, threshold: f32) -> Self {
        Self {
            input_size: input_size as f32,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Decodes all predictions whose confidence is strictly greater than the threshold.
    ///
    /// Candidates are returned in prediction order. An empty list means that nothing was found.
    pub fn decode(
        &self,
        output: &RawOutput,
        anchors: &AnchorTable,
        observer: &dyn DecodeObserver,
    ) -> Result<Vec<Candidate>, ConfigError> {
        anchors.check_count(output.num_predictions())?;
        observer.raw_output(output);

        let mut candidates = Vec::new();
        for (index, (anchor, &logit)) in anchors.iter().zip_eq(output.logits()).enumerate() {
            let probability = sigmoid(logit);
            if !(probability > self.threshold) {
                continue;
            }

            let anchor = Point2::new(anchor.x_center(), anchor.y_center()) * self.input_size;
            let regression = output.regression(index);

            let center = anchor + regression.center_offset;
            let rect = Rect::from_center(center.x, center.y, regression.size.x, regression.size.y);
            // keypoints are relative to the anchor, not to the regressed box center
            let keypoints = Keypoints::new(regression.keypoint_offsets.map(|offset| anchor + offset));

            let candidate = Candidate::new(rect, keypoints, probability, index);
            observer.candidate(&candidate);
            candidates.push(candidate);
        }

        observer.finished(output.num_predictions(), candidates.len());
        Ok(candidates)
    }
}
